//! 설정 타입.
//!
//! 시간대, 키워드 목록, 탐색 화면 순서 같은 값은 전역 상수가 아니라
//! 이 구조체들을 통해 각 단계에 명시적으로 전달됩니다.

use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

use crate::date::DEFAULT_TIMEZONE;
use crate::domain::DiscoveryView;
use crate::error::{BcraError, BcraResult};

/// 게시물 탐색/다운로드 설정.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// 사이트 기본 URL
    pub base_url: String,
    /// 대상 계정
    pub account: String,
    /// 게시물 본문에 하나 이상 포함되어야 하는 키워드
    pub keywords: Vec<String>,
    /// 탐색 화면 우선순위
    pub views: Vec<DiscoveryView>,
    /// 게시 날짜를 비교할 시간대
    pub timezone: Tz,
    /// 세션 토큰 파일 경로
    pub credentials_path: PathBuf,
    /// 브라우저 설정
    pub browser: BrowserConfig,
    /// 화면별 최대 스크롤 횟수
    pub scroll_rounds: u32,
    /// 미디어 그리드에서 열어볼 최대 상세 페이지 수
    pub max_detail_pages: usize,
    /// 이미지 다운로드 타임아웃 (초)
    pub download_timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://x.com".to_string(),
            account: "BancoCentral_AR".to_string(),
            keywords: vec!["#DataBCRA".to_string(), "Principales variables".to_string()],
            views: DiscoveryView::DEFAULT_ORDER.to_vec(),
            timezone: DEFAULT_TIMEZONE,
            credentials_path: PathBuf::from("x_session.json"),
            browser: BrowserConfig::default(),
            scroll_rounds: 3,
            max_detail_pages: 6,
            download_timeout_secs: 60,
        }
    }
}

impl FetcherConfig {
    /// 이미지 다운로드 타임아웃을 Duration으로 반환
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// 헤드리스 브라우저 설정.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Chromium 실행 파일 경로 (없으면 PATH에서 검색)
    pub chromium_path: Option<PathBuf>,
    /// 헤드리스 모드
    pub headless: bool,
    /// 페이지 이동 타임아웃 (초)
    pub navigation_timeout_secs: u64,
    /// 이동 후 렌더링 대기 (밀리초)
    pub settle_delay_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromium_path: None,
            headless: true,
            navigation_timeout_secs: 45,
            settle_delay_ms: 2500,
        }
    }
}

impl BrowserConfig {
    /// 페이지 이동 타임아웃을 Duration으로 반환
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// 렌더링 대기 시간을 Duration으로 반환
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// OCR 설정.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// tesseract 실행 파일
    pub tesseract_path: PathBuf,
    /// 인식 언어 (tesseract `-l` 인자)
    pub languages: String,
    /// 페이지 분할 모드 (tesseract `--psm` 인자)
    pub page_segmentation: Option<u8>,
    /// 인식 전 이미지 전처리 여부
    pub preprocess: bool,
    /// OCR 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            languages: "spa+eng".to_string(),
            page_segmentation: Some(6),
            preprocess: true,
            timeout_secs: 60,
        }
    }
}

impl OcrConfig {
    /// OCR 타임아웃을 Duration으로 반환
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 저장 대상 테이블.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub schema: String,
    pub table: String,
    pub date_column: String,
    pub value_column: String,
}

impl TableTarget {
    /// `public` 스키마, `date` 키 컬럼을 사용하는 대상.
    pub fn new(table: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
            date_column: "date".to_string(),
            value_column: value_column.into(),
        }
    }

    /// 외환보유액 기본 테이블
    pub fn default_reserves() -> Self {
        Self::new("reservas_scrape", "valor")
    }

    /// 외환 매입/매도 기본 테이블
    pub fn default_intervention() -> Self {
        Self::new("comprasMULCBCRA", "comprasBCRA")
    }

    /// 모든 식별자가 `[A-Za-z_][A-Za-z0-9_]*` 형식인지 검증합니다.
    pub fn validate(&self) -> BcraResult<()> {
        for ident in [
            &self.schema,
            &self.table,
            &self.date_column,
            &self.value_column,
        ] {
            if !is_plain_identifier(ident) {
                return Err(BcraError::Config(format!(
                    "허용되지 않는 SQL 식별자: {:?}",
                    ident
                )));
            }
        }
        Ok(())
    }

    /// 따옴표로 감싼 `"schema"."table"` 이름.
    pub fn qualified_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.table)
    }
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    ident.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 데이터베이스 설정.
#[derive(Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 외환보유액 테이블
    pub reserves: TableTarget,
    /// 외환 매입/매도 테이블
    pub intervention: TableTarget,
}

impl DatabaseConfig {
    /// 기본 포트
    pub const DEFAULT_PORT: u16 = 5432;

    /// 비밀번호 원문 (연결 옵션 구성용)
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// 비밀번호를 가린 접속 URL (로그용)
    pub fn redacted_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    /// 연결 타임아웃을 Duration으로 반환
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
