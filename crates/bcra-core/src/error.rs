//! 수집 파이프라인의 에러 타입.
//!
//! 모든 단계(수집, 추출, 저장)는 이 모듈의 `BcraError`로 실패를 보고하고,
//! 최상위 실행기가 단계와 사유를 로그로 남긴 뒤 종료 코드를 결정합니다.

use std::fmt;
use thiserror::Error;

use crate::domain::FigureField;

/// 파이프라인 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 설정 로드 및 입력 검증
    Setup,
    /// 게시물 탐색 및 이미지 다운로드
    Fetch,
    /// OCR 및 수치 파싱
    Extract,
    /// DB 저장
    Persist,
}

impl Stage {
    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 수집 에러.
#[derive(Debug, Error)]
pub enum BcraError {
    /// 세션 토큰 누락/만료/거부 (사람이 쿠키를 다시 내보내야 함)
    #[error("인증 에러: {0}")]
    Authentication(String),

    /// 대상 날짜의 게시물 없음
    #[error("게시물 없음: {0}")]
    NotFound(String),

    /// 네트워크/타임아웃 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 필드별 파싱 실패
    #[error("파싱 에러 ({field}): {reason}")]
    Parse { field: FigureField, reason: String },

    /// OCR 엔진 실행 실패
    #[error("OCR 에러: {0}")]
    Recognition(String),

    /// DB 연결/쓰기 실패
    #[error("저장 에러: {0}")]
    Persistence(String),

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 수집 작업을 위한 Result 타입.
pub type BcraResult<T> = Result<T, BcraError>;

impl BcraError {
    /// 특정 필드의 파싱 에러를 생성합니다.
    pub fn parse(field: FigureField, reason: impl Into<String>) -> Self {
        Self::Parse {
            field,
            reason: reason.into(),
        }
    }

    /// 에러가 발생한 단계.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Authentication(_) | Self::NotFound(_) | Self::Network(_) => Stage::Fetch,
            Self::Parse { .. } | Self::Recognition(_) => Stage::Extract,
            Self::Persistence(_) => Stage::Persist,
            Self::Config(_) => Stage::Setup,
        }
    }

    /// 정상 종료로 취급하는 에러인지 확인합니다 (그날 게시물이 없는 경우).
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// 다음 스케줄 실행에서 복구될 수 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// 사람의 개입이 필요한 치명적인 에러인지 확인합니다.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Persistence(_))
    }

    /// 프로세스 종료 코드.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => 0,
            Self::Config(_) => 1,
            Self::Authentication(_) => 2,
            Self::Network(_) => 3,
            Self::Parse { .. } => 4,
            Self::Persistence(_) => 5,
            Self::Recognition(_) => 6,
        }
    }
}
