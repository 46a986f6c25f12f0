//! 환경변수 기반 설정 모듈.
//!
//! `.env` 파일이 있으면 먼저 읽습니다. 숫자/불리언 값은 파싱에 실패하면
//! 기본값을 사용하고, 시간대와 탐색 화면처럼 잘못 쓰면 결과가 달라지는
//! 값은 `Config` 에러로 처리합니다.

use secrecy::SecretString;
use std::path::PathBuf;

use bcra_core::{
    parse_timezone, BcraError, BcraResult, BrowserConfig, DatabaseConfig, DiscoveryView,
    FetcherConfig, LogFormat, OcrConfig, TableTarget,
};

/// 기본 이미지 보관 디렉토리
pub const DEFAULT_IMAGE_DIR: &str = "bcra_imagenes";

/// 반드시 있어야 하는 PostgreSQL 환경변수
const REQUIRED_DB_VARS: [&str; 4] = [
    "POSTGRES_HOST",
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_DB",
];

/// 환경변수 조회 함수
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Collector 전체 설정
#[derive(Debug)]
pub struct CollectorConfig {
    /// 게시물 탐색/다운로드 설정
    pub fetcher: FetcherConfig,
    /// OCR 설정
    pub ocr: OcrConfig,
    /// 이미지 보관 디렉토리 (None이면 보관 안 함)
    pub image_dir: Option<PathBuf>,
    /// 로그 형식 (`LOG_FORMAT`)
    pub log_format: Option<LogFormat>,
    database: Option<DatabaseConfig>,
    missing_db_vars: Vec<&'static str>,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> BcraResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// 주어진 조회 함수로 설정을 구성합니다.
    pub fn from_lookup(env: Lookup<'_>) -> BcraResult<Self> {
        let fetcher = fetcher_config(env)?;
        let ocr = ocr_config(env);

        let image_dir = match env("BCRA_IMAGE_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir.trim())),
            None => Some(PathBuf::from(DEFAULT_IMAGE_DIR)),
        };

        let log_format = env_var_string(env, "LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>().map_err(BcraError::Config))
            .transpose()?;

        let missing_db_vars: Vec<&'static str> = REQUIRED_DB_VARS
            .iter()
            .copied()
            .filter(|key| env_var_string(env, key).is_none())
            .collect();
        let database = if missing_db_vars.is_empty() {
            Some(database_config(env)?)
        } else {
            None
        };

        Ok(Self {
            fetcher,
            ocr,
            image_dir,
            log_format,
            database,
            missing_db_vars,
        })
    }

    /// 실제 사용할 로그 형식. CLI 값이 `LOG_FORMAT`보다 우선합니다.
    pub fn resolve_log_format(&self, cli: Option<LogFormat>) -> LogFormat {
        cli.or(self.log_format).unwrap_or_default()
    }

    /// DB 설정. 저장 단계에서만 호출되며, 누락된 변수가 있으면 `Config` 에러입니다.
    pub fn database(&self) -> BcraResult<&DatabaseConfig> {
        self.database.as_ref().ok_or_else(|| {
            BcraError::Config(format!(
                "PostgreSQL 환경변수가 설정되지 않았습니다: {}",
                self.missing_db_vars.join(", ")
            ))
        })
    }

    /// DB 설정을 꺼냅니다.
    pub fn take_database(&mut self) -> BcraResult<DatabaseConfig> {
        self.database()?;
        self.database
            .take()
            .ok_or_else(|| BcraError::Config("PostgreSQL 설정을 이미 사용했습니다".to_string()))
    }
}

fn fetcher_config(env: Lookup<'_>) -> BcraResult<FetcherConfig> {
    let defaults = FetcherConfig::default();
    let browser_defaults = BrowserConfig::default();

    let timezone = match env_var_string(env, "BCRA_TIMEZONE") {
        Some(name) => parse_timezone(&name)?,
        None => defaults.timezone,
    };

    let views = match env_var_string(env, "BCRA_DISCOVERY_VIEWS") {
        Some(raw) => parse_views(&raw)?,
        None => defaults.views.clone(),
    };

    let keywords = env_var_string(env, "BCRA_KEYWORDS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|kw| !kw.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|kws| !kws.is_empty())
        .unwrap_or_else(|| defaults.keywords.clone());

    Ok(FetcherConfig {
        base_url: env_var_string(env, "BCRA_BASE_URL").unwrap_or(defaults.base_url),
        account: env_var_string(env, "BCRA_ACCOUNT").unwrap_or(defaults.account),
        keywords,
        views,
        timezone,
        credentials_path: env_var_string(env, "BCRA_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.credentials_path),
        browser: BrowserConfig {
            chromium_path: env_var_string(env, "CHROMIUM_PATH").map(PathBuf::from),
            headless: env_var_bool(env, "BROWSER_HEADLESS", browser_defaults.headless),
            navigation_timeout_secs: env_var_parse(
                env,
                "BROWSER_NAV_TIMEOUT_SECS",
                browser_defaults.navigation_timeout_secs,
            ),
            settle_delay_ms: browser_defaults.settle_delay_ms,
        },
        scroll_rounds: env_var_parse(env, "BROWSER_SCROLL_ROUNDS", defaults.scroll_rounds),
        max_detail_pages: defaults.max_detail_pages,
        download_timeout_secs: defaults.download_timeout_secs,
    })
}

/// 쉼표로 구분한 탐색 화면 목록
fn parse_views(raw: &str) -> BcraResult<Vec<DiscoveryView>> {
    let views = raw
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<DiscoveryView>().map_err(BcraError::Config))
        .collect::<BcraResult<Vec<_>>>()?;
    if views.is_empty() {
        return Err(BcraError::Config(
            "BCRA_DISCOVERY_VIEWS에 탐색 화면이 없습니다".to_string(),
        ));
    }
    Ok(views)
}

fn ocr_config(env: Lookup<'_>) -> OcrConfig {
    let defaults = OcrConfig::default();

    let page_segmentation = match env_var_string(env, "OCR_PSM") {
        Some(v) if v.eq_ignore_ascii_case("none") => None,
        Some(v) => v.parse().ok().or(defaults.page_segmentation),
        None => defaults.page_segmentation,
    };

    OcrConfig {
        tesseract_path: env_var_string(env, "TESSERACT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.tesseract_path),
        languages: env_var_string(env, "OCR_LANGS").unwrap_or(defaults.languages),
        page_segmentation,
        preprocess: env_var_bool(env, "OCR_PREPROCESS", defaults.preprocess),
        timeout_secs: defaults.timeout_secs,
    }
}

fn database_config(env: Lookup<'_>) -> BcraResult<DatabaseConfig> {
    let required = |key: &str| {
        env_var_string(env, key)
            .ok_or_else(|| BcraError::Config(format!("{} 환경변수가 설정되지 않았습니다", key)))
    };

    let mut reserves = TableTarget::default_reserves();
    if let Some(table) = env_var_string(env, "RESERVES_TABLE") {
        reserves.table = table;
    }
    if let Some(column) = env_var_string(env, "RESERVES_VALUE_COLUMN") {
        reserves.value_column = column;
    }

    let mut intervention = TableTarget::default_intervention();
    if let Some(table) = env_var_string(env, "INTERVENTION_TABLE") {
        intervention.table = table;
    }
    if let Some(column) = env_var_string(env, "INTERVENTION_VALUE_COLUMN") {
        intervention.value_column = column;
    }

    reserves.validate()?;
    intervention.validate()?;

    Ok(DatabaseConfig {
        host: required("POSTGRES_HOST")?,
        port: env_var_parse(env, "POSTGRES_PORT", DatabaseConfig::DEFAULT_PORT),
        user: required("POSTGRES_USER")?,
        password: SecretString::from(required("POSTGRES_PASSWORD")?),
        database: required("POSTGRES_DB")?,
        connect_timeout_secs: env_var_parse(env, "POSTGRES_CONNECT_TIMEOUT_SECS", 10),
        reserves,
        intervention,
    })
}

/// 환경변수 문자열 (공백만 있으면 없는 것으로 취급)
fn env_var_string(env: Lookup<'_>, key: &str) -> Option<String> {
    env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(env: Lookup<'_>, key: &str, default: T) -> T {
    env_var_string(env, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(env: Lookup<'_>, key: &str, default: bool) -> bool {
    env_var_string(env, key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> BcraResult<CollectorConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CollectorConfig::from_lookup(&|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.fetcher.account, "BancoCentral_AR");
        assert_eq!(config.fetcher.credentials_path, PathBuf::from("x_session.json"));
        assert_eq!(config.fetcher.views, DiscoveryView::DEFAULT_ORDER.to_vec());
        assert_eq!(config.ocr.languages, "spa+eng");
        assert_eq!(config.image_dir, Some(PathBuf::from(DEFAULT_IMAGE_DIR)));
        assert!(config.log_format.is_none());
    }

    #[test]
    fn test_missing_database_is_error_only_when_requested() {
        let config = load(&[("POSTGRES_HOST", "db"), ("POSTGRES_USER", "bcra")]).unwrap();
        match config.database() {
            Err(BcraError::Config(msg)) => {
                assert!(msg.contains("POSTGRES_PASSWORD"));
                assert!(msg.contains("POSTGRES_DB"));
                assert!(!msg.contains("POSTGRES_HOST"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_database_config() {
        let mut config = load(&[
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_USER", "bcra"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "macro"),
            ("POSTGRES_PORT", "6543"),
            ("RESERVES_TABLE", "reservas"),
        ])
        .unwrap();

        let db = config.take_database().unwrap();
        assert_eq!(db.port, 6543);
        assert_eq!(db.password(), "secret");
        assert_eq!(db.reserves.table, "reservas");
        assert_eq!(db.reserves.value_column, "valor");
        assert_eq!(db.intervention, TableTarget::default_intervention());
    }

    #[test]
    fn test_invalid_table_identifier() {
        let err = load(&[
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_USER", "bcra"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "macro"),
            ("INTERVENTION_TABLE", "compras; DROP TABLE x"),
        ])
        .unwrap_err();
        assert!(matches!(err, BcraError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BCRA_DISCOVERY_VIEWS", "timeline, search"),
            ("BCRA_KEYWORDS", "#DataBCRA"),
            ("BCRA_TIMEZONE", "UTC"),
            ("BCRA_IMAGE_DIR", ""),
            ("BROWSER_HEADLESS", "false"),
            ("BROWSER_SCROLL_ROUNDS", "abc"),
            ("OCR_PSM", "none"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(
            config.fetcher.views,
            vec![DiscoveryView::Timeline, DiscoveryView::Search]
        );
        assert_eq!(config.fetcher.keywords, vec!["#DataBCRA".to_string()]);
        assert_eq!(config.fetcher.timezone, chrono_tz::UTC);
        assert!(config.image_dir.is_none());
        assert!(!config.fetcher.browser.headless);
        // 파싱 실패 시 기본값
        assert_eq!(config.fetcher.scroll_rounds, 3);
        assert_eq!(config.ocr.page_segmentation, None);
        assert_eq!(config.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_log_format_resolution() {
        let config = load(&[("LOG_FORMAT", "compact")]).unwrap();
        assert_eq!(config.resolve_log_format(None), LogFormat::Compact);
        assert_eq!(config.resolve_log_format(Some(LogFormat::Json)), LogFormat::Json);
        assert_eq!(load(&[]).unwrap().resolve_log_format(None), LogFormat::default());

        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(BcraError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_view_and_timezone() {
        assert!(matches!(
            load(&[("BCRA_DISCOVERY_VIEWS", "media,stories")]),
            Err(BcraError::Config(_))
        ));
        assert!(matches!(
            load(&[("BCRA_TIMEZONE", "Mars/Olympus")]),
            Err(BcraError::Config(_))
        ));
    }
}
