//! 세션 토큰 파일.
//!
//! 브라우저에서 내보낸 쿠키를 변환한 JSON 파일을 읽습니다:
//!
//! ```json
//! {
//!   "cookies": { "auth_token": "...", "ct0": "...", "guest_id": "..." },
//!   "user_agent": "Mozilla/5.0 (...)"
//! }
//! ```
//!
//! 대화형 로그인은 지원하지 않습니다. 토큰이 없거나 만료되면 사람이
//! 쿠키를 다시 내보내야 하므로 `Authentication` 에러로 실행을 중단합니다.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use bcra_core::{BcraError, BcraResult};

/// 세션 인증 토큰 이름
pub const SESSION_TOKEN: &str = "auth_token";
/// CSRF 방지 토큰 이름
pub const CSRF_TOKEN: &str = "ct0";
/// 반드시 있어야 하는 토큰
pub const REQUIRED_TOKENS: [&str; 2] = [SESSION_TOKEN, CSRF_TOKEN];

/// 파일에 user_agent가 없을 때 사용하는 브라우저 식별 문자열
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Deserialize)]
struct CredentialFile {
    #[serde(default)]
    cookies: BTreeMap<String, String>,
    #[serde(default)]
    user_agent: Option<String>,
}

/// 복원된 세션 자격증명.
pub struct SessionCredentials {
    tokens: BTreeMap<String, SecretString>,
    user_agent: String,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl SessionCredentials {
    /// 파일에서 토큰을 읽고 필수 토큰을 검증합니다.
    pub fn load(path: &Path) -> BcraResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BcraError::Authentication(format!(
                "세션 토큰 파일을 읽을 수 없습니다 ({}): {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    /// JSON 문자열에서 토큰을 읽고 필수 토큰을 검증합니다.
    pub fn from_json(raw: &str) -> BcraResult<Self> {
        let file: CredentialFile = serde_json::from_str(raw).map_err(|e| {
            BcraError::Authentication(format!("세션 토큰 파일 형식 오류: {}", e))
        })?;

        let missing: Vec<&str> = REQUIRED_TOKENS
            .iter()
            .copied()
            .filter(|name| {
                file.cookies
                    .get(*name)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .collect();
        if !missing.is_empty() {
            return Err(BcraError::Authentication(format!(
                "필수 토큰 누락: {}",
                missing.join(", ")
            )));
        }

        let user_agent = file
            .user_agent
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string());

        let tokens = file
            .cookies
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name, SecretString::from(value)))
            .collect();

        Ok(Self { tokens, user_agent })
    }

    /// 브라우저 식별 문자열
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// 토큰 값 조회
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(|v| v.expose_secret())
    }

    /// (이름, 값) 순회. 쿠키 주입에 사용합니다.
    pub fn cookies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens
            .iter()
            .map(|(name, value)| (name.as_str(), value.expose_secret()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cookies": {{"auth_token": "abc", "ct0": "def", "lang": "es"}}, "user_agent": "TestAgent/1.0"}}"#
        )
        .unwrap();

        let creds = SessionCredentials::load(file.path()).unwrap();
        assert_eq!(creds.token(SESSION_TOKEN), Some("abc"));
        assert_eq!(creds.token(CSRF_TOKEN), Some("def"));
        assert_eq!(creds.user_agent(), "TestAgent/1.0");
        assert_eq!(creds.cookies().count(), 3);
    }

    #[test]
    fn test_missing_file_is_authentication_error() {
        let err = SessionCredentials::load(Path::new("/nonexistent/x_session.json")).unwrap_err();
        assert!(matches!(err, BcraError::Authentication(_)));
    }

    #[test]
    fn test_missing_required_token() {
        let err = SessionCredentials::from_json(r#"{"cookies": {"auth_token": "abc"}}"#)
            .unwrap_err();
        match err {
            BcraError::Authentication(msg) => assert!(msg.contains("ct0")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let err = SessionCredentials::from_json(
            r#"{"cookies": {"auth_token": "  ", "ct0": "def"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BcraError::Authentication(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = SessionCredentials::from_json("auth_token=abc").unwrap_err();
        assert!(matches!(err, BcraError::Authentication(_)));
    }

    #[test]
    fn test_default_user_agent_and_redacted_debug() {
        let creds = SessionCredentials::from_json(
            r#"{"cookies": {"auth_token": "secret-a", "ct0": "secret-b"}}"#,
        )
        .unwrap();
        assert!(creds.user_agent().starts_with("Mozilla/5.0"));
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret-a"));
        assert!(debug.contains("auth_token"));
    }
}
