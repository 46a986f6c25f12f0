//! 페이지 렌더러 추상화.
//!
//! 타임라인은 자바스크립트로 그려지므로 HTML을 얻으려면 브라우저가 필요합니다.
//! 탐색 로직은 이 trait에만 의존하고, 실제 구현은 `chromium` 모듈에 있습니다.

use async_trait::async_trait;

use super::credentials::SessionCredentials;
use bcra_core::BcraResult;

/// 로그인 흐름으로 리다이렉트되었음을 나타내는 경로
const LOGIN_PATHS: [&str; 4] = ["/login", "/i/flow/login", "/i/flow/signup", "/logout"];

/// 렌더링된 페이지 스냅샷.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 요청한 URL
    pub requested_url: String,
    /// 리다이렉트 후 최종 URL
    pub final_url: String,
    /// 렌더링 후 DOM (outerHTML)
    pub html: String,
}

impl RenderedPage {
    /// 로그인 화면으로 보내졌는지 확인합니다.
    pub fn is_login_redirect(&self) -> bool {
        is_login_url(&self.final_url)
    }
}

/// URL 경로가 로그인 흐름인지 확인합니다.
pub fn is_login_url(url: &str) -> bool {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    LOGIN_PATHS
        .iter()
        .any(|login| path == *login || path.starts_with(&format!("{}/", login)))
}

/// 세션 토큰이 주입된 브라우저를 여는 팩토리.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 렌더러 이름 (로그용)
    fn name(&self) -> &str;

    /// 자격증명을 주입한 새 세션을 엽니다.
    async fn open(&self, credentials: &SessionCredentials) -> BcraResult<Box<dyn RenderSession>>;
}

/// 열린 브라우저 세션.
///
/// 호출자는 성공/실패와 관계없이 반드시 `close`를 호출해야 합니다.
#[async_trait]
pub trait RenderSession: Send {
    /// URL로 이동하고 렌더링이 끝난 스냅샷을 반환합니다.
    async fn load(&mut self, url: &str) -> BcraResult<RenderedPage>;

    /// 한 화면 아래로 스크롤하고 새 스냅샷을 반환합니다.
    async fn scroll(&mut self) -> BcraResult<RenderedPage>;

    /// 브라우저 자원을 해제합니다.
    async fn close(self: Box<Self>);
}
