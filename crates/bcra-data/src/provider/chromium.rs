//! chromiumoxide 기반 렌더러.
//!
//! 실행마다 헤드리스 Chromium을 새로 띄우고, 세션 쿠키를 주입한 뒤
//! 페이지를 렌더링합니다. 세션이 닫히면 브라우저 프로세스도 종료됩니다.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::credentials::SessionCredentials;
use super::renderer::{PageRenderer, RenderSession, RenderedPage};
use bcra_core::{BcraError, BcraResult, BrowserConfig};

/// 스크롤 스크립트 (한 화면 + 여유분)
const SCROLL_SCRIPT: &str = "window.scrollBy(0, Math.floor(window.innerHeight * 0.9)); true";

/// Chromium 실행 파일을 찾습니다.
///
/// 설정된 경로 → `CHROMIUM_PATH` → PATH 순서로 검색합니다.
pub fn find_chromium(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Ok(p) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    ["google-chrome", "chromium", "chromium-browser", "google-chrome-stable"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Chromium 렌더러.
pub struct ChromiumRenderer {
    config: BrowserConfig,
    cookie_domain: String,
}

impl ChromiumRenderer {
    /// 새 렌더러를 생성합니다.
    ///
    /// # Arguments
    /// * `config` - 브라우저 설정
    /// * `base_url` - 쿠키를 주입할 사이트 (예: "https://x.com")
    pub fn new(config: BrowserConfig, base_url: &str) -> Self {
        let host = reqwest::Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "x.com".to_string());

        Self {
            config,
            cookie_domain: format!(".{}", host.trim_start_matches("www.")),
        }
    }

    fn cookie_params(&self, credentials: &SessionCredentials) -> BcraResult<Vec<CookieParam>> {
        credentials
            .cookies()
            .map(|(name, value)| {
                CookieParam::builder()
                    .name(name)
                    .value(value)
                    .domain(self.cookie_domain.clone())
                    .path("/")
                    .secure(true)
                    .http_only(name != "ct0")
                    .build()
                    .map_err(|e| BcraError::Config(format!("쿠키 파라미터 생성 실패: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn open(&self, credentials: &SessionCredentials) -> BcraResult<Box<dyn RenderSession>> {
        let chrome_path = find_chromium(self.config.chromium_path.as_ref()).ok_or_else(|| {
            BcraError::Config("Chromium 실행 파일을 찾을 수 없습니다 (CHROMIUM_PATH 설정 필요)".to_string())
        })?;

        let mut builder = ChromeConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--lang=es-AR")
            .arg(format!("--user-agent={}", credentials.user_agent()))
            .window_size(1280, 2000);
        if !self.config.headless {
            builder = builder.with_head();
        }
        let chrome_config = builder
            .build()
            .map_err(|e| BcraError::Config(format!("브라우저 설정 생성 실패: {}", e)))?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BcraError::Config(format!("Chromium 실행 실패: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
            config: self.config.clone(),
            last_url: String::new(),
        };

        // 쿠키 주입 실패 시에도 브라우저는 정리
        if let Err(e) = session.prepare(self.cookie_params(credentials)?).await {
            Box::new(session).close().await;
            return Err(e);
        }

        debug!(domain = %self.cookie_domain, "Chromium 세션 준비 완료");
        Ok(Box::new(session))
    }
}

/// 하나의 Chromium 프로세스와 탭.
struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    config: BrowserConfig,
    last_url: String,
}

impl ChromiumSession {
    async fn prepare(&mut self, cookies: Vec<CookieParam>) -> BcraResult<()> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BcraError::Network(format!("새 탭 생성 실패: {}", e)))?;
        page.set_cookies(cookies)
            .await
            .map_err(|e| BcraError::Authentication(format!("세션 쿠키 주입 실패: {}", e)))?;
        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> BcraResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| BcraError::Network("브라우저 탭이 없습니다".to_string()))
    }

    async fn snapshot(&self) -> BcraResult<RenderedPage> {
        let page = self.page()?;
        let html = page
            .content()
            .await
            .map_err(|e| BcraError::Network(format!("페이지 HTML 조회 실패: {}", e)))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| self.last_url.clone());

        Ok(RenderedPage {
            requested_url: self.last_url.clone(),
            final_url,
            html,
        })
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn load(&mut self, url: &str) -> BcraResult<RenderedPage> {
        self.last_url = url.to_string();
        let timeout = self.config.navigation_timeout();
        let page = self.page()?;

        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(BcraError::Network(format!("페이지 이동 실패 ({}): {}", url, e)))
            }
            Err(_) => {
                return Err(BcraError::Network(format!(
                    "페이지 이동 타임아웃 ({}초): {}",
                    timeout.as_secs(),
                    url
                )))
            }
        }

        // 타임라인은 첫 응답 이후 비동기로 채워짐
        tokio::time::sleep(self.config.settle_delay()).await;
        self.snapshot().await
    }

    async fn scroll(&mut self) -> BcraResult<RenderedPage> {
        self.page()?
            .evaluate(SCROLL_SCRIPT)
            .await
            .map_err(|e| BcraError::Network(format!("스크롤 실패: {}", e)))?;
        tokio::time::sleep(self.config.settle_delay()).await;
        self.snapshot().await
    }

    async fn close(mut self: Box<Self>) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Chromium 종료 요청 실패");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        debug!("Chromium 세션 종료");
    }
}
