//! PostFetcher 통합 테스트.
//!
//! 실제 브라우저 대신 미리 정한 HTML을 반환하는 렌더러를 사용하고,
//! 이미지 다운로드는 mockito 서버로 처리합니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bcra_core::{BcraError, BcraResult, DiscoveryView, FetcherConfig};
use bcra_data::provider::{
    ImageSource, PageRenderer, PostFetcher, RenderSession, RenderedPage, SessionCredentials,
};

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    loads: AtomicUsize,
    closes: AtomicUsize,
}

/// URL 경로에 따라 HTML을 돌려주는 가짜 렌더러
struct FakeRenderer {
    counters: Arc<Counters>,
    login_redirect: bool,
    timeline_html: String,
}

struct FakeSession {
    counters: Arc<Counters>,
    login_redirect: bool,
    timeline_html: String,
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn open(&self, _credentials: &SessionCredentials) -> BcraResult<Box<dyn RenderSession>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            counters: self.counters.clone(),
            login_redirect: self.login_redirect,
            timeline_html: self.timeline_html.clone(),
        }))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn load(&mut self, url: &str) -> BcraResult<RenderedPage> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        let final_url = if self.login_redirect {
            "https://x.com/i/flow/login".to_string()
        } else {
            url.to_string()
        };
        let html = if url.ends_with("/BancoCentral_AR") {
            self.timeline_html.clone()
        } else {
            String::new()
        };
        Ok(RenderedPage {
            requested_url: url.to_string(),
            final_url,
            html,
        })
    }

    async fn scroll(&mut self) -> BcraResult<RenderedPage> {
        Ok(RenderedPage {
            requested_url: "scroll".to_string(),
            final_url: "https://x.com/BancoCentral_AR".to_string(),
            html: String::new(),
        })
    }

    async fn close(self: Box<Self>) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn target() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()
}

fn credentials_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn config(credentials: &tempfile::NamedTempFile) -> FetcherConfig {
    FetcherConfig {
        credentials_path: credentials.path().to_path_buf(),
        views: vec![DiscoveryView::Timeline],
        scroll_rounds: 1,
        ..FetcherConfig::default()
    }
}

fn timeline_with_image(image_url: &str) -> String {
    format!(
        r#"<article data-testid="tweet">
             <a href="/BancoCentral_AR/status/1880000000000000001"><time datetime="2026-01-16T21:30:00.000Z"></time></a>
             <div data-testid="tweetText">#DataBCRA Principales variables</div>
             <div data-testid="tweetPhoto"><img src="{image_url}"></div>
           </article>"#
    )
}

fn renderer(counters: &Arc<Counters>, login_redirect: bool, timeline_html: String) -> FakeRenderer {
    FakeRenderer {
        counters: counters.clone(),
        login_redirect,
        timeline_html,
    }
}

#[tokio::test]
async fn test_missing_tokens_fail_before_navigation() {
    let creds = credentials_file(r#"{"cookies": {"auth_token": "", "ct0": ""}}"#);
    let counters = Arc::new(Counters::default());
    let fetcher = PostFetcher::new(renderer(&counters, false, String::new()), config(&creds));

    let err = fetcher.fetch_image(target()).await.unwrap_err();
    assert!(matches!(err, BcraError::Authentication(_)));
    assert_eq!(counters.opens.load(Ordering::SeqCst), 0);
    assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_login_redirect_is_authentication_error() {
    let creds = credentials_file(r#"{"cookies": {"auth_token": "a", "ct0": "b"}}"#);
    let counters = Arc::new(Counters::default());
    let fetcher = PostFetcher::new(renderer(&counters, true, String::new()), config(&creds));

    let err = fetcher.fetch_image(target()).await.unwrap_err();
    assert!(matches!(err, BcraError::Authentication(_)));
    // 홈 화면 확인에서 중단
    assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_matching_post_is_not_found() {
    let creds = credentials_file(r#"{"cookies": {"auth_token": "a", "ct0": "b"}}"#);
    let counters = Arc::new(Counters::default());
    let fetcher = PostFetcher::new(renderer(&counters, false, String::new()), config(&creds));

    let err = fetcher.fetch_image(target()).await.unwrap_err();
    assert!(matches!(err, BcraError::NotFound(_)));
    assert!(err.is_benign());
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetches_image_of_matching_post() {
    let mut server = mockito::Server::new_async().await;
    let image = server
        .mock("GET", "/media/GhAbC.jpg")
        .match_header("user-agent", "TestAgent/1.0")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body([0xFF, 0xD8, 0xFF, 0xE0])
        .create_async()
        .await;

    let creds = credentials_file(
        r#"{"cookies": {"auth_token": "a", "ct0": "b"}, "user_agent": "TestAgent/1.0"}"#,
    );
    let counters = Arc::new(Counters::default());
    let image_url = format!("{}/media/GhAbC.jpg", server.url());
    let fetcher = PostFetcher::new(
        renderer(&counters, false, timeline_with_image(&image_url)),
        config(&creds),
    );

    let fetched = fetcher.fetch_image(target()).await.unwrap();
    assert_eq!(fetched.bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
    assert_eq!(fetched.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(fetched.source, image_url);

    let post = fetched.post.unwrap();
    assert_eq!(post.status_id, "1880000000000000001");
    assert_eq!(post.view, DiscoveryView::Timeline);

    // 홈 + 타임라인
    assert_eq!(counters.loads.load(Ordering::SeqCst), 2);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    image.assert_async().await;
}
