//! 이미지 수집 단계.
//!
//! 자격증명 로드 → 브라우저 세션 열기 → 세션 확인 → 화면별 탐색 →
//! 세션 닫기 → 이미지 다운로드 순서로 진행합니다. 브라우저 세션은
//! 탐색 결과와 관계없이 항상 닫힙니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info};

use super::credentials::SessionCredentials;
use super::discovery::{build_strategies, ensure_logged_in, locate_post, CandidatePost, PostQuery};
use super::media::ImageDownloader;
use super::renderer::{PageRenderer, RenderSession};
use super::{FetchedImage, ImageSource};
use bcra_core::{BcraError, BcraResult, FetcherConfig};

/// 계정 게시물에서 이미지를 가져오는 소스.
pub struct PostFetcher<R: PageRenderer> {
    renderer: R,
    config: FetcherConfig,
}

impl<R: PageRenderer> PostFetcher<R> {
    pub fn new(renderer: R, config: FetcherConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn home_url(&self) -> String {
        format!("{}/home", self.config.base_url.trim_end_matches('/'))
    }

    async fn discover(
        &self,
        session: &mut dyn RenderSession,
        target: NaiveDate,
    ) -> BcraResult<CandidatePost> {
        let home = session.load(&self.home_url()).await?;
        ensure_logged_in(&home)?;
        debug!(url = %home.final_url, "세션 확인 완료");

        let strategies = build_strategies(&self.config);
        let query = PostQuery::new(&self.config, target);
        locate_post(session, &strategies, &query).await
    }
}

#[async_trait]
impl<R: PageRenderer> ImageSource for PostFetcher<R> {
    fn name(&self) -> &str {
        self.renderer.name()
    }

    async fn fetch_image(&self, target: NaiveDate) -> BcraResult<FetchedImage> {
        // 토큰이 없으면 브라우저를 띄우지 않음
        let credentials = SessionCredentials::load(&self.config.credentials_path)?;

        let mut session = self.renderer.open(&credentials).await?;
        let discovered = self.discover(session.as_mut(), target).await;
        session.close().await;
        let post = discovered?;

        let downloader = ImageDownloader::new(credentials.user_agent(), self.config.download_timeout())?;
        let image = downloader.download(&post.image_url).await?;
        info!(
            url = %image.url,
            bytes = image.bytes.len(),
            view = %post.view,
            "게시물 이미지 다운로드 완료"
        );

        Ok(FetchedImage {
            source: image.url,
            bytes: image.bytes,
            content_type: image.content_type,
            post: Some(post),
        })
    }
}

/// 디스크의 이미지를 그대로 사용하는 소스 (보관된 이미지 재처리용).
pub struct LocalImageSource {
    path: PathBuf,
}

impl LocalImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// 확장자로 Content-Type을 추정합니다.
fn content_type_for(path: &std::path::Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime.to_string())
}

#[async_trait]
impl ImageSource for LocalImageSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_image(&self, target: NaiveDate) -> BcraResult<FetchedImage> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            BcraError::Config(format!(
                "이미지 파일을 읽을 수 없습니다 ({}): {}",
                self.path.display(),
                e
            ))
        })?;
        info!(path = %self.path.display(), date = %target, bytes = bytes.len(), "로컬 이미지 사용");

        Ok(FetchedImage {
            post: None,
            source: self.path.display().to_string(),
            content_type: content_type_for(&self.path),
            bytes,
        })
    }
}
