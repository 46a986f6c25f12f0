//! 이미지 수집 Provider 모듈.
//!
//! ## 계정 게시물
//! - `PostFetcher`: 세션 토큰으로 브라우저를 열어 대상 날짜의 게시물을 찾고
//!   원본 해상도 이미지를 다운로드
//! - `ChromiumRenderer`: chromiumoxide 기반 헤드리스 렌더러
//! - 탐색 화면: 미디어 탭 → 날짜 검색 → 타임라인
//!
//! ## 로컬 파일
//! - `LocalImageSource`: 보관된 이미지를 다시 파싱할 때 사용

pub mod chromium;
pub mod credentials;
pub mod discovery;
pub mod fetcher;
pub mod media;
pub mod renderer;
pub mod timeline;

pub use chromium::ChromiumRenderer;
pub use credentials::SessionCredentials;
pub use discovery::{
    build_strategies, locate_post, CandidatePost, DateSearchStrategy, DiscoveryStrategy,
    MediaViewStrategy, PostQuery, TimelineStrategy,
};
pub use fetcher::{LocalImageSource, PostFetcher};
pub use media::{original_image_url, DownloadedImage, ImageDownloader};
pub use renderer::{is_login_url, PageRenderer, RenderSession, RenderedPage};
pub use timeline::{parse_media_grid, parse_post_cards, GridItem, PostCard};

use async_trait::async_trait;
use chrono::NaiveDate;

use bcra_core::BcraResult;

/// 수집 단계 결과 이미지.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// 이미지를 찾은 게시물 (로컬 파일이면 None)
    pub post: Option<CandidatePost>,
    /// 다운로드 URL 또는 파일 경로
    pub source: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// 대상 날짜의 이미지를 제공하는 소스.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// 소스 이름 (로그용)
    fn name(&self) -> &str;

    /// 대상 날짜의 이미지를 가져옵니다.
    async fn fetch_image(&self, target: NaiveDate) -> BcraResult<FetchedImage>;
}
