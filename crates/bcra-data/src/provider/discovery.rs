//! 게시물 탐색 전략.
//!
//! 대상 날짜의 #DataBCRA 게시물을 여러 화면에서 순서대로 찾습니다.
//!
//! ## 화면 우선순위 (기본값)
//! 1. 미디어 탭 (`/<account>/media`): 그리드 항목의 상세 페이지를 열어 확인
//! 2. 날짜 검색 (`/search?q=from:<account> ... since:<D> until:<D+2>`)
//! 3. 계정 타임라인 (`/<account>`)
//!
//! 먼저 일치하는 게시물이 이깁니다. 한 화면이 네트워크 에러로 실패해도
//! 다음 화면은 시도하지만, 인증 에러는 즉시 탐색을 중단합니다.

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Url;
use tracing::{debug, info, warn};

use super::renderer::{RenderSession, RenderedPage};
use super::timeline::{parse_media_grid, parse_post_cards, GridItem, PostCard};
use bcra_core::{local_date_of, BcraError, BcraResult, DiscoveryView, FetcherConfig};

/// 탐색으로 찾은 게시물.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePost {
    pub status_id: String,
    pub status_url: String,
    pub posted_at: DateTime<Utc>,
    pub text: String,
    /// 첫 번째 첨부 사진 (렌더링된 URL)
    pub image_url: String,
    /// 게시물을 찾은 화면
    pub view: DiscoveryView,
}

/// 게시물 일치 조건.
#[derive(Debug, Clone)]
pub struct PostQuery {
    pub target: NaiveDate,
    pub account: String,
    pub keywords: Vec<String>,
    pub timezone: Tz,
}

impl PostQuery {
    /// 설정에서 조건을 구성합니다.
    pub fn new(config: &FetcherConfig, target: NaiveDate) -> Self {
        Self {
            target,
            account: config.account.clone(),
            keywords: config.keywords.clone(),
            timezone: config.timezone,
        }
    }

    /// 게시 날짜(설정된 시간대 기준)가 대상 날짜와 같은지
    fn is_target_day(&self, posted_at: DateTime<Utc>) -> bool {
        local_date_of(posted_at, self.timezone) == self.target
    }

    /// 게시 날짜가 대상 날짜보다 이전인지 (시간 역순 목록의 탐색 종료 조건)
    fn is_before_target(&self, card: &PostCard) -> bool {
        card.posted_at
            .map(|t| local_date_of(t, self.timezone) < self.target)
            .unwrap_or(false)
    }

    fn has_keyword(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .any(|kw| !kw.trim().is_empty() && text.contains(&kw.trim().to_lowercase()))
    }

    /// 카드가 조건을 모두 만족하는지 확인합니다.
    ///
    /// 대상 계정 작성, 대상 날짜 게시, 키워드 포함, 사진 첨부.
    pub fn matches(&self, card: &PostCard) -> bool {
        card.author.eq_ignore_ascii_case(&self.account)
            && card.posted_at.map(|t| self.is_target_day(t)).unwrap_or(false)
            && self.has_keyword(&card.text)
            && card.has_photo()
    }

    fn candidate(&self, card: &PostCard, view: DiscoveryView) -> Option<CandidatePost> {
        if !self.matches(card) {
            return None;
        }
        Some(CandidatePost {
            status_id: card.status_id.clone(),
            status_url: card.status_url.clone(),
            posted_at: card.posted_at?,
            text: card.text.clone(),
            image_url: card.image_urls.first()?.clone(),
            view,
        })
    }
}

/// 하나의 탐색 화면.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// 화면 종류
    fn view(&self) -> DiscoveryView;

    /// 화면에서 조건에 맞는 게시물을 찾습니다. 없으면 `Ok(None)`.
    async fn locate(
        &self,
        session: &mut dyn RenderSession,
        query: &PostQuery,
    ) -> BcraResult<Option<CandidatePost>>;
}

/// 로그인 화면으로 보내졌으면 인증 에러를 반환합니다.
pub fn ensure_logged_in(page: &RenderedPage) -> BcraResult<()> {
    if page.is_login_redirect() {
        return Err(BcraError::Authentication(format!(
            "세션이 만료되어 로그인 화면으로 이동했습니다: {} -> {}",
            page.requested_url, page.final_url
        )));
    }
    Ok(())
}

async fn load_checked(session: &mut dyn RenderSession, url: &str) -> BcraResult<RenderedPage> {
    let page = session.load(url).await?;
    ensure_logged_in(&page)?;
    Ok(page)
}

async fn scroll_checked(session: &mut dyn RenderSession) -> BcraResult<RenderedPage> {
    let page = session.scroll().await?;
    ensure_logged_in(&page)?;
    Ok(page)
}

/// 시간 역순 피드(검색 결과, 타임라인)를 스크롤하며 일치하는 카드를 찾습니다.
async fn scan_feed(
    session: &mut dyn RenderSession,
    url: &str,
    base_url: &str,
    scroll_rounds: u32,
    query: &PostQuery,
    view: DiscoveryView,
) -> BcraResult<Option<CandidatePost>> {
    let mut page = load_checked(session, url).await?;

    for round in 0..=scroll_rounds {
        let cards = parse_post_cards(&page.html, base_url);
        debug!(view = %view, round, cards = cards.len(), "피드 스냅샷");

        if let Some(found) = cards.iter().find_map(|c| query.candidate(c, view)) {
            return Ok(Some(found));
        }

        // 마지막 카드가 대상 날짜 이전이면 더 내려도 없음
        if cards.last().map(|c| query.is_before_target(c)).unwrap_or(false) {
            debug!(view = %view, round, "대상 날짜 이전 게시물에 도달");
            break;
        }

        if round < scroll_rounds {
            page = scroll_checked(session).await?;
        }
    }

    Ok(None)
}

/// 미디어 탭 전략.
pub struct MediaViewStrategy {
    base_url: String,
    scroll_rounds: u32,
    max_detail_pages: usize,
}

impl MediaViewStrategy {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scroll_rounds: config.scroll_rounds,
            max_detail_pages: config.max_detail_pages,
        }
    }

    pub fn url(&self, account: &str) -> String {
        format!("{}/{}/media", self.base_url, account)
    }

    async fn collect_grid(
        &self,
        session: &mut dyn RenderSession,
        account: &str,
    ) -> BcraResult<Vec<GridItem>> {
        let mut page = load_checked(session, &self.url(account)).await?;
        let mut items: Vec<GridItem> = Vec::new();

        for round in 0..=self.scroll_rounds {
            for item in parse_media_grid(&page.html, &self.base_url) {
                if !items.iter().any(|i| i.status_id == item.status_id) {
                    items.push(item);
                }
            }
            if items.len() >= self.max_detail_pages || round == self.scroll_rounds {
                break;
            }
            page = scroll_checked(session).await?;
        }

        items.truncate(self.max_detail_pages);
        Ok(items)
    }
}

#[async_trait]
impl DiscoveryStrategy for MediaViewStrategy {
    fn view(&self) -> DiscoveryView {
        DiscoveryView::Media
    }

    async fn locate(
        &self,
        session: &mut dyn RenderSession,
        query: &PostQuery,
    ) -> BcraResult<Option<CandidatePost>> {
        let items = self.collect_grid(session, &query.account).await?;
        debug!(items = items.len(), "미디어 그리드 항목");

        for item in items {
            if !item.author.eq_ignore_ascii_case(&query.account) {
                continue;
            }
            let page = load_checked(session, &item.status_url).await?;
            let cards = parse_post_cards(&page.html, &self.base_url);
            let Some(card) = cards.iter().find(|c| c.status_id == item.status_id) else {
                debug!(status_id = %item.status_id, "상세 페이지에서 게시물 카드를 찾지 못함");
                continue;
            };

            if let Some(found) = query.candidate(card, self.view()) {
                return Ok(Some(found));
            }
            if query.is_before_target(card) {
                break;
            }
        }

        Ok(None)
    }
}

/// 날짜 범위 검색 전략.
pub struct DateSearchStrategy {
    base_url: String,
    scroll_rounds: u32,
}

impl DateSearchStrategy {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scroll_rounds: config.scroll_rounds,
        }
    }

    /// 검색어: `from:<account> (<kw1> OR <kw2>) since:<D> until:<D+2>`
    ///
    /// 검색 엔진의 날짜 경계가 UTC 기준이라 `until`을 하루 더 늘리고,
    /// 정확한 날짜 비교는 카드 단위로 합니다.
    pub fn search_query(query: &PostQuery) -> String {
        let keywords: Vec<String> = query
            .keywords
            .iter()
            .map(|kw| kw.trim())
            .filter(|kw| !kw.is_empty())
            .map(|kw| {
                if kw.contains(char::is_whitespace) {
                    format!("\"{}\"", kw)
                } else {
                    kw.to_string()
                }
            })
            .collect();

        let until = query
            .target
            .checked_add_days(Days::new(2))
            .unwrap_or(query.target);

        let mut q = format!("from:{}", query.account);
        if !keywords.is_empty() {
            q.push_str(&format!(" ({})", keywords.join(" OR ")));
        }
        q.push_str(&format!(
            " since:{} until:{}",
            query.target.format("%Y-%m-%d"),
            until.format("%Y-%m-%d")
        ));
        q
    }

    pub fn url(&self, query: &PostQuery) -> BcraResult<String> {
        let q = Self::search_query(query);
        Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", q.as_str()), ("src", "typed_query"), ("f", "live")],
        )
        .map(|u| u.to_string())
        .map_err(|e| BcraError::Config(format!("검색 URL 생성 실패: {}", e)))
    }
}

#[async_trait]
impl DiscoveryStrategy for DateSearchStrategy {
    fn view(&self) -> DiscoveryView {
        DiscoveryView::Search
    }

    async fn locate(
        &self,
        session: &mut dyn RenderSession,
        query: &PostQuery,
    ) -> BcraResult<Option<CandidatePost>> {
        let url = self.url(query)?;
        scan_feed(
            session,
            &url,
            &self.base_url,
            self.scroll_rounds,
            query,
            self.view(),
        )
        .await
    }
}

/// 계정 타임라인 전략.
pub struct TimelineStrategy {
    base_url: String,
    scroll_rounds: u32,
}

impl TimelineStrategy {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scroll_rounds: config.scroll_rounds,
        }
    }

    pub fn url(&self, account: &str) -> String {
        format!("{}/{}", self.base_url, account)
    }
}

#[async_trait]
impl DiscoveryStrategy for TimelineStrategy {
    fn view(&self) -> DiscoveryView {
        DiscoveryView::Timeline
    }

    async fn locate(
        &self,
        session: &mut dyn RenderSession,
        query: &PostQuery,
    ) -> BcraResult<Option<CandidatePost>> {
        let url = self.url(&query.account);
        scan_feed(
            session,
            &url,
            &self.base_url,
            self.scroll_rounds,
            query,
            self.view(),
        )
        .await
    }
}

/// 설정된 화면 순서대로 전략을 생성합니다. 중복 화면은 한 번만 사용합니다.
pub fn build_strategies(config: &FetcherConfig) -> Vec<Box<dyn DiscoveryStrategy>> {
    let mut seen: Vec<DiscoveryView> = Vec::new();
    let mut strategies: Vec<Box<dyn DiscoveryStrategy>> = Vec::new();

    for view in &config.views {
        if seen.contains(view) {
            continue;
        }
        seen.push(*view);
        strategies.push(match view {
            DiscoveryView::Media => Box::new(MediaViewStrategy::new(config)),
            DiscoveryView::Search => Box::new(DateSearchStrategy::new(config)),
            DiscoveryView::Timeline => Box::new(TimelineStrategy::new(config)),
        });
    }
    strategies
}

/// 전략을 순서대로 실행해 첫 번째로 일치하는 게시물을 반환합니다.
///
/// - 인증/설정 에러: 즉시 반환
/// - 네트워크 에러: 다음 화면으로 진행, 끝까지 못 찾으면 마지막 네트워크 에러 반환
/// - 모든 화면에서 없음: `NotFound`
pub async fn locate_post(
    session: &mut dyn RenderSession,
    strategies: &[Box<dyn DiscoveryStrategy>],
    query: &PostQuery,
) -> BcraResult<CandidatePost> {
    let mut network_error: Option<BcraError> = None;

    for strategy in strategies {
        let view = strategy.view();
        match strategy.locate(session, query).await {
            Ok(Some(found)) => {
                info!(
                    view = %view,
                    status_id = %found.status_id,
                    posted_at = %found.posted_at,
                    "대상 게시물 발견"
                );
                return Ok(found);
            }
            Ok(None) => {
                info!(view = %view, date = %query.target, "이 화면에서 게시물을 찾지 못함");
            }
            Err(e @ BcraError::Network(_)) => {
                warn!(view = %view, error = %e, "화면 탐색 중 네트워크 에러, 다음 화면 시도");
                network_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(network_error.unwrap_or_else(|| {
        BcraError::NotFound(format!(
            "{}의 #DataBCRA 게시물이 없습니다 (@{})",
            query.target, query.account
        ))
    }))
}
