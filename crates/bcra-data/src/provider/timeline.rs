//! 렌더링된 타임라인 HTML 파서.
//!
//! 게시물 카드(`article[data-testid="tweet"]`)와 미디어 그리드 항목을
//! 구조체로 변환합니다. 브라우저 없이 테스트할 수 있도록 순수 함수로만
//! 구성되어 있습니다.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

static ARTICLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"article[data-testid="tweet"]"#).expect("static selector"));
static STATUS_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/status/"]"#).expect("static selector"));
static TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("static selector"));
static TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[data-testid="tweetText"]"#).expect("static selector"));
static PHOTO: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-testid="tweetPhoto"] img, img[src*="pbs.twimg.com/media"]"#)
        .expect("static selector")
});
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").expect("static selector"));

/// `/<account>/status/<id>` 경로
static STATUS_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([A-Za-z0-9_]+)/status/(\d+)").expect("static regex"));

/// 타임라인의 게시물 카드 하나.
#[derive(Debug, Clone, PartialEq)]
pub struct PostCard {
    /// 게시물 ID
    pub status_id: String,
    /// 작성 계정 (퍼머링크 경로 기준)
    pub author: String,
    /// 게시물 절대 URL
    pub status_url: String,
    /// 게시 시각
    pub posted_at: Option<DateTime<Utc>>,
    /// 본문 텍스트
    pub text: String,
    /// 첨부 사진 URL (렌더링된 그대로)
    pub image_urls: Vec<String>,
}

impl PostCard {
    /// 사진이 하나 이상 있는지
    pub fn has_photo(&self) -> bool {
        !self.image_urls.is_empty()
    }
}

/// 미디어 그리드 항목 (상세 페이지로 이동해야 본문/시각을 알 수 있음).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridItem {
    pub status_id: String,
    pub author: String,
    pub status_url: String,
}

/// 상대/절대 href에서 (계정, 게시물 ID, 절대 URL)을 추출합니다.
fn resolve_status(base: &Url, href: &str) -> Option<(String, String, String)> {
    let url = base.join(href).ok()?;
    let caps = STATUS_PATH.captures(url.path())?;
    let author = caps.get(1)?.as_str().to_string();
    let id = caps.get(2)?.as_str().to_string();
    let canonical = base.join(&format!("/{}/status/{}", author, id)).ok()?;
    Some((author, id, canonical.to_string()))
}

/// 카드의 퍼머링크. 시각(`time`)을 감싼 링크를 우선합니다.
fn permalink(base: &Url, article: &ElementRef<'_>) -> Option<(String, String, String)> {
    let links: Vec<ElementRef<'_>> = article.select(&STATUS_LINK).collect();
    links
        .iter()
        .find(|a| a.select(&TIME).next().is_some())
        .or_else(|| links.first())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_status(base, href))
}

fn posted_at(article: &ElementRef<'_>) -> Option<DateTime<Utc>> {
    article
        .select(&TIME)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn card_text(article: &ElementRef<'_>) -> String {
    let text = article
        .select(&TEXT)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    // 해시태그 이모지 등은 img alt로 렌더링됨
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn photo_urls(base: &Url, article: &ElementRef<'_>) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for img in article.select(&PHOTO) {
        if let Some(src) = img.value().attr("src") {
            if let Ok(url) = base.join(src) {
                let url = url.to_string();
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
    }
    urls
}

/// 렌더링된 HTML에서 게시물 카드를 문서 순서대로 추출합니다.
///
/// 퍼머링크가 없는 카드(광고, 빈 자리표시자)는 건너뜁니다.
pub fn parse_post_cards(html: &str, base_url: &str) -> Vec<PostCard> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&ARTICLE)
        .filter_map(|article| {
            let (author, status_id, status_url) = permalink(&base, &article)?;
            Some(PostCard {
                status_id,
                author,
                status_url,
                posted_at: posted_at(&article),
                text: card_text(&article),
                image_urls: photo_urls(&base, &article),
            })
        })
        .collect()
}

/// 미디어 그리드에서 사진 링크가 있는 게시물을 중복 없이 추출합니다.
pub fn parse_media_grid(html: &str, base_url: &str) -> Vec<GridItem> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut items: Vec<GridItem> = Vec::new();
    for link in document.select(&STATUS_LINK) {
        if link.select(&IMG).next().is_none() {
            continue;
        }
        let Some((author, status_id, status_url)) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_status(&base, href))
        else {
            continue;
        };
        if items.iter().any(|item| item.status_id == status_id) {
            continue;
        }
        items.push(GridItem {
            status_id,
            author,
            status_url,
        });
    }
    items
}
