//! 게시물 이미지 다운로드.
//!
//! 타임라인에 렌더링된 썸네일 대신 원본 해상도(`name=orig`)를 먼저 받고,
//! 원본 요청이 거부되면 렌더링된 URL을 한 번 더 시도합니다.

use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use bcra_core::{BcraError, BcraResult};

/// 미디어 호스트
const MEDIA_HOST: &str = "pbs.twimg.com";

/// 비정상 HTTP 상태 에러 메시지 접두사
const STATUS_PREFIX: &str = "HTTP 상태 ";

/// 다운로드한 이미지.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    /// 실제로 받은 URL
    pub url: String,
    pub bytes: Vec<u8>,
    /// Content-Type 헤더 (없으면 None)
    pub content_type: Option<String>,
}

/// 가장 높은 해상도의 이미지 URL을 반환합니다.
///
/// - `https://pbs.twimg.com/media/<id>?format=jpg&name=small` → `name=orig`
/// - `https://pbs.twimg.com/media/<id>.jpg:large` → `:orig`
/// - 그 외 URL은 그대로 반환
pub fn original_image_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.host_str() != Some(MEDIA_HOST) || !parsed.path().starts_with("/media/") {
        return url.to_string();
    }

    // 레거시 `:size` 접미사
    let path = parsed.path().to_string();
    if let Some((stem, _size)) = path.rsplit_once(':') {
        parsed.set_path(&format!("{}:orig", stem));
        return parsed.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "name")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("name", "orig");
    parsed.to_string()
}

/// 이미지 다운로더.
pub struct ImageDownloader {
    client: Client,
}

impl ImageDownloader {
    /// 새 다운로더를 생성합니다.
    pub fn new(user_agent: &str, timeout: Duration) -> BcraResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| BcraError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self { client })
    }

    /// 원본 해상도 → 렌더링된 URL 순서로 다운로드합니다.
    pub async fn download(&self, rendered_url: &str) -> BcraResult<DownloadedImage> {
        let original = original_image_url(rendered_url);
        if original == rendered_url {
            return self.get(rendered_url).await;
        }

        match self.get(&original).await {
            Ok(image) => Ok(image),
            Err(BcraError::Network(reason)) if reason.starts_with(STATUS_PREFIX) => {
                warn!(url = %original, reason = %reason, "원본 해상도 거부, 렌더링된 URL로 재시도");
                self.get(rendered_url).await
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, url: &str) -> BcraResult<DownloadedImage> {
        debug!(url = %url, "이미지 다운로드");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BcraError::Network(format!("이미지 요청 실패 ({}): {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BcraError::Network(format!(
                "{}{} ({})",
                STATUS_PREFIX, status, url
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BcraError::Network(format!("이미지 본문 수신 실패 ({}): {}", url, e)))?;
        if bytes.is_empty() {
            return Err(BcraError::Network(format!("빈 이미지 응답 ({})", url)));
        }

        Ok(DownloadedImage {
            url: url.to_string(),
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
