//! 원본 이미지 보관소.
//!
//! `<dir>/<YYYY-MM-DD>/bcra_<YYYY-MM-DD>.<ext>` 경로에 이미지를 저장합니다.
//! 같은 날짜로 다시 실행하면 덮어씁니다.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::debug;

use bcra_core::{BcraError, BcraResult};

/// 이미지 보관소.
#[derive(Debug, Clone)]
pub struct ImageArchive {
    root: PathBuf,
}

/// Content-Type 또는 매직 바이트로 확장자를 결정합니다.
pub fn image_extension(content_type: Option<&str>, bytes: &[u8]) -> &'static str {
    let from_header = content_type.and_then(|ct| {
        let mime = ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase();
        match mime.as_str() {
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            _ => None,
        }
    });
    if let Some(ext) = from_header {
        return ext;
    }

    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else {
        "bin"
    }
}

impl ImageArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 날짜별 저장 경로
    pub fn path_for(&self, date: NaiveDate, extension: &str) -> PathBuf {
        let day = date.format("%Y-%m-%d").to_string();
        self.root
            .join(&day)
            .join(format!("bcra_{}.{}", day, extension))
    }

    /// 이미지를 저장하고 경로를 반환합니다.
    pub async fn store(
        &self,
        date: NaiveDate,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> BcraResult<PathBuf> {
        let path = self.path_for(date, image_extension(content_type, bytes));
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                BcraError::Config(format!("보관 디렉토리 생성 실패 ({}): {}", dir.display(), e))
            })?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            BcraError::Config(format!("이미지 저장 실패 ({}): {}", path.display(), e))
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "이미지 보관");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_header_and_magic() {
        assert_eq!(image_extension(Some("image/jpeg"), b""), "jpg");
        assert_eq!(image_extension(Some("image/png; charset=binary"), b""), "png");
        assert_eq!(image_extension(None, &[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(image_extension(Some("application/octet-stream"), b"\x89PNG\r\n\x1a\n"), "png");
        assert_eq!(image_extension(None, b"RIFF\0\0\0\0WEBPVP8 "), "webp");
        assert_eq!(image_extension(None, b"???"), "bin");
    }

    #[tokio::test]
    async fn test_store_uses_dated_path() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ImageArchive::new(dir.path());
        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();

        let path = archive
            .store(date, &[0xFF, 0xD8, 0xFF, 0xE0], None)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("2026-01-16").join("bcra_2026-01-16.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);

        // 같은 날짜는 덮어씀
        archive.store(date, &[0xFF, 0xD8, 0xFF, 0xE1], None).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE1]);
    }
}
