//! OCR 엔진.
//!
//! 기본 구현은 `tesseract` CLI를 자식 프로세스로 실행합니다.
//! 이미지는 stdin으로 전달하고 인식 결과는 stdout에서 읽습니다.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use bcra_core::{BcraError, BcraResult, OcrConfig};

/// 이미지 → 텍스트 인식기.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// 엔진 이름 (로그용)
    fn name(&self) -> &str;

    /// 이미지 바이트에서 텍스트를 인식합니다.
    async fn recognize(&self, image: &[u8]) -> BcraResult<String>;
}

/// tesseract CLI 엔진.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// 명령행 인자: `stdin stdout -l <langs> [--psm <n>]`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.config.languages.clone(),
        ];
        if let Some(psm) = self.config.page_segmentation {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }
        args
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &[u8]) -> BcraResult<String> {
        let program = &self.config.tesseract_path;
        let mut child = Command::new(program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BcraError::Recognition(format!(
                    "tesseract 실행 실패 ({}): {}",
                    program.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| BcraError::Recognition("tesseract stdin을 열 수 없습니다".to_string()))?;
        let input = image.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let timeout = self.config.timeout();
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(BcraError::Recognition(format!("tesseract 출력 수신 실패: {}", e)))
            }
            Err(_) => {
                return Err(BcraError::Recognition(format!(
                    "tesseract 타임아웃 ({}초)",
                    timeout.as_secs()
                )))
            }
        };

        // 프로세스가 입력을 다 읽기 전에 종료되면 쓰기 에러가 나므로 종료 코드를 우선함
        let write_result = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BcraError::Recognition(format!(
                "tesseract 비정상 종료 ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        if let Ok(Err(e)) = write_result {
            return Err(BcraError::Recognition(format!("tesseract 입력 전달 실패: {}", e)));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "OCR 완료");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args() {
        let ocr = TesseractOcr::new(OcrConfig::default());
        assert_eq!(ocr.args(), vec!["stdin", "stdout", "-l", "spa+eng", "--psm", "6"]);

        let ocr = TesseractOcr::new(OcrConfig {
            languages: "spa".to_string(),
            page_segmentation: None,
            ..OcrConfig::default()
        });
        assert_eq!(ocr.args(), vec!["stdin", "stdout", "-l", "spa"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_recognition_error() {
        let ocr = TesseractOcr::new(OcrConfig {
            tesseract_path: PathBuf::from("/nonexistent/tesseract"),
            ..OcrConfig::default()
        });
        let err = ocr.recognize(b"not an image").await.unwrap_err();
        assert!(matches!(err, BcraError::Recognition(_)));
    }

    #[tokio::test]
    #[ignore] // tesseract 설치 필요
    async fn test_invalid_image_is_recognition_error() {
        let ocr = TesseractOcr::new(OcrConfig::default());
        let err = ocr.recognize(b"not an image").await.unwrap_err();
        assert!(matches!(err, BcraError::Recognition(_)));
    }
}
