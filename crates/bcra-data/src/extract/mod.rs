//! 이미지 수치 추출 모듈.
//!
//! - `preprocess`: OCR 전 이미지 보정
//! - `ocr`: `OcrEngine` trait과 tesseract 구현
//! - `number`: 스페인어권 숫자 표기 파서
//! - `parser`: 라벨 기반 수치 추출 규칙

pub mod number;
pub mod ocr;
pub mod parser;
pub mod preprocess;

pub use number::{parse_es_number, NumberFormatError};
pub use ocr::{OcrEngine, TesseractOcr};
pub use parser::{normalize_text, printed_date, FigureParser};
pub use preprocess::prepare_for_ocr;

use tracing::debug;

use bcra_core::{BcraResult, DailyFigures};

/// 추출 결과.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// OCR 원문
    pub text: String,
    pub figures: DailyFigures,
}

/// OCR + 파싱 단계.
pub struct FigureExtractor<O: OcrEngine> {
    ocr: O,
    parser: FigureParser,
    preprocess: bool,
}

impl<O: OcrEngine> FigureExtractor<O> {
    pub fn new(ocr: O, preprocess: bool) -> Self {
        Self {
            ocr,
            parser: FigureParser::default(),
            preprocess,
        }
    }

    pub fn with_parser(mut self, parser: FigureParser) -> Self {
        self.parser = parser;
        self
    }

    /// 이미지에서 두 수치를 추출합니다.
    pub async fn extract(&self, image: &[u8]) -> BcraResult<Extraction> {
        let text = if self.preprocess {
            let prepared = prepare_for_ocr(image)?;
            self.ocr.recognize(&prepared).await?
        } else {
            self.ocr.recognize(image).await?
        };
        debug!(engine = self.ocr.name(), text = %text, "OCR 결과");

        let figures = self.parser.parse(&text)?;
        Ok(Extraction { text, figures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bcra_core::{BcraError, FigureField};
    use rust_decimal_macros::dec;

    struct FixedOcr(&'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _image: &[u8]) -> BcraResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_extract_without_preprocessing() {
        let extractor = FigureExtractor::new(FixedOcr("44.808\nReservas\n2]\nCompra"), false);
        let extraction = extractor.extract(b"raw").await.unwrap();
        assert_eq!(extraction.figures.reserves_musd, dec!(44808));
        assert_eq!(extraction.figures.intervention_musd, dec!(2));
        assert!(extraction.text.contains("Reservas"));
    }

    #[tokio::test]
    async fn test_preprocessing_rejects_non_image() {
        let extractor = FigureExtractor::new(FixedOcr("Reservas 1"), true);
        let err = extractor.extract(b"raw").await.unwrap_err();
        assert!(matches!(err, BcraError::Recognition(_)));
    }

    #[tokio::test]
    async fn test_parse_failure_names_field() {
        let extractor = FigureExtractor::new(FixedOcr("texto ilegible"), false);
        match extractor.extract(b"raw").await {
            Err(BcraError::Parse { field, .. }) => assert_eq!(field, FigureField::Reserves),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
