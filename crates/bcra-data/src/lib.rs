//! # BCRA Data
//!
//! DataBCRA 수집기의 데이터 계층:
//! - `provider`: 세션 토큰 기반 게시물 탐색과 이미지 다운로드
//! - `extract`: OCR과 수치 파싱
//! - `storage`: PostgreSQL upsert와 이미지 보관

pub mod extract;
pub mod provider;
pub mod storage;

pub use extract::{Extraction, FigureExtractor, FigureParser, OcrEngine, TesseractOcr};
pub use provider::{
    ChromiumRenderer, FetchedImage, ImageSource, LocalImageSource, PageRenderer, PostFetcher,
};
pub use storage::{FigureStore, ImageArchive, PgFigureStore};
