//! 저장 모듈.
//!
//! - `figures`: 일별 수치 PostgreSQL upsert
//! - `archive`: 원본 이미지 파일 보관

pub mod archive;
pub mod figures;

pub use archive::{image_extension, ImageArchive};
pub use figures::{upsert_sql, FigureStore, PgFigureStore};
