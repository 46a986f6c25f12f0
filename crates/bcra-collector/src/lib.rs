//! DataBCRA daily figures collector.
//!
//! 이 crate는 하루 한 번 실행되는 수집 바이너리를 제공합니다:
//! - 중앙은행 계정의 #DataBCRA 이미지 수집
//! - OCR로 외환보유액과 외환 매입/매도액 추출
//! - 두 테이블에 날짜 키로 upsert

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::CollectorConfig;
pub use pipeline::{Pipeline, StoreMode};
pub use report::RunReport;
