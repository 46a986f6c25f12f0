//! # BCRA Core
//!
//! DataBCRA 수집기의 핵심 타입을 제공합니다:
//! - 외환보유액/외환 개입 레코드 및 파싱 결과
//! - 단계별 에러 분류와 종료 코드
//! - 수집/추출/저장 설정
//! - 대상 날짜와 시간대 처리
//! - 로깅 인프라

pub mod config;
pub mod date;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use date::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
