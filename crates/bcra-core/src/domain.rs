//! 도메인 모델.
//!
//! 하루치 이미지에서 추출한 두 수치(외환보유액, 외환시장 개입액)와
//! 테이블에 저장되는 레코드 타입을 정의합니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 이미지에서 추출하는 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureField {
    /// 외환보유액 (백만 USD)
    Reserves,
    /// 외환 매입/매도액 (백만 USD, 부호 포함)
    Intervention,
}

impl fmt::Display for FigureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserves => write!(f, "reserves"),
            Self::Intervention => write!(f, "intervention"),
        }
    }
}

/// 게시물 탐색 화면 (우선순위 순서로 시도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryView {
    /// 계정의 미디어 탭
    Media,
    /// 날짜 범위로 제한한 키워드 검색
    Search,
    /// 계정의 일반 타임라인
    Timeline,
}

impl DiscoveryView {
    /// 기본 우선순위.
    pub const DEFAULT_ORDER: [DiscoveryView; 3] = [Self::Media, Self::Search, Self::Timeline];

    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Search => "search",
            Self::Timeline => "timeline",
        }
    }
}

impl fmt::Display for DiscoveryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "media" => Ok(Self::Media),
            "search" => Ok(Self::Search),
            "timeline" => Ok(Self::Timeline),
            _ => Err(format!("Unknown discovery view: {}", s)),
        }
    }
}

/// 외환시장 개입 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionDirection {
    /// 순매입 (양수)
    Purchase,
    /// 순매도 (음수)
    Sale,
    /// 개입 없음 (0)
    None,
}

impl InterventionDirection {
    /// 부호 있는 금액에서 방향을 판단합니다.
    pub fn from_value(value: Decimal) -> Self {
        if value.is_zero() {
            Self::None
        } else if value.is_sign_negative() {
            Self::Sale
        } else {
            Self::Purchase
        }
    }
}

/// 이미지 한 장에서 파싱한 수치.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFigures {
    /// 외환보유액 (백만 USD)
    pub reserves_musd: Decimal,
    /// 외환 매입(+)/매도(-)액 (백만 USD)
    pub intervention_musd: Decimal,
    /// 이미지에 인쇄된 날짜 (인식된 경우)
    pub printed_date: Option<NaiveDate>,
}

impl DailyFigures {
    /// 대상 날짜의 저장 레코드로 변환합니다.
    pub fn into_records(self, date: NaiveDate) -> (ReserveRecord, InterventionRecord) {
        (
            ReserveRecord {
                date,
                value: self.reserves_musd,
            },
            InterventionRecord {
                date,
                value: self.intervention_musd,
            },
        )
    }
}

/// 외환보유액 레코드 (날짜당 1행).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRecord {
    pub date: NaiveDate,
    /// 백만 USD
    pub value: Decimal,
}

/// 외환시장 개입 레코드 (날짜당 1행).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub date: NaiveDate,
    /// 백만 USD, 양수=매입, 음수=매도, 0=개입 없음
    pub value: Decimal,
}

impl InterventionRecord {
    /// 개입 방향
    pub fn direction(&self) -> InterventionDirection {
        InterventionDirection::from_value(self.value)
    }
}
