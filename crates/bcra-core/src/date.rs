//! 대상 날짜 처리.
//!
//! 대상 날짜는 시간 성분이 없는 달력 날짜이며, 기본값은 설정된 시간대의 오늘입니다.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{BcraError, BcraResult};

/// 기본 시간대 (부에노스아이레스).
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Argentina::Buenos_Aires;

/// ISO 8601 (YYYY-MM-DD) 날짜 문자열 파싱.
///
/// 시간 성분이나 다른 구분자는 허용하지 않습니다.
pub fn parse_target_date(s: &str) -> BcraResult<NaiveDate> {
    let s = s.trim();
    if s.len() != 10 {
        return Err(BcraError::Config(format!(
            "잘못된 날짜 형식: {}. YYYY-MM-DD 형식이어야 합니다",
            s
        )));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        BcraError::Config(format!(
            "잘못된 날짜 형식: {} ({}). YYYY-MM-DD 형식이어야 합니다",
            s, e
        ))
    })
}

/// 시간대 이름 파싱 (예: "America/Argentina/Buenos_Aires").
pub fn parse_timezone(name: &str) -> BcraResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| BcraError::Config(format!("알 수 없는 시간대: {} ({})", name, e)))
}

/// 주어진 시간대의 오늘 날짜.
pub fn today_in(tz: Tz) -> NaiveDate {
    local_date_of(Utc::now(), tz)
}

/// UTC 시각을 주어진 시간대의 달력 날짜로 변환합니다.
pub fn local_date_of(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_target_date_round_trip() {
        let date = parse_target_date("2026-01-16").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2026-01-16");
        assert_eq!(date.to_string(), "2026-01-16");
    }

    #[test]
    fn test_parse_target_date_rejects_other_forms() {
        assert!(parse_target_date("16/01/2026").is_err());
        assert!(parse_target_date("2026-1-16").is_err());
        assert!(parse_target_date("2026-01-16T10:00:00").is_err());
        assert!(parse_target_date("2026-02-30").is_err());
        assert!(parse_target_date("").is_err());
    }

    #[test]
    fn test_local_date_of_crosses_midnight() {
        // 2026-01-17 01:30 UTC == 2026-01-16 22:30 ART (UTC-3)
        let instant = Utc.with_ymd_and_hms(2026, 1, 17, 1, 30, 0).unwrap();
        assert_eq!(
            local_date_of(instant, DEFAULT_TIMEZONE),
            NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()
        );
        assert_eq!(
            local_date_of(instant, chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2026, 1, 17).unwrap()
        );
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(
            parse_timezone("America/Argentina/Buenos_Aires").unwrap(),
            DEFAULT_TIMEZONE
        );
        assert!(parse_timezone("Mars/Olympus").is_err());
    }
}
