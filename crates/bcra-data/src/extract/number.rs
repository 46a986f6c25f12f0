//! 스페인어권 숫자 표기 파서.
//!
//! 허용하는 형식은 다음 네 가지뿐이며, 나머지는 모두 에러입니다:
//!
//! | 입력 | 값 |
//! |---|---|
//! | `12345` | 12345 |
//! | `44.808` | 44808 (점 = 천 단위 구분, 3자리 그룹) |
//! | `1.716,5` | 1716.5 (점 천 단위 + 쉼표 소수점) |
//! | `120,5` | 120.5 (쉼표 소수점) |
//!
//! `1,716.5`(영어식), `38.50`(점 소수점), `1.2.3`은 거부합니다.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

static PLAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("static regex"));
static DOT_THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("static regex"));
static DOT_THOUSANDS_COMMA_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{3})+,\d+$").expect("static regex"));
static COMMA_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+,\d+$").expect("static regex"));

/// 숫자 형식 에러
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberFormatError {
    #[error("빈 숫자")]
    Empty,

    #[error("지원하지 않는 숫자 형식: {0:?}")]
    Unsupported(String),
}

/// 스페인어권 표기 숫자를 Decimal로 변환합니다.
///
/// 앞의 `-`/`+` 부호와 양쪽 공백은 허용합니다.
pub fn parse_es_number(raw: &str) -> Result<Decimal, NumberFormatError> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed).trim_start()),
    };
    if digits.is_empty() {
        return Err(NumberFormatError::Empty);
    }

    let canonical = if PLAIN.is_match(digits) {
        digits.to_string()
    } else if DOT_THOUSANDS.is_match(digits) {
        digits.replace('.', "")
    } else if DOT_THOUSANDS_COMMA_DECIMAL.is_match(digits) {
        digits.replace('.', "").replace(',', ".")
    } else if COMMA_DECIMAL.is_match(digits) {
        digits.replace(',', ".")
    } else {
        return Err(NumberFormatError::Unsupported(raw.trim().to_string()));
    };

    let value = Decimal::from_str(&canonical)
        .map_err(|_| NumberFormatError::Unsupported(raw.trim().to_string()))?;

    // -0은 0으로
    if negative && !value.is_zero() {
        Ok(-value)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_supported_formats() {
        assert_eq!(parse_es_number("12345"), Ok(dec!(12345)));
        assert_eq!(parse_es_number("44.808"), Ok(dec!(44808)));
        assert_eq!(parse_es_number("1.716,5"), Ok(dec!(1716.5)));
        assert_eq!(parse_es_number("120,5"), Ok(dec!(120.5)));
        assert_eq!(parse_es_number("1.234.567"), Ok(dec!(1234567)));
    }

    #[test]
    fn test_sign() {
        assert_eq!(parse_es_number("-120"), Ok(dec!(-120)));
        assert_eq!(parse_es_number("+50"), Ok(dec!(50)));
        assert_eq!(parse_es_number("- 1.716,5"), Ok(dec!(-1716.5)));
        let zero = parse_es_number("-0").unwrap();
        assert!(zero.is_zero());
        assert!(!zero.is_sign_negative());
    }

    #[test]
    fn test_rejects_other_locales() {
        assert!(matches!(
            parse_es_number("1,716.5"),
            Err(NumberFormatError::Unsupported(_))
        ));
        assert!(matches!(
            parse_es_number("38.50"),
            Err(NumberFormatError::Unsupported(_))
        ));
        assert!(matches!(
            parse_es_number("1.2.3"),
            Err(NumberFormatError::Unsupported(_))
        ));
        assert!(parse_es_number("12a").is_err());
        assert_eq!(parse_es_number(" - "), Err(NumberFormatError::Empty));
    }
}
