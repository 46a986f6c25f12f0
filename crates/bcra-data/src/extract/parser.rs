//! OCR 텍스트에서 수치 추출.
//!
//! ## 라벨별 숫자 선택 순서
//! 1. 라벨과 같은 줄, 라벨 뒤의 숫자
//! 2. 라벨 바로 앞 줄에 홀로 있는 숫자 (이미지에서 수치가 라벨 위에 인쇄됨)
//! 3. 라벨 뒤 일정 범위 안의 첫 숫자
//!
//! 라벨과 숫자 사이에 다른 수치의 라벨이 있으면 그 숫자는 건너뜁니다.
//!
//! ## 외환 매입/매도 (먼저 일치하는 규칙 적용)
//! 1. `sin intervención` → 0
//! 2. `compra/venta` → 인쇄된 부호
//! 3. `venta` → 음수
//! 4. `compra` → 양수
//! 5. `intervención` / `mulc` → 인쇄된 부호
//!
//! 외환보유액으로 사용한 숫자는 다시 사용하지 않습니다.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::number::parse_es_number;
use bcra_core::{BcraError, BcraResult, DailyFigures, FigureField};

/// 기본 라벨 뒤 탐색 범위 (바이트)
pub const DEFAULT_WINDOW: usize = 80;

/// 숫자와 라벨 사이에 끼어드는 OCR 잡음 문자
const OCR_JUNK: &[char] = &[']', ')', '|', '"', '\'', '”', '“', '*', ':'];

static HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("static regex"));
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[-+] ?)?\d(?:[\d.,]*\d)?").expect("static regex"));
static RESERVES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\breservas?\b").expect("static regex"));

static DATE_DMY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4})\b").expect("static regex")
});
static DATE_YMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})\b").expect("static regex")
});
static DATE_ES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2})\s+de\s+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\s+(?:de|del)\s+(\d{4})\b",
    )
    .expect("static regex")
});

/// 매입/매도 금액의 부호 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignRule {
    /// 숫자 없이 0
    Zero,
    /// 인쇄된 부호 그대로
    AsPrinted,
    /// 항상 음수
    Negative,
    /// 항상 양수
    Positive,
}

static INTERVENTION_RULES: Lazy<Vec<(Regex, SignRule)>> = Lazy::new(|| {
    [
        (r"\bsin\s+intervenci[oó]n\b", SignRule::Zero),
        (r"\bcompras?\s*/\s*ventas?\b", SignRule::AsPrinted),
        (r"\bventas?\b", SignRule::Negative),
        (r"\bcompras?\b", SignRule::Positive),
        (r"\bintervenci[oó]n\b|\bmulc\b", SignRule::AsPrinted),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(pattern).expect("static regex"), rule))
    .collect()
});

/// OCR 텍스트를 정규화합니다.
///
/// 유니코드 마이너스(U+2212) → `-`, 연속 공백/탭 → 공백 하나, 소문자 변환.
/// 줄바꿈은 유지합니다.
pub fn normalize_text(raw: &str) -> String {
    let replaced = raw.replace('\u{2212}', "-");
    HSPACE.replace_all(&replaced, " ").to_lowercase()
}

/// 정규화된 텍스트 안의 숫자 토큰
#[derive(Debug, Clone, PartialEq, Eq)]
struct NumberToken {
    start: usize,
    end: usize,
    raw: String,
}

/// 날짜에 속한 범위
fn date_spans(text: &str) -> Vec<(usize, usize)> {
    [&*DATE_DMY, &*DATE_YMD, &*DATE_ES]
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.end())))
        .collect()
}

/// 숫자 토큰 목록. 백분율과 날짜 안의 숫자는 제외합니다.
fn number_tokens(text: &str) -> Vec<NumberToken> {
    let dates = date_spans(text);

    NUMBER
        .find_iter(text)
        .filter_map(|m| {
            let mut start = m.start();
            let mut raw = m.as_str();

            // 단어/숫자에 붙은 부호는 부호가 아님 (예: 2026-01)
            if raw.starts_with(['-', '+']) {
                let attached = text[..start]
                    .chars()
                    .next_back()
                    .map(|c| c.is_alphanumeric())
                    .unwrap_or(false);
                if attached {
                    let digits = raw[1..].trim_start();
                    start = m.end() - digits.len();
                    raw = digits;
                }
            }

            if text[m.end()..].trim_start().starts_with('%') {
                return None;
            }
            if dates.iter().any(|(ds, de)| start < *de && m.end() > *ds) {
                return None;
            }

            Some(NumberToken {
                start,
                end: m.end(),
                raw: raw.to_string(),
            })
        })
        .collect()
}

/// 이미지 수치 파서.
#[derive(Debug, Clone)]
pub struct FigureParser {
    window: usize,
}

impl Default for FigureParser {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl FigureParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 라벨 뒤 탐색 범위를 지정합니다.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// OCR 텍스트에서 두 수치와 인쇄 날짜를 추출합니다.
    ///
    /// 두 수치 중 하나라도 찾지 못하면 해당 필드의 `Parse` 에러를 반환합니다.
    pub fn parse(&self, raw: &str) -> BcraResult<DailyFigures> {
        let text = normalize_text(raw);
        let tokens = number_tokens(&text);

        let (reserves_musd, claimed) = self.reserves(&text, &tokens)?;
        let intervention_musd = self.intervention(&text, &tokens, claimed)?;

        Ok(DailyFigures {
            reserves_musd,
            intervention_musd,
            printed_date: printed_date(&text),
        })
    }

    /// 라벨 바로 앞 줄에 홀로 있는 토큰 (사이에 공백/OCR 잡음만 있어야 함)
    fn preceding<'a>(
        &self,
        text: &str,
        tokens: &'a [NumberToken],
        anchor_start: usize,
        claimed: Option<usize>,
    ) -> Option<(usize, &'a NumberToken)> {
        let (idx, token) = tokens
            .iter()
            .enumerate()
            .rev()
            .find(|(_, t)| t.end <= anchor_start)?;
        if Some(idx) == claimed {
            return None;
        }
        let gap = &text[token.end..anchor_start];
        let only_junk = |s: &str| s.chars().all(|c| c.is_whitespace() || OCR_JUNK.contains(&c));

        let (line_start, line_end) = line_bounds(text, token.start);
        let alone = only_junk(&text[line_start..token.start]) && only_junk(&text[token.end..line_end]);

        (only_junk(gap) && alone).then_some((idx, token))
    }

    /// 라벨 뒤 `limit` 이전에서 시작하는 첫 토큰.
    /// 라벨과 토큰 사이에 `barrier` 라벨이 있으면 제외합니다.
    fn following<'a>(
        &self,
        text: &str,
        tokens: &'a [NumberToken],
        anchor_end: usize,
        limit: usize,
        barrier: fn(&str) -> bool,
        claimed: Option<usize>,
    ) -> Option<(usize, &'a NumberToken)> {
        tokens
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != claimed)
            .filter(|(_, t)| t.start >= anchor_end && t.start < limit)
            .find(|(_, t)| !barrier(&text[anchor_end..t.start]))
    }

    /// 같은 줄 뒤 → 앞 줄 → 범위 안 순서로 라벨의 숫자를 찾습니다.
    /// `claimed` 토큰은 다른 수치가 이미 사용한 것이므로 건너뜁니다.
    fn locate<'a>(
        &self,
        text: &str,
        tokens: &'a [NumberToken],
        anchor: (usize, usize),
        barrier: fn(&str) -> bool,
        claimed: Option<usize>,
    ) -> Option<(usize, &'a NumberToken)> {
        let (anchor_start, anchor_end) = anchor;
        let (_, line_end) = line_bounds(text, anchor_end);
        let window_end = anchor_end + self.window;

        self.following(text, tokens, anchor_end, line_end, barrier, claimed)
            .or_else(|| self.preceding(text, tokens, anchor_start, claimed))
            .or_else(|| self.following(text, tokens, anchor_end, window_end, barrier, claimed))
    }

    /// 토큰 값 (뒤에 `mil millones`가 오면 ×1000)
    fn token_value(
        &self,
        text: &str,
        token: &NumberToken,
        field: FigureField,
    ) -> BcraResult<Decimal> {
        let value = parse_es_number(&token.raw)
            .map_err(|e| BcraError::parse(field, e.to_string()))?;
        if text[token.end..].trim_start().starts_with("mil millones") {
            Ok(value * Decimal::ONE_THOUSAND)
        } else {
            Ok(value)
        }
    }

    fn reserves(&self, text: &str, tokens: &[NumberToken]) -> BcraResult<(Decimal, usize)> {
        let field = FigureField::Reserves;
        let mut anchors = RESERVES.find_iter(text).peekable();
        if anchors.peek().is_none() {
            return Err(BcraError::parse(field, "'reservas' 라벨 없음"));
        }

        for anchor in anchors {
            let span = (anchor.start(), anchor.end());
            let found = self.locate(text, tokens, span, has_intervention_anchor, None);
            if let Some((idx, token)) = found {
                // 라벨 뒤 `-`는 구분자
                let value = self.token_value(text, token, field)?.abs();
                return Ok((value, idx));
            }
        }

        Err(BcraError::parse(field, "'reservas' 라벨 주변에 숫자 없음"))
    }

    fn intervention(
        &self,
        text: &str,
        tokens: &[NumberToken],
        claimed: usize,
    ) -> BcraResult<Decimal> {
        let field = FigureField::Intervention;

        let Some((anchor, rule)) = INTERVENTION_RULES
            .iter()
            .find_map(|(re, rule)| re.find(text).map(|m| (m, *rule)))
        else {
            return Err(BcraError::parse(
                field,
                "'compra'/'venta'/'intervención' 라벨 없음",
            ));
        };

        if rule == SignRule::Zero {
            return Ok(Decimal::ZERO);
        }

        let span = (anchor.start(), anchor.end());
        let (_, token) = self
            .locate(text, tokens, span, has_reserves_anchor, Some(claimed))
            .ok_or_else(|| {
                BcraError::parse(field, format!("'{}' 라벨 주변에 숫자 없음", anchor.as_str()))
            })?;

        let value = self.token_value(text, token, field)?;
        let signed = match rule {
            SignRule::Negative => -value.abs(),
            SignRule::Positive => value.abs(),
            SignRule::AsPrinted | SignRule::Zero => value,
        };

        Ok(if signed.is_zero() { Decimal::ZERO } else { signed })
    }
}

/// `pos`가 속한 줄의 범위 (줄바꿈 제외)
fn line_bounds(text: &str, pos: usize) -> (usize, usize) {
    let start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[pos..].find('\n').map(|i| pos + i).unwrap_or(text.len());
    (start, end)
}

fn has_intervention_anchor(segment: &str) -> bool {
    INTERVENTION_RULES.iter().any(|(re, _)| re.is_match(segment))
}

fn has_reserves_anchor(segment: &str) -> bool {
    RESERVES.is_match(segment)
}

fn spanish_month(name: &str) -> Option<u32> {
    let month = match name {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// 이미지에 인쇄된 날짜 (`dd/mm/yyyy`, `yyyy-mm-dd`, `19 de enero de 2026` 순서).
pub fn printed_date(text: &str) -> Option<NaiveDate> {
    let num = |s: &str| s.parse::<u32>().ok();

    let dmy = DATE_DMY.captures_iter(text).find_map(|c| {
        let year = c[3].parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, num(&c[2])?, num(&c[1])?)
    });
    let ymd = || {
        DATE_YMD.captures_iter(text).find_map(|c| {
            let year = c[1].parse::<i32>().ok()?;
            NaiveDate::from_ymd_opt(year, num(&c[2])?, num(&c[3])?)
        })
    };
    let spanish = || {
        DATE_ES.captures_iter(text).find_map(|c| {
            let year = c[3].parse::<i32>().ok()?;
            NaiveDate::from_ymd_opt(year, spanish_month(&c[2])?, num(&c[1])?)
        })
    };

    dmy.or_else(ymd).or_else(spanish)
}
