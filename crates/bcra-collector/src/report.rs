//! 실행 결과 요약.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// 한 번의 실행 결과
#[derive(Debug, Clone)]
pub struct RunReport {
    /// 대상 날짜
    pub date: NaiveDate,
    /// 이미지 출처 (URL 또는 파일 경로)
    pub source: Option<String>,
    /// 게시물 ID
    pub status_id: Option<String>,
    /// 게시물을 찾은 화면
    pub view: Option<String>,
    /// 외환보유액 (백만 USD)
    pub reserves_musd: Option<Decimal>,
    /// 외환 매입/매도액 (백만 USD)
    pub intervention_musd: Option<Decimal>,
    /// 이미지에 인쇄된 날짜
    pub printed_date: Option<NaiveDate>,
    /// 보관된 이미지 경로
    pub archived: Option<PathBuf>,
    /// DB 저장 여부
    pub persisted: bool,
    /// 소요 시간
    pub elapsed: Duration,
}

impl RunReport {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            source: None,
            status_id: None,
            view: None,
            reserves_musd: None,
            intervention_musd: None,
            printed_date: None,
            archived: None,
            persisted: false,
            elapsed: Duration::ZERO,
        }
    }

    /// 인쇄된 날짜가 대상 날짜와 다른지
    pub fn printed_date_mismatch(&self) -> bool {
        self.printed_date.map(|d| d != self.date).unwrap_or(false)
    }

    /// 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            date = %self.date,
            source = self.source.as_deref().unwrap_or("-"),
            status_id = self.status_id.as_deref().unwrap_or("-"),
            view = self.view.as_deref().unwrap_or("-"),
            reserves = ?self.reserves_musd,
            intervention = ?self.intervention_musd,
            printed_date = ?self.printed_date,
            archived = ?self.archived,
            persisted = self.persisted,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printed_date_mismatch() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let mut report = RunReport::new(date);
        assert!(!report.printed_date_mismatch());

        report.printed_date = Some(date);
        assert!(!report.printed_date_mismatch());

        report.printed_date = NaiveDate::from_ymd_opt(2026, 1, 15);
        assert!(report.printed_date_mismatch());
    }
}
