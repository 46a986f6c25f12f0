//! 수집 파이프라인.
//!
//! 수집 → (보관) → 추출 → 저장 단계를 순서대로 실행합니다.
//! 어느 단계든 실패하면 즉시 중단하며, 두 수치가 모두 파싱되지 않으면
//! 아무것도 저장하지 않습니다.

use chrono::NaiveDate;
use std::time::Instant;
use tracing::{info, warn};

use crate::report::RunReport;
use bcra_core::{BcraError, BcraResult};
use bcra_data::{FigureExtractor, FigureStore, ImageArchive, ImageSource, OcrEngine};

/// 저장 단계 동작
pub enum StoreMode {
    /// 저장하지 않음 (`--dry-run`)
    DryRun,
    /// 저장소에 upsert
    Store(Box<dyn FigureStore>),
    /// 저장 설정 누락. 저장 단계에 도달하면 이 메시지로 `Config` 에러.
    Unconfigured(String),
}

/// 하루치 수집 파이프라인
pub struct Pipeline<O: OcrEngine> {
    source: Box<dyn ImageSource>,
    extractor: FigureExtractor<O>,
    store: StoreMode,
    archive: Option<ImageArchive>,
}

impl<O: OcrEngine> Pipeline<O> {
    pub fn new(source: Box<dyn ImageSource>, extractor: FigureExtractor<O>, store: StoreMode) -> Self {
        Self {
            source,
            extractor,
            store,
            archive: None,
        }
    }

    /// 원본 이미지 보관을 활성화합니다.
    pub fn with_archive(mut self, archive: Option<ImageArchive>) -> Self {
        self.archive = archive;
        self
    }

    /// 대상 날짜에 대해 파이프라인을 실행합니다.
    pub async fn run(&self, date: NaiveDate) -> BcraResult<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new(date);

        // 1. 수집
        info!(date = %date, source = self.source.name(), "Step 1/3: 이미지 수집");
        let image = self.source.fetch_image(date).await?;
        report.source = Some(image.source.clone());
        if let Some(post) = &image.post {
            report.status_id = Some(post.status_id.clone());
            report.view = Some(post.view.to_string());
        }

        if let Some(archive) = &self.archive {
            match archive
                .store(date, &image.bytes, image.content_type.as_deref())
                .await
            {
                Ok(path) => report.archived = Some(path),
                Err(e) => warn!(error = %e, "이미지 보관 실패 (계속 진행)"),
            }
        }

        // 2. 추출
        info!(bytes = image.bytes.len(), "Step 2/3: OCR 및 수치 추출");
        let extraction = self.extractor.extract(&image.bytes).await?;
        let figures = extraction.figures;
        report.reserves_musd = Some(figures.reserves_musd);
        report.intervention_musd = Some(figures.intervention_musd);
        report.printed_date = figures.printed_date;

        if report.printed_date_mismatch() {
            warn!(
                date = %date,
                printed_date = ?report.printed_date,
                "이미지에 인쇄된 날짜가 대상 날짜와 다릅니다 (대상 날짜로 저장)"
            );
        }

        // 3. 저장
        let (reserve, intervention) = figures.into_records(date);
        match &self.store {
            StoreMode::DryRun => {
                info!(
                    reserves = %reserve.value,
                    intervention = %intervention.value,
                    "Step 3/3: dry-run, 저장 생략"
                );
            }
            StoreMode::Store(store) => {
                info!("Step 3/3: DB 저장");
                store.save_daily(&reserve, &intervention).await?;
                report.persisted = true;
            }
            StoreMode::Unconfigured(reason) => {
                return Err(BcraError::Config(reason.clone()));
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}
