//! DataBCRA collector CLI.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use bcra_collector::{CollectorConfig, Pipeline, RunReport, StoreMode};
use bcra_core::{
    init_logging, parse_target_date, today_in, BcraError, BcraResult, LogConfig, LogFormat,
};
use bcra_data::{
    ChromiumRenderer, FigureExtractor, ImageArchive, ImageSource, LocalImageSource,
    PgFigureStore, PostFetcher, TesseractOcr,
};

#[derive(Parser)]
#[command(name = "bcra-collector")]
#[command(about = "#DataBCRA 일별 수치 수집기", long_about = None)]
#[command(version)]
struct Cli {
    /// 대상 날짜 (YYYY-MM-DD, 기본: 설정된 시간대의 오늘)
    #[arg(long)]
    date: Option<String>,

    /// 게시물 탐색 대신 이 이미지 파일을 사용
    #[arg(long)]
    image: Option<PathBuf>,

    /// DB에 저장하지 않고 결과만 로그로 출력
    #[arg(long)]
    dry_run: bool,

    /// 로그 레벨 (trace, debug, info, warn, error) 또는 필터 지시어
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

async fn run(cli: Cli, mut config: CollectorConfig) -> BcraResult<RunReport> {
    let date = match cli.date.as_deref() {
        Some(raw) => parse_target_date(raw)?,
        None => today_in(config.fetcher.timezone),
    };
    tracing::info!(date = %date, dry_run = cli.dry_run, "대상 날짜");

    let source: Box<dyn ImageSource> = match cli.image {
        Some(path) => Box::new(LocalImageSource::new(path)),
        None => {
            let renderer =
                ChromiumRenderer::new(config.fetcher.browser.clone(), &config.fetcher.base_url);
            Box::new(PostFetcher::new(renderer, config.fetcher.clone()))
        }
    };

    let store = if cli.dry_run {
        StoreMode::DryRun
    } else {
        match config.take_database() {
            Ok(db) => {
                tracing::debug!(database = %db.redacted_url(), "DB 설정 로드 완료");
                StoreMode::Store(Box::new(PgFigureStore::from_config(&db)?))
            }
            Err(BcraError::Config(reason)) => StoreMode::Unconfigured(reason),
            Err(e) => return Err(e),
        }
    };

    let extractor = FigureExtractor::new(TesseractOcr::new(config.ocr.clone()), config.ocr.preprocess);
    let archive = config.image_dir.clone().map(ImageArchive::new);

    Pipeline::new(source, extractor, store)
        .with_archive(archive)
        .run(date)
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 로그 형식이 설정에 있으므로 설정을 먼저 로드
    let config = CollectorConfig::from_env();
    let log_format = match &config {
        Ok(config) => config.resolve_log_format(cli.log_format),
        Err(_) => cli.log_format.unwrap_or_default(),
    };
    if let Err(e) = init_logging(LogConfig::new(cli.log_level.clone()).with_format(log_format)) {
        eprintln!("로깅 초기화 실패: {}", e);
    }

    tracing::info!("DataBCRA Collector 시작");

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            report.log_summary();
            ExitCode::SUCCESS
        }
        Err(e) if e.is_benign() => {
            tracing::warn!(stage = %e.stage(), reason = %e, "저장할 데이터 없음, 정상 종료");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(
                stage = %e.stage(),
                critical = e.is_critical(),
                retryable = e.is_retryable(),
                exit_code = e.exit_code(),
                "수집 실패: {}",
                e
            );
            ExitCode::from(e.exit_code())
        }
    }
}
