//! 일별 수치 저장소.
//!
//! 두 테이블에 날짜 키로 upsert합니다. 두 쓰기는 하나의 트랜잭션으로
//! 묶여 있어서 한쪽만 저장되는 일은 없습니다.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument};

use bcra_core::{
    BcraError, BcraResult, DatabaseConfig, InterventionRecord, ReserveRecord, TableTarget,
};

/// 일별 수치 저장소.
#[async_trait]
pub trait FigureStore: Send + Sync {
    /// 같은 날짜의 두 레코드를 저장합니다 (이미 있으면 값 교체).
    async fn save_daily(
        &self,
        reserve: &ReserveRecord,
        intervention: &InterventionRecord,
    ) -> BcraResult<()>;
}

/// 날짜 키 upsert SQL.
///
/// ```text
/// INSERT INTO "public"."reservas_scrape" ("date", "valor") VALUES ($1, $2)
/// ON CONFLICT ("date") DO UPDATE SET "valor" = EXCLUDED."valor"
/// ```
pub fn upsert_sql(target: &TableTarget) -> BcraResult<String> {
    target.validate()?;
    Ok(format!(
        "INSERT INTO {table} (\"{date}\", \"{value}\") VALUES ($1, $2) \
         ON CONFLICT (\"{date}\") DO UPDATE SET \"{value}\" = EXCLUDED.\"{value}\"",
        table = target.qualified_name(),
        date = target.date_column,
        value = target.value_column,
    ))
}

/// PostgreSQL 저장소.
///
/// 연결 풀은 `save_daily` 호출 동안만 유지됩니다.
pub struct PgFigureStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
    reserves: TableTarget,
    intervention: TableTarget,
}

impl PgFigureStore {
    /// 설정에서 저장소를 생성합니다. 테이블 식별자를 먼저 검증합니다.
    pub fn from_config(config: &DatabaseConfig) -> BcraResult<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password())
            .database(&config.database);

        Self::with_options(
            options,
            config.connect_timeout(),
            config.reserves.clone(),
            config.intervention.clone(),
        )
    }

    /// 연결 옵션을 직접 지정합니다.
    pub fn with_options(
        options: PgConnectOptions,
        connect_timeout: Duration,
        reserves: TableTarget,
        intervention: TableTarget,
    ) -> BcraResult<Self> {
        reserves.validate()?;
        intervention.validate()?;
        Ok(Self {
            options,
            connect_timeout,
            reserves,
            intervention,
        })
    }

    async fn connect(&self) -> BcraResult<PgPool> {
        PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect_with(self.options.clone())
            .await
            .map_err(|e| BcraError::Persistence(format!("DB 연결 실패: {}", e)))
    }

    async fn write(
        &self,
        pool: &PgPool,
        reserve: &ReserveRecord,
        intervention: &InterventionRecord,
    ) -> BcraResult<()> {
        let reserves_sql = upsert_sql(&self.reserves)?;
        let intervention_sql = upsert_sql(&self.intervention)?;

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| BcraError::Persistence(format!("트랜잭션 시작 실패: {}", e)))?;

        sqlx::query(&reserves_sql)
            .bind(reserve.date)
            .bind(reserve.value)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                BcraError::Persistence(format!(
                    "{} upsert 실패: {}",
                    self.reserves.qualified_name(),
                    e
                ))
            })?;

        sqlx::query(&intervention_sql)
            .bind(intervention.date)
            .bind(intervention.value)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                BcraError::Persistence(format!(
                    "{} upsert 실패: {}",
                    self.intervention.qualified_name(),
                    e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| BcraError::Persistence(format!("커밋 실패: {}", e)))
    }
}

#[async_trait]
impl FigureStore for PgFigureStore {
    #[instrument(skip(self, reserve, intervention), fields(date = %reserve.date))]
    async fn save_daily(
        &self,
        reserve: &ReserveRecord,
        intervention: &InterventionRecord,
    ) -> BcraResult<()> {
        if reserve.date != intervention.date {
            return Err(BcraError::Persistence(format!(
                "두 레코드의 날짜가 다릅니다: {} / {}",
                reserve.date, intervention.date
            )));
        }

        let pool = self.connect().await?;
        debug!("DB 연결 완료");

        // 실패해도 풀은 닫음 (트랜잭션은 drop 시 롤백)
        let result = self.write(&pool, reserve, intervention).await;
        pool.close().await;
        result?;

        info!(
            reserves = %reserve.value,
            intervention = %intervention.value,
            direction = ?intervention.direction(),
            "일별 수치 저장 완료"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_upsert_sql() {
        assert_eq!(
            upsert_sql(&TableTarget::default_intervention()).unwrap(),
            "INSERT INTO \"public\".\"comprasMULCBCRA\" (\"date\", \"comprasBCRA\") VALUES ($1, $2) \
             ON CONFLICT (\"date\") DO UPDATE SET \"comprasBCRA\" = EXCLUDED.\"comprasBCRA\""
        );
    }

    #[test]
    fn test_upsert_sql_rejects_bad_identifier() {
        let err = upsert_sql(&TableTarget::new("x; DROP", "valor")).unwrap_err();
        assert!(matches!(err, BcraError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_persistence_error() {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(9)
            .username("bcra")
            .database("bcra");
        let store = PgFigureStore::with_options(
            options,
            Duration::from_secs(2),
            TableTarget::default_reserves(),
            TableTarget::default_intervention(),
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let err = store
            .save_daily(
                &ReserveRecord { date, value: dec!(44808) },
                &InterventionRecord { date, value: dec!(2) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BcraError::Persistence(_)));
        assert!(err.is_critical());
    }

    /// `DATABASE_URL`이 가리키는 테스트 DB에 스키마를 만들고 upsert를 확인합니다.
    #[tokio::test]
    #[ignore] // PostgreSQL 필요
    async fn test_upsert_replaces_value() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL 필요");
        let options = PgConnectOptions::from_str(&url).unwrap();

        let pool = PgPool::connect_with(options.clone()).await.unwrap();
        sqlx::raw_sql(include_str!("../../../../migrations/0001_daily_figures.sql"))
            .execute(&pool)
            .await
            .unwrap();

        let store = PgFigureStore::with_options(
            options,
            Duration::from_secs(5),
            TableTarget::default_reserves(),
            TableTarget::default_intervention(),
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        for (reserves, intervention) in [(dec!(44808), dec!(2)), (dec!(44900), dec!(-35))] {
            store
                .save_daily(
                    &ReserveRecord { date, value: reserves },
                    &InterventionRecord { date, value: intervention },
                )
                .await
                .unwrap();
        }

        let rows: Vec<(NaiveDate, rust_decimal::Decimal)> =
            sqlx::query_as(r#"SELECT "date", "valor" FROM "public"."reservas_scrape" WHERE "date" = $1"#)
                .bind(date)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows, vec![(date, dec!(44900))]);

        let rows: Vec<(rust_decimal::Decimal,)> = sqlx::query_as(
            r#"SELECT "comprasBCRA" FROM "public"."comprasMULCBCRA" WHERE "date" = $1"#,
        )
        .bind(date)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows, vec![(dec!(-35),)]);

        pool.close().await;
    }
}
