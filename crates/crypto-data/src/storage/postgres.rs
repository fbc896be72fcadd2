//! PostgreSQL 영속성 구현.
//!
//! `(symbol, date)` 고유 제약 + `ON CONFLICT` upsert로 모든 쓰기를
//! 멱등하게 만듭니다. 행 단위 쓰기는 원자적이므로 부분 적용이 없고,
//! 실패한 실행은 다음 실행의 갭 계산이 자연히 복구합니다.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crypto_core::{DailyCandle, MarketStore, SnapshotQuote, StoreError, TrackedAsset};

use crate::error::DataError;

/// 배치 upsert 크기. DB 왕복을 줄이기 위해 이 단위로 묶습니다.
const BATCH_SIZE: usize = 500;

/// 커넥션 풀 생성.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, DataError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| DataError::Connection(e.to_string()))
}

/// `MarketStore`의 PostgreSQL 구현.
#[derive(Clone)]
pub struct PgMarketStore {
    pool: PgPool,
    /// 이 날짜 이전의 역사 레코드는 저장하지 않음
    cutoff: NaiveDate,
}

impl PgMarketStore {
    /// 풀과 저장 컷오프 날짜로 스토어 생성.
    pub fn new(pool: PgPool, cutoff: NaiveDate) -> Self {
        Self { pool, cutoff }
    }

    /// 내부 풀 참조.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketStore for PgMarketStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coins (
                symbol    TEXT PRIMARY KEY,
                full_name TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Schema(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS historical_data (
                id          BIGSERIAL PRIMARY KEY,
                symbol      TEXT NOT NULL,
                date        DATE NOT NULL,
                open        NUMERIC,
                high        NUMERIC,
                low         NUMERIC,
                close       NUMERIC,
                volume_from NUMERIC,
                volume_to   NUMERIC,
                CONSTRAINT historical_symbol_date_unique UNIQUE (symbol, date),
                CONSTRAINT historical_symbol_fk FOREIGN KEY (symbol)
                    REFERENCES coins(symbol)
                    ON UPDATE CASCADE
                    ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Schema(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                id             BIGSERIAL PRIMARY KEY,
                symbol         TEXT NOT NULL,
                date           DATE NOT NULL,
                last_price     NUMERIC,
                open_24h       NUMERIC,
                high_24h       NUMERIC,
                low_24h        NUMERIC,
                volume_24h     NUMERIC,
                volume_24h_to  NUMERIC,
                change_pct_24h NUMERIC,
                market_cap     NUMERIC,
                supply         NUMERIC,
                CONSTRAINT snapshots_symbol_date_unique UNIQUE (symbol, date),
                CONSTRAINT snapshots_symbol_fk FOREIGN KEY (symbol)
                    REFERENCES coins(symbol)
                    ON UPDATE CASCADE
                    ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Schema(e.to_string()))?;

        info!("스키마 확인 완료");
        Ok(())
    }

    async fn upsert_coins(&self, coins: &[TrackedAsset]) -> Result<(), StoreError> {
        if coins.is_empty() {
            return Ok(());
        }

        for chunk in coins.chunks(BATCH_SIZE) {
            let mut query_builder =
                sqlx::QueryBuilder::new("INSERT INTO coins (symbol, full_name) ");

            query_builder.push_values(chunk, |mut b, coin| {
                b.push_bind(&coin.symbol).push_bind(&coin.display_name);
            });

            // 기존 메타데이터는 보존 — 발견 단계에서 한 번만 쓰는 테이블
            query_builder.push(" ON CONFLICT (symbol) DO NOTHING");

            query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;
        }

        info!(count = coins.len(), "코인 메타데이터 upsert 완료");
        Ok(())
    }

    async fn upsert_daily_history(
        &self,
        symbol: &str,
        candles: &[DailyCandle],
    ) -> Result<usize, StoreError> {
        let today = Utc::now().date_naive();
        let storable: Vec<&DailyCandle> = candles
            .iter()
            .filter(|c| c.is_storable(today, self.cutoff))
            .collect();

        if storable.is_empty() {
            return Ok(0);
        }

        for chunk in storable.chunks(BATCH_SIZE) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO historical_data \
                 (symbol, date, open, high, low, close, volume_from, volume_to) ",
            );

            query_builder.push_values(chunk, |mut b, candle| {
                b.push_bind(symbol)
                    .push_bind(candle.date)
                    .push_bind(candle.open)
                    .push_bind(candle.high)
                    .push_bind(candle.low)
                    .push_bind(candle.close)
                    .push_bind(candle.volume_from)
                    .push_bind(candle.volume_to);
            });

            query_builder.push(
                " ON CONFLICT (symbol, date) DO UPDATE SET \
                 open = EXCLUDED.open, \
                 high = EXCLUDED.high, \
                 low = EXCLUDED.low, \
                 close = EXCLUDED.close, \
                 volume_from = EXCLUDED.volume_from, \
                 volume_to = EXCLUDED.volume_to",
            );

            query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;
        }

        debug!(
            symbol = symbol,
            received = candles.len(),
            stored = storable.len(),
            "일봉 upsert 완료"
        );
        Ok(storable.len())
    }

    async fn upsert_snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
        quote: &SnapshotQuote,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO snapshots
                (symbol, date, last_price, open_24h, high_24h, low_24h,
                 volume_24h, volume_24h_to, change_pct_24h, market_cap, supply)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (symbol, date) DO UPDATE SET
                last_price     = EXCLUDED.last_price,
                open_24h       = EXCLUDED.open_24h,
                high_24h       = EXCLUDED.high_24h,
                low_24h        = EXCLUDED.low_24h,
                volume_24h     = EXCLUDED.volume_24h,
                volume_24h_to  = EXCLUDED.volume_24h_to,
                change_pct_24h = EXCLUDED.change_pct_24h,
                market_cap     = EXCLUDED.market_cap,
                supply         = EXCLUDED.supply
            "#,
        )
        .bind(symbol)
        .bind(date)
        .bind(quote.last_price)
        .bind(quote.open_24h)
        .bind(quote.high_24h)
        .bind(quote.low_24h)
        .bind(quote.volume_24h)
        .bind(quote.volume_24h_to)
        .bind(quote.change_pct_24h)
        .bind(quote.market_cap)
        .bind(quote.supply)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn latest_history_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StoreError> {
        sqlx::query_scalar("SELECT MAX(date) FROM historical_data WHERE symbol = $1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn snapshot_exists(&self, symbol: &str, date: NaiveDate) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM snapshots WHERE symbol = $1 AND date = $2)")
            .bind(symbol)
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn tracked_symbols(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT symbol FROM coins ORDER BY symbol")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}
