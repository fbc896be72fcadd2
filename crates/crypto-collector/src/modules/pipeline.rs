//! 파이프라인 오케스트레이터.
//!
//! 실행 순서: 스키마 확인 → 추적 심볼 로드(없으면 발견 + 활성 필터로
//! 구축 후 1회 저장) → 심볼별로 갭 계산 → 백필 → 스냅샷.
//! 한 심볼의 실패는 격리되어 다음 심볼 처리에 영향을 주지 않으며,
//! 실행은 항상 완료되어 집계 통계를 보고합니다.

use std::time::Instant;

use chrono::{Duration, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crypto_core::{GapInterval, MarketDataSource, MarketStore};

use crate::config::CollectorConfig;
use crate::modules::{backfill, discovery, liveness, progress::ProgressTracker, snapshot};
use crate::{CollectionStats, Result};

/// 전체 수집 파이프라인 실행.
pub async fn run_pipeline(
    source: &dyn MarketDataSource,
    store: &dyn MarketStore,
    config: &CollectorConfig,
    cancel: &CancellationToken,
) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    store.ensure_schema().await?;

    let mut symbols = store.tracked_symbols().await?;
    if symbols.is_empty() {
        info!("추적 심볼 없음 - 발견 + 활성 필터로 추적 집합 구축");
        let candidates = discovery::discover_candidates(source, &config.discovery).await;
        let selected = liveness::select_live(
            source,
            candidates,
            config.discovery.target_symbols,
            config.discovery.probe_delay(),
        )
        .await;
        store.upsert_coins(&selected).await?;
        // 첫 실행은 순위 순서 그대로 처리
        symbols = selected.into_iter().map(|a| a.symbol).collect();
    } else {
        info!(count = symbols.len(), "기존 추적 심볼 사용 - 발견 건너뜀");
    }

    // 어제 날짜는 실행당 한 번만 계산 — 구간이 실행 도중 흔들리지 않도록
    let yesterday = Utc::now().date_naive() - Duration::days(1);

    let mut progress = ProgressTracker::new(symbols.len());
    for symbol in &symbols {
        if cancel.is_cancelled() {
            warn!("취소 신호 - 남은 심볼 처리 중단");
            break;
        }

        stats.total += 1;
        let symbol_start = Instant::now();

        match process_symbol(source, store, symbol, yesterday, config, cancel, &mut stats).await {
            Ok(()) => stats.success += 1,
            Err(e) => {
                stats.errors += 1;
                error!(symbol = %symbol, error = %e, "심볼 처리 실패 - 다음 심볼 계속");
            }
        }

        progress.record(symbol_start.elapsed());
        progress.log_progress(symbol);

        tokio::time::sleep(config.pipeline.symbol_delay()).await;
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 심볼 하나 처리: 갭 계산 → 백필 → 스냅샷.
async fn process_symbol(
    source: &dyn MarketDataSource,
    store: &dyn MarketStore,
    symbol: &str,
    yesterday: NaiveDate,
    config: &CollectorConfig,
    cancel: &CancellationToken,
    stats: &mut CollectionStats,
) -> Result<()> {
    let latest = store.latest_history_date(symbol).await?;
    let gap = GapInterval::compute(latest, config.history.start_date, yesterday);

    match gap {
        GapInterval::UpToDate => {
            stats.up_to_date += 1;
            debug!(symbol = symbol, "역사 최신 상태 - 백필 생략");
        }
        GapInterval::Missing { from, to } => {
            info!(
                symbol = symbol,
                from = %from,
                to = %to,
                days = gap.day_count(),
                "누락 구간 백필 시작"
            );
            let stored =
                backfill::backfill(source, store, symbol, gap, &config.history, cancel).await?;
            stats.backfilled += 1;
            stats.candles_saved += stored;
        }
    }

    match snapshot::capture_snapshot(source, store, symbol).await? {
        snapshot::SnapshotOutcome::Saved => stats.snapshots_saved += 1,
        snapshot::SnapshotOutcome::AlreadyExists => stats.snapshots_skipped += 1,
        snapshot::SnapshotOutcome::Unavailable => stats.snapshots_missing += 1,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, DaemonConfig, DiscoveryConfig, HistoryConfig, PipelineConfig};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use crypto_core::{DailyCandle, ListedCoin, SnapshotQuote, StoreError, TrackedAsset};
    use crypto_data::provider::MockMarketSource;
    use crypto_data::storage::MemoryStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn yesterday() -> NaiveDate {
        Utc::now().date_naive() - Duration::days(1)
    }

    fn test_config() -> CollectorConfig {
        CollectorConfig {
            database_url: String::new(),
            max_db_connections: 1,
            api: ApiConfig {
                base_url: String::new(),
                api_keys: Vec::new(),
                request_timeout_secs: 1,
                retry_count: 1,
                retry_delay_ms: 0,
            },
            discovery: DiscoveryConfig {
                page_limit: 100,
                max_pages: 15,
                page_delay_ms: 0,
                probe_delay_ms: 0,
                target_symbols: 2,
                max_candidates: 1500,
            },
            history: HistoryConfig {
                // 테스트 구간을 작게 유지
                start_date: yesterday() - Duration::days(4),
                cutoff_date: d(2015, 1, 1),
                days_per_chunk: 1800,
                chunk_delay_ms: 0,
            },
            pipeline: PipelineConfig { symbol_delay_ms: 0 },
            daemon: DaemonConfig {
                interval_minutes: 1440,
            },
        }
    }

    fn coin(symbol: &str, name: &str) -> ListedCoin {
        ListedCoin {
            symbol: symbol.to_string(),
            full_name: Some(name.to_string()),
        }
    }

    fn candle(date: NaiveDate, close: Decimal) -> DailyCandle {
        DailyCandle {
            date,
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume_from: Some(dec!(10)),
            volume_to: Some(dec!(1000)),
        }
    }

    /// 어제까지 days일치 + 확정 전인 오늘 캔들 하나.
    fn history_until_yesterday(days: i64) -> Vec<DailyCandle> {
        let mut series: Vec<DailyCandle> = (0..days)
            .map(|i| candle(yesterday() - Duration::days(days - 1 - i), dec!(100)))
            .collect();
        series.push(candle(Utc::now().date_naive(), dec!(101)));
        series
    }

    fn quote() -> SnapshotQuote {
        SnapshotQuote {
            last_price: Some(dec!(100)),
            ..Default::default()
        }
    }

    fn full_source() -> MockMarketSource {
        MockMarketSource::new()
            .with_listing_page(vec![
                coin("BTC", "Bitcoin"),
                coin("DEAD", "Dead Coin"),
                coin("ETH", "Ethereum"),
            ])
            .with_history("BTC", history_until_yesterday(5))
            .with_history("DEAD", vec![candle(yesterday(), Decimal::ZERO)])
            .with_history("ETH", history_until_yesterday(5))
            .with_quote("BTC", quote())
            .with_quote("ETH", quote())
    }

    #[tokio::test]
    async fn test_first_run_bootstraps_backfills_and_snapshots() {
        let source = full_source();
        let store = MemoryStore::new(d(2015, 1, 1));
        let cancel = CancellationToken::new();
        let config = test_config();

        let stats = run_pipeline(&source, &store, &config, &cancel).await.unwrap();

        // 발견 + 활성 필터: DEAD 제외, 목표 2개 달성
        assert_eq!(store.coin_len(), 2);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success, 2);
        assert_eq!(stats.backfilled, 2);
        // 심볼당 5일 구간 백필
        assert_eq!(stats.candles_saved, 10);
        assert_eq!(store.history_len("BTC"), 5);
        assert_eq!(store.history_len("ETH"), 5);
        // 확정 전인 오늘 캔들은 절대 저장되지 않음
        assert!(store.candle("BTC", Utc::now().date_naive()).is_none());
        // 스냅샷은 심볼당 하루 한 건
        assert_eq!(stats.snapshots_saved, 2);
        assert_eq!(store.snapshot_len("BTC"), 1);
        assert_eq!(store.snapshot_len("ETH"), 1);
    }

    #[tokio::test]
    async fn test_second_run_reuses_symbols_and_is_idempotent() {
        let source = full_source();
        let store = MemoryStore::new(d(2015, 1, 1));
        let cancel = CancellationToken::new();
        let config = test_config();

        run_pipeline(&source, &store, &config, &cancel).await.unwrap();
        let pages_after_first = source.page_call_count();

        let stats = run_pipeline(&source, &store, &config, &cancel).await.unwrap();

        // 두 번째 실행은 발견을 건너뛰고 저장된 심볼을 사용
        assert_eq!(source.page_call_count(), pages_after_first);
        // 역사는 이미 어제까지 차 있음 - 갭 없음
        assert_eq!(stats.up_to_date, 2);
        assert_eq!(stats.backfilled, 0);
        assert_eq!(stats.candles_saved, 0);
        // 스냅샷도 이미 존재 - 업스트림 호출 없이 건너뜀
        assert_eq!(stats.snapshots_skipped, 2);
        assert_eq!(source.quote_call_count(), 2);
        // 저장된 행 수는 그대로
        assert_eq!(store.history_len("BTC"), 5);
        assert_eq!(store.snapshot_len("BTC"), 1);
    }

    #[tokio::test]
    async fn test_partial_backfill_self_heals_on_next_run() {
        // 첫 실행에서 업스트림이 죽어 있던 심볼 — 다음 실행이
        // 저장된 상태 기준으로 갭을 다시 계산해서 이어받는다
        let store = MemoryStore::new(d(2015, 1, 1));
        store
            .upsert_coins(&[TrackedAsset {
                symbol: "BTC".to_string(),
                display_name: "Bitcoin".to_string(),
            }])
            .await
            .unwrap();

        let broken = MockMarketSource::new()
            .with_failing_history("BTC")
            .with_quote("BTC", quote());
        let cancel = CancellationToken::new();
        let config = test_config();

        let stats = run_pipeline(&broken, &store, &config, &cancel).await.unwrap();
        assert_eq!(stats.candles_saved, 0);
        assert_eq!(store.history_len("BTC"), 0);

        let healthy = MockMarketSource::new()
            .with_history("BTC", history_until_yesterday(5))
            .with_quote("BTC", quote());

        let stats = run_pipeline(&healthy, &store, &config, &cancel).await.unwrap();
        assert_eq!(stats.candles_saved, 5);
        assert_eq!(store.history_len("BTC"), 5);
    }

    /// 특정 심볼의 조회만 실패하는 스토어 래퍼.
    struct FaultyStore {
        inner: MemoryStore,
        poison_symbol: String,
    }

    #[async_trait]
    impl crypto_core::MarketStore for FaultyStore {
        async fn ensure_schema(&self) -> std::result::Result<(), StoreError> {
            self.inner.ensure_schema().await
        }

        async fn upsert_coins(
            &self,
            coins: &[TrackedAsset],
        ) -> std::result::Result<(), StoreError> {
            self.inner.upsert_coins(coins).await
        }

        async fn upsert_daily_history(
            &self,
            symbol: &str,
            candles: &[DailyCandle],
        ) -> std::result::Result<usize, StoreError> {
            self.inner.upsert_daily_history(symbol, candles).await
        }

        async fn upsert_snapshot(
            &self,
            symbol: &str,
            date: NaiveDate,
            quote: &SnapshotQuote,
        ) -> std::result::Result<(), StoreError> {
            self.inner.upsert_snapshot(symbol, date, quote).await
        }

        async fn latest_history_date(
            &self,
            symbol: &str,
        ) -> std::result::Result<Option<NaiveDate>, StoreError> {
            if symbol == self.poison_symbol {
                return Err(StoreError::Query("connection reset".to_string()));
            }
            self.inner.latest_history_date(symbol).await
        }

        async fn snapshot_exists(
            &self,
            symbol: &str,
            date: NaiveDate,
        ) -> std::result::Result<bool, StoreError> {
            self.inner.snapshot_exists(symbol, date).await
        }

        async fn tracked_symbols(&self) -> std::result::Result<Vec<String>, StoreError> {
            self.inner.tracked_symbols().await
        }
    }

    #[tokio::test]
    async fn test_symbol_failure_does_not_abort_run() {
        let store = FaultyStore {
            inner: MemoryStore::new(d(2015, 1, 1)),
            poison_symbol: "AAA".to_string(),
        };
        store
            .upsert_coins(&[
                TrackedAsset {
                    symbol: "AAA".to_string(),
                    display_name: "Broken".to_string(),
                },
                TrackedAsset {
                    symbol: "BTC".to_string(),
                    display_name: "Bitcoin".to_string(),
                },
            ])
            .await
            .unwrap();

        let source = MockMarketSource::new()
            .with_history("BTC", history_until_yesterday(5))
            .with_quote("BTC", quote());
        let cancel = CancellationToken::new();
        let config = test_config();

        let stats = run_pipeline(&source, &store, &config, &cancel).await.unwrap();

        // AAA는 실패, BTC는 정상 처리 — 실행은 끝까지 완료
        assert_eq!(stats.total, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.success, 1);
        assert_eq!(store.inner.history_len("BTC"), 5);
        assert_eq!(store.inner.snapshot_len("BTC"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_starts_no_symbol_work() {
        let store = MemoryStore::new(d(2015, 1, 1));
        store
            .upsert_coins(&[TrackedAsset {
                symbol: "BTC".to_string(),
                display_name: "Bitcoin".to_string(),
            }])
            .await
            .unwrap();

        let source = MockMarketSource::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = run_pipeline(&source, &store, &test_config(), &cancel)
            .await
            .unwrap();

        assert_eq!(stats.total, 0);
        assert_eq!(source.history_call_count(), 0);
        assert_eq!(source.quote_call_count(), 0);
    }
}
