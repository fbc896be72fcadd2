//! 청크 단위 역방향 백필 엔진.
//!
//! 업스트림 일봉 API는 끝 타임스탬프와 일수로 창을 지정하므로,
//! 누락 구간의 끝에서 시작해 과거 방향으로 걸어 내려갑니다.
//! 짧은 청크, 창 경계의 중복 레코드, 중간 실패를 모두 허용합니다 —
//! 쓰기가 전부 `(symbol, date)` upsert라서 중복은 무해하고,
//! 부분 백필은 다음 실행의 갭 계산이 이어받습니다.

use chrono::{Duration, NaiveDate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crypto_core::{DailyCandle, GapInterval, MarketDataSource, MarketStore};

use crate::config::HistoryConfig;
use crate::Result;

/// UTC 자정 unix 타임스탬프.
fn midnight_ts(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp()
}

/// 누락 구간을 청크 단위로 내려받아 영속.
///
/// 저장된 레코드 수를 반환합니다. 종료 조건:
/// - 청크 조회 실패 또는 빈 응답
/// - 구간 클리핑 후 남은 레코드 없음
/// - 저장 수가 요청 일수보다 적음 (가용 역사의 시작에 도달한 신호)
/// - 가장 오래된 저장 날짜가 구간 하한에 도달
/// - 취소 신호
pub async fn backfill(
    source: &dyn MarketDataSource,
    store: &dyn MarketStore,
    symbol: &str,
    gap: GapInterval,
    config: &HistoryConfig,
    cancel: &CancellationToken,
) -> Result<usize> {
    let GapInterval::Missing { from: floor, to } = gap else {
        return Ok(0);
    };

    let mut cursor = to;
    let mut total_stored = 0usize;

    while cursor >= floor {
        if cancel.is_cancelled() {
            info!(symbol = symbol, "취소 신호 - 백필 중단");
            break;
        }

        let remaining_days = (cursor - floor).num_days() + 1;
        let limit = (config.days_per_chunk as i64).min(remaining_days) as u32;

        let Some(chunk) = source
            .daily_history(symbol, Some(midnight_ts(cursor)), limit)
            .await
        else {
            warn!(
                symbol = symbol,
                cursor = %cursor,
                "청크 조회 실패 - 중단 (다음 실행이 나머지를 이어받음)"
            );
            break;
        };

        if chunk.is_empty() {
            debug!(symbol = symbol, cursor = %cursor, "청크에 데이터 없음 - 중단");
            break;
        }

        // 업스트림이 창 바깥 날짜를 섞어 보내는 경우에 대한 방어적 클리핑
        let filtered: Vec<DailyCandle> = chunk
            .into_iter()
            .filter(|c| c.date >= floor && c.date <= to)
            .collect();

        if filtered.is_empty() {
            warn!(
                symbol = symbol,
                cursor = %cursor,
                "요청 구간에 해당하는 레코드 없음 - 중단"
            );
            break;
        }

        let stored = store.upsert_daily_history(symbol, &filtered).await?;
        total_stored += stored;

        let Some(oldest) = filtered.iter().map(|c| c.date).min() else {
            break;
        };

        debug!(
            symbol = symbol,
            stored = stored,
            requested = limit,
            oldest = %oldest,
            "청크 저장 완료"
        );

        // 요청보다 적게 저장됐으면 가용 역사의 시작에 도달했다는 뜻
        if stored < limit as usize || oldest <= floor {
            break;
        }

        cursor = oldest - Duration::days(1);
        tokio::time::sleep(config.chunk_delay()).await;
    }

    if total_stored > 0 {
        info!(symbol = symbol, total = total_stored, "백필 완료");
    }
    Ok(total_stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crypto_data::provider::MockMarketSource;
    use crypto_data::storage::MemoryStore;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cutoff() -> NaiveDate {
        d(2015, 1, 1)
    }

    fn candle(date: NaiveDate) -> DailyCandle {
        DailyCandle {
            date,
            open: Some(dec!(100)),
            high: Some(dec!(110)),
            low: Some(dec!(90)),
            close: Some(dec!(105)),
            volume_from: Some(dec!(10)),
            volume_to: Some(dec!(1000)),
        }
    }

    fn zero_candle(date: NaiveDate) -> DailyCandle {
        DailyCandle {
            date,
            open: Some(dec!(0)),
            high: Some(dec!(0)),
            low: Some(dec!(0)),
            close: Some(dec!(0)),
            volume_from: None,
            volume_to: None,
        }
    }

    fn series(from: NaiveDate, days: u32) -> Vec<DailyCandle> {
        (0..days)
            .map(|i| candle(from + Duration::days(i as i64)))
            .collect()
    }

    fn config(chunk: u32) -> HistoryConfig {
        HistoryConfig {
            start_date: d(2010, 1, 1),
            cutoff_date: cutoff(),
            days_per_chunk: chunk,
            chunk_delay_ms: 0,
        }
    }

    fn gap(from: NaiveDate, to: NaiveDate) -> GapInterval {
        GapInterval::Missing { from, to }
    }

    #[tokio::test]
    async fn test_ten_day_gap_chunk_five_takes_two_requests() {
        let source = MockMarketSource::new().with_history("BTC", series(d(2023, 12, 1), 60));
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 10);
        assert_eq!(store.history_len("BTC"), 10);

        // 청크 요청은 2024-01-10, 2024-01-05에 끝나는 두 번
        let calls = source.history_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].to_ts, Some(midnight_ts(d(2024, 1, 10))));
        assert_eq!(calls[0].limit, 5);
        assert_eq!(calls[1].to_ts, Some(midnight_ts(d(2024, 1, 5))));
        assert_eq!(calls[1].limit, 5);
    }

    #[tokio::test]
    async fn test_cooperative_upstream_takes_ceil_l_over_c_requests() {
        // L=10, C=4 → ceil(10/4)=3회 요청, 마지막 요청은 2일만
        let source = MockMarketSource::new().with_history("BTC", series(d(2023, 12, 1), 60));
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(4),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 10);
        let calls = source.history_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].limit, 2);
    }

    #[tokio::test]
    async fn test_single_chunk_covers_whole_gap() {
        let source = MockMarketSource::new().with_history("BTC", series(d(2023, 12, 1), 60));
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(1800),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 10);
        let calls = source.history_calls();
        assert_eq!(calls.len(), 1);
        // 구간보다 큰 청크는 남은 일수로 줄여서 요청
        assert_eq!(calls[0].limit, 10);
    }

    #[tokio::test]
    async fn test_upstream_failure_stops_without_error() {
        let source = MockMarketSource::new().with_failing_history("BTC");
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 0);
        assert_eq!(source.history_call_count(), 1);
        assert_eq!(store.history_len("BTC"), 0);
    }

    #[tokio::test]
    async fn test_stops_when_history_runs_out() {
        // 업스트림에는 2024-01-06부터만 데이터가 있음 — 두 번째 청크가
        // 빈 응답이 되면서 루프가 멈추고, 부분 백필로 남는다
        let source = MockMarketSource::new().with_history("BTC", series(d(2024, 1, 6), 5));
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 5);
        assert_eq!(source.history_call_count(), 2);
        assert_eq!(store.history_len("BTC"), 5);
        assert!(store.candle("BTC", d(2024, 1, 5)).is_none());
    }

    #[tokio::test]
    async fn test_clips_records_outside_requested_range() {
        // 구간 하한 이전 날짜가 섞인 청크 — 클리핑으로 걸러지고,
        // 저장 수가 요청보다 적어지면서 루프가 멈춘다
        let mut history = series(d(2023, 12, 28), 4);
        history.extend(series(d(2024, 1, 8), 3));
        let source = MockMarketSource::new().with_history("BTC", history);
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 3);
        assert_eq!(store.history_len("BTC"), 3);
        // 2024-01-01 이전 날짜는 절대 저장되지 않음
        assert!(store.candle("BTC", d(2023, 12, 31)).is_none());
        assert_eq!(source.history_call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_filled_rows_reduce_stored_count_and_stop() {
        // 2024-01-08이 0으로 채워진 날 — 저장에서 걸러져 stored < limit,
        // 가용 역사의 끝으로 판단하고 멈춘다
        let mut history = series(d(2023, 12, 1), 38);
        history.push(zero_candle(d(2024, 1, 8)));
        history.extend(series(d(2024, 1, 9), 2));
        let source = MockMarketSource::new().with_history("BTC", history);
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 4);
        assert_eq!(source.history_call_count(), 1);
        assert!(store.candle("BTC", d(2024, 1, 8)).is_none());
    }

    #[tokio::test]
    async fn test_backfill_is_idempotent() {
        let source = MockMarketSource::new().with_history("BTC", series(d(2023, 12, 1), 60));
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();
        let interval = gap(d(2024, 1, 1), d(2024, 1, 10));

        let first = backfill(&source, &store, "BTC", interval, &config(5), &cancel)
            .await
            .unwrap();
        let second = backfill(&source, &store, "BTC", interval, &config(5), &cancel)
            .await
            .unwrap();

        // 같은 구간을 두 번 돌려도 행 수는 그대로 (upsert 멱등성)
        assert_eq!(first, 10);
        assert_eq!(second, 10);
        assert_eq!(store.history_len("BTC"), 10);
    }

    #[tokio::test]
    async fn test_up_to_date_gap_is_a_noop() {
        let source = MockMarketSource::new();
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            GapInterval::UpToDate,
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 0);
        assert_eq!(source.history_call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_chunk() {
        let source = MockMarketSource::new().with_history("BTC", series(d(2023, 12, 1), 60));
        let store = MemoryStore::new(cutoff());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stored = backfill(
            &source,
            &store,
            "BTC",
            gap(d(2024, 1, 1), d(2024, 1, 10)),
            &config(5),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(stored, 0);
        assert_eq!(source.history_call_count(), 0);
    }
}
