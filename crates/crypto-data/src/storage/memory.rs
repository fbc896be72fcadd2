//! 인메모리 `MarketStore` 구현.
//!
//! PostgreSQL 없이 파이프라인 로직을 검증하기 위한 테스트 더블입니다.
//! 레코드 제외 규칙과 `(symbol, date)` upsert 의미론은 실제 구현과
//! 동일하게 동작합니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crypto_core::{DailyCandle, MarketStore, SnapshotQuote, StoreError, TrackedAsset};

#[derive(Default)]
struct MemoryInner {
    coins: BTreeMap<String, String>,
    history: HashMap<String, BTreeMap<NaiveDate, DailyCandle>>,
    snapshots: HashMap<String, BTreeMap<NaiveDate, SnapshotQuote>>,
}

/// 인메모리 스토어.
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    cutoff: NaiveDate,
}

impl MemoryStore {
    /// 저장 컷오프 날짜로 스토어 생성.
    pub fn new(cutoff: NaiveDate) -> Self {
        Self {
            inner: Mutex::new(MemoryInner::default()),
            cutoff,
        }
    }

    /// 심볼의 저장된 일봉 수.
    pub fn history_len(&self, symbol: &str) -> usize {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        inner.history.get(symbol).map_or(0, |m| m.len())
    }

    /// 저장된 일봉 하나 조회.
    pub fn candle(&self, symbol: &str, date: NaiveDate) -> Option<DailyCandle> {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        inner.history.get(symbol).and_then(|m| m.get(&date)).cloned()
    }

    /// 심볼의 저장된 스냅샷 수.
    pub fn snapshot_len(&self, symbol: &str) -> usize {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        inner.snapshots.get(symbol).map_or(0, |m| m.len())
    }

    /// 등록된 코인 수.
    pub fn coin_len(&self) -> usize {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        inner.coins.len()
    }

    /// 기존 데이터 주입 (테스트 준비용). 제외 규칙을 적용하지 않습니다.
    pub fn seed_history(&self, symbol: &str, candles: Vec<DailyCandle>) {
        let mut inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        let series = inner.history.entry(symbol.to_string()).or_default();
        for candle in candles {
            series.insert(candle.date, candle);
        }
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_coins(&self, coins: &[TrackedAsset]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        for coin in coins {
            // ON CONFLICT DO NOTHING 의미론
            inner
                .coins
                .entry(coin.symbol.clone())
                .or_insert_with(|| coin.display_name.clone());
        }
        Ok(())
    }

    async fn upsert_daily_history(
        &self,
        symbol: &str,
        candles: &[DailyCandle],
    ) -> Result<usize, StoreError> {
        let today = Utc::now().date_naive();
        let mut inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        let series = inner.history.entry(symbol.to_string()).or_default();

        let mut stored = 0;
        for candle in candles {
            if !candle.is_storable(today, self.cutoff) {
                continue;
            }
            series.insert(candle.date, candle.clone());
            stored += 1;
        }
        Ok(stored)
    }

    async fn upsert_snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
        quote: &SnapshotQuote,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        inner
            .snapshots
            .entry(symbol.to_string())
            .or_default()
            .insert(date, quote.clone());
        Ok(())
    }

    async fn latest_history_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StoreError> {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        Ok(inner
            .history
            .get(symbol)
            .and_then(|m| m.last_key_value().map(|(date, _)| *date)))
    }

    async fn snapshot_exists(&self, symbol: &str, date: NaiveDate) -> Result<bool, StoreError> {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        Ok(inner
            .snapshots
            .get(symbol)
            .is_some_and(|m| m.contains_key(&date)))
    }

    async fn tracked_symbols(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().expect("메모리 스토어 잠금 실패");
        Ok(inner.coins.keys().cloned().collect())
    }
}
