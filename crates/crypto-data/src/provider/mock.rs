//! 모의 시장 데이터 소스.
//!
//! 실제 업스트림 없이 발견/백필/스냅샷 로직을 검증하기 위한
//! 테스트 더블입니다. 일봉 창 의미론(끝 타임스탬프 기준 뒤로 `limit`일)을
//! 업스트림과 동일하게 흉내 내고, 호출 내역을 기록합니다.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crypto_core::{DailyCandle, ListedCoin, MarketDataSource, SnapshotQuote};

/// 일봉 조회 호출 기록.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCall {
    pub symbol: String,
    pub to_ts: Option<i64>,
    pub limit: u32,
}

/// 모의 데이터 소스.
#[derive(Default)]
pub struct MockMarketSource {
    /// 페이지별 상위 목록. `None` 페이지는 오류 페이지.
    pages: Vec<Option<Vec<ListedCoin>>>,
    /// 심볼별 전체 역사 (오래된 날짜 → 최신 날짜)
    history: HashMap<String, Vec<DailyCandle>>,
    /// 일봉 조회가 항상 실패하는 심볼
    failing_history: HashSet<String>,
    quotes: HashMap<String, SnapshotQuote>,
    history_calls: Mutex<Vec<HistoryCall>>,
    quote_calls: AtomicUsize,
    page_calls: AtomicUsize,
}

impl MockMarketSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 상위 목록 페이지 추가.
    pub fn with_listing_page(mut self, coins: Vec<ListedCoin>) -> Self {
        self.pages.push(Some(coins));
        self
    }

    /// 오류 페이지 추가.
    pub fn with_error_page(mut self) -> Self {
        self.pages.push(None);
        self
    }

    /// 심볼의 전체 역사 설정 (오래된 날짜 → 최신 날짜 정렬 필요).
    pub fn with_history(mut self, symbol: &str, candles: Vec<DailyCandle>) -> Self {
        self.history.insert(symbol.to_string(), candles);
        self
    }

    /// 일봉 조회가 실패하는 심볼 설정.
    pub fn with_failing_history(mut self, symbol: &str) -> Self {
        self.failing_history.insert(symbol.to_string());
        self
    }

    /// 심볼의 현재 시세 설정.
    pub fn with_quote(mut self, symbol: &str, quote: SnapshotQuote) -> Self {
        self.quotes.insert(symbol.to_string(), quote);
        self
    }

    /// 일봉 조회 호출 내역.
    pub fn history_calls(&self) -> Vec<HistoryCall> {
        self.history_calls
            .lock()
            .expect("호출 기록 잠금 실패")
            .clone()
    }

    pub fn history_call_count(&self) -> usize {
        self.history_calls
            .lock()
            .expect("호출 기록 잠금 실패")
            .len()
    }

    pub fn quote_call_count(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn page_call_count(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for MockMarketSource {
    async fn top_assets_page(&self, page: u32, _limit: u32) -> Option<Vec<ListedCoin>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(page as usize) {
            Some(Some(coins)) => Some(coins.clone()),
            // 오류 페이지
            Some(None) => None,
            // 설정된 페이지를 지나면 빈 페이지
            None => Some(Vec::new()),
        }
    }

    async fn daily_history(
        &self,
        symbol: &str,
        to_ts: Option<i64>,
        limit: u32,
    ) -> Option<Vec<DailyCandle>> {
        self.history_calls
            .lock()
            .expect("호출 기록 잠금 실패")
            .push(HistoryCall {
                symbol: symbol.to_string(),
                to_ts,
                limit,
            });

        if self.failing_history.contains(symbol) {
            return None;
        }

        let series = self.history.get(symbol)?;
        let cutoff = to_ts.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive());

        // 끝 타임스탬프 이하의 날짜 중 최신 limit개 (오래된 → 최신 순서 유지)
        let mut window: Vec<DailyCandle> = series
            .iter()
            .filter(|c| cutoff.map_or(true, |end| c.date <= end))
            .cloned()
            .collect();
        if window.len() > limit as usize {
            window = window.split_off(window.len() - limit as usize);
        }
        Some(window)
    }

    async fn current_quote(&self, symbol: &str) -> Option<SnapshotQuote> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.quotes.get(symbol).cloned()
    }
}
