//! 영속성 계약 추상화.
//!
//! 관계형 저장소는 이 좁은 계약 뒤의 외부 협력자입니다.
//! `(symbol, date)` 고유 제약이 핵심 불변식입니다: 모든 쓰기가 upsert라서
//! 멱등이고, 재시도해도 안전합니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::{DailyCandle, SnapshotQuote, TrackedAsset};

/// 영속성 계층 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 연결 실패
    #[error("스토리지 연결 실패: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("스토리지 쿼리 실패: {0}")]
    Query(String),

    /// 스키마 초기화 실패
    #[error("스키마 초기화 실패: {0}")]
    Schema(String),
}

/// 영속성 계약.
///
/// 역사/스냅샷 테이블 모두 `(symbol, date)` 고유 키를 가지며,
/// 구현체는 같은 키에 대한 upsert를 행 단위 원자적으로 처리해야 합니다.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// 스키마가 없으면 생성.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// 코인 메타데이터 upsert. 기존 심볼은 건드리지 않습니다.
    async fn upsert_coins(&self, coins: &[TrackedAsset]) -> Result<(), StoreError>;

    /// 일봉 레코드 upsert.
    ///
    /// 레코드별 저장 제외 규칙(`DailyCandle::is_storable`)은 이 시점에
    /// 적용되며, 실제로 저장 대상이 된 레코드 수를 반환합니다.
    async fn upsert_daily_history(
        &self,
        symbol: &str,
        candles: &[DailyCandle],
    ) -> Result<usize, StoreError>;

    /// `(symbol, date)` 키로 스냅샷 한 건 upsert.
    async fn upsert_snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
        quote: &SnapshotQuote,
    ) -> Result<(), StoreError>;

    /// 심볼의 최신 역사 날짜 조회. 데이터가 없으면 `None`.
    async fn latest_history_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StoreError>;

    /// 해당 날짜의 스냅샷 존재 여부.
    async fn snapshot_exists(&self, symbol: &str, date: NaiveDate) -> Result<bool, StoreError>;

    /// 추적 중인 전체 심볼 목록 (심볼 순 정렬).
    async fn tracked_symbols(&self) -> Result<Vec<String>, StoreError>;
}
