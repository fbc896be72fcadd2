//! 일일 스냅샷 타입.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 심볼 하나의 현재 상태 스냅샷.
///
/// `(symbol, date)` 복합 키로 하루에 최대 한 건 저장됩니다.
/// 업스트림 응답에서 개별 필드가 빠질 수 있으므로 전부 nullable입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotQuote {
    pub last_price: Option<Decimal>,
    pub open_24h: Option<Decimal>,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub volume_24h_to: Option<Decimal>,
    pub change_pct_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub supply: Option<Decimal>,
}
