//! 일일 스냅샷 캡처 모듈.

use chrono::Utc;
use tracing::{debug, info};

use crypto_core::{MarketDataSource, MarketStore};

use crate::Result;

/// 스냅샷 캡처 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// 오늘 스냅샷이 이미 존재 — 업스트림 호출 없이 건너뜀
    AlreadyExists,
    /// 새 스냅샷 저장
    Saved,
    /// 시세를 얻지 못함 — 아무것도 쓰지 않음 (다음 실행에 재시도)
    Unavailable,
}

/// 심볼의 오늘자 스냅샷을 하루에 한 번 캡처.
///
/// 존재 확인을 먼저 하므로 같은 날 재호출은 업스트림 호출을 낭비하지
/// 않습니다. 시세가 없거나 형식이 잘못된 경우 행을 쓰지 않으므로
/// 다음 실행이 자연히 재시도하게 됩니다.
pub async fn capture_snapshot(
    source: &dyn MarketDataSource,
    store: &dyn MarketStore,
    symbol: &str,
) -> Result<SnapshotOutcome> {
    let today = Utc::now().date_naive();

    if store.snapshot_exists(symbol, today).await? {
        debug!(symbol = symbol, date = %today, "오늘 스냅샷 존재 - 건너뜀");
        return Ok(SnapshotOutcome::AlreadyExists);
    }

    let Some(quote) = source.current_quote(symbol).await else {
        info!(symbol = symbol, date = %today, "시세 없음 - 스냅샷 생략");
        return Ok(SnapshotOutcome::Unavailable);
    };

    store.upsert_snapshot(symbol, today, &quote).await?;
    debug!(symbol = symbol, date = %today, "스냅샷 저장 완료");
    Ok(SnapshotOutcome::Saved)
}
