//! 활성 피드 필터 모듈.
//!
//! 상장폐지되었거나 피드가 전부 0으로 채워진 심볼을 추적 대상에서
//! 제외합니다. 최근 이틀치 일봉을 조회해서 양수 가격이 하나라도 있으면
//! 활성으로 판정합니다.

use std::time::Duration;

use tracing::{debug, info};

use crypto_core::{MarketDataSource, TrackedAsset};

/// 활성 판정에 사용하는 최근 일봉 수.
const PROBE_DAYS: u32 = 2;

/// 심볼의 피드가 살아 있는지 확인.
///
/// 최근 2개 일봉 중 하나라도 `close > 0 || high > 0`이면 활성.
/// 조회 실패나 빈 응답은 비활성으로 취급합니다.
pub async fn is_live(source: &dyn MarketDataSource, symbol: &str) -> bool {
    match source.daily_history(symbol, None, PROBE_DAYS).await {
        Some(candles) if !candles.is_empty() => {
            candles.iter().any(|c| c.has_positive_price())
        }
        _ => false,
    }
}

/// 발견 순서대로 활성 심볼을 `target`개까지 선별.
///
/// 후보를 한 번에 하나씩 검사하고 목표에 도달하는 즉시 종료합니다.
/// 전수 필터가 아니라 조기 종료 선별이므로, 활성 후보가 목표보다 많으면
/// 발견 순서(시가총액 순위)가 어떤 심볼이 선택되는지를 결정합니다.
pub async fn select_live(
    source: &dyn MarketDataSource,
    candidates: Vec<TrackedAsset>,
    target: usize,
    probe_delay: Duration,
) -> Vec<TrackedAsset> {
    let mut selected: Vec<TrackedAsset> = Vec::with_capacity(target.min(candidates.len()));

    for asset in candidates {
        if is_live(source, &asset.symbol).await {
            selected.push(asset);
        } else {
            debug!(symbol = %asset.symbol, "비활성 피드 - 제외");
        }

        if selected.len() == target {
            break;
        }

        tokio::time::sleep(probe_delay).await;
    }

    info!(count = selected.len(), target = target, "활성 심볼 선별 완료");
    selected
}
