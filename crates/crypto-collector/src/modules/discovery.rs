//! 심볼 발견 모듈.
//!
//! 시가총액 상위 목록을 페이지 단위로 순회하면서 수용 필터를 통과한
//! 후보를 순위 순서 그대로 수집합니다. 빈 페이지나 오류 페이지를
//! 만나면 즉시 종료합니다.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crypto_core::{MarketDataSource, TrackedAsset};

use crate::config::DiscoveryConfig;

/// 상위 목록에서 후보 심볼 수집.
///
/// 종료 조건: 최대 페이지 도달, `max_candidates` 누적, 빈/오류 페이지.
/// 페이지 간에는 고정 지연을 넣어 rate limit을 존중합니다.
/// 페이지를 넘나드는 중복 심볼은 방어적으로 제거합니다 (첫 등장 우선).
pub async fn discover_candidates(
    source: &dyn MarketDataSource,
    config: &DiscoveryConfig,
) -> Vec<TrackedAsset> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<TrackedAsset> = Vec::new();

    for page in 0..config.max_pages {
        if candidates.len() >= config.max_candidates {
            break;
        }

        let Some(coins) = source.top_assets_page(page, config.page_limit).await else {
            warn!(page = page, "목록 페이지 오류 - 발견 중단");
            break;
        };
        if coins.is_empty() {
            debug!(page = page, "빈 페이지 - 발견 종료");
            break;
        }

        let page_count = coins.len();
        for coin in coins {
            if let Some(asset) = coin.into_tracked() {
                if seen.insert(asset.symbol.clone()) {
                    candidates.push(asset);
                }
            }
        }

        info!(
            page = page,
            page_count = page_count,
            total = candidates.len(),
            "목록 페이지 수집"
        );

        tokio::time::sleep(config.page_delay()).await;
    }

    info!(count = candidates.len(), "후보 심볼 수집 완료");
    candidates
}
