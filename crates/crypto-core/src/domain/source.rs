//! 업스트림 시장 데이터 소스 추상화.
//!
//! 페이지네이션되는 상위 자산 목록, 일봉 역사, 현재 시세를 제공하는
//! 외부 API에 대한 소스 중립적인 인터페이스입니다.
//!
//! 모든 메서드는 실패를 `None`으로 보고합니다. 재시도는 구현체 내부에서
//! 소진되며, 데이터 부재는 호출자가 처리해야 할 정상적인 결과입니다
//! (백필 루프는 조기 종료, 스냅샷은 건너뛰기).

use async_trait::async_trait;

use super::{DailyCandle, ListedCoin, SnapshotQuote};

/// 업스트림 시장 데이터 소스.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 시가총액 상위 목록의 한 페이지 조회.
    ///
    /// 페이지는 0부터 시작하며 순위 순서를 유지합니다.
    /// 오류 페이지는 `None`, 성공했지만 항목이 없으면 빈 Vec.
    async fn top_assets_page(&self, page: u32, limit: u32) -> Option<Vec<ListedCoin>>;

    /// 일봉 역사 조회.
    ///
    /// `to_ts`(UTC unix 초, 자정)에 끝나는 `limit`일 창을 반환합니다.
    /// `to_ts`가 `None`이면 최신 데이터 기준.
    /// 반환 순서는 오래된 날짜 → 최신 날짜입니다.
    async fn daily_history(
        &self,
        symbol: &str,
        to_ts: Option<i64>,
        limit: u32,
    ) -> Option<Vec<DailyCandle>>;

    /// 현재 시세 스냅샷 조회.
    ///
    /// 기대 필드가 없거나 형식이 잘못된 응답은 `None`.
    async fn current_quote(&self, symbol: &str) -> Option<SnapshotQuote>;
}
