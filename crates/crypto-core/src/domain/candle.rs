//! 일봉 캔들 타입.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 심볼 하나의 하루치 OHLCV 레코드.
///
/// `(symbol, date)`가 저장소의 복합 고유 키이며, 심볼은 레코드 외부에서
/// 관리합니다 (업스트림 응답에는 심볼이 포함되지 않음).
/// 모든 가격/거래량 필드는 업스트림이 생략할 수 있으므로 nullable입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCandle {
    /// UTC 기준 캔들 날짜
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    /// 기초 자산 단위 거래량
    pub volume_from: Option<Decimal>,
    /// 호가 통화 단위 거래량
    pub volume_to: Option<Decimal>,
}

impl DailyCandle {
    /// OHLC 중 하나라도 0이 아닌 값이 있는지 확인.
    ///
    /// 전부 0이거나 누락된 레코드는 업스트림이 거래 내역이 없는 날짜를
    /// 0으로 채워 보낸 것이므로 저장하지 않습니다.
    pub fn has_price_data(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .any(|v| v.map_or(false, |d| !d.is_zero()))
    }

    /// 종가 또는 고가가 양수인지 확인 (활성 피드 판정용).
    pub fn has_positive_price(&self) -> bool {
        [self.close, self.high]
            .iter()
            .any(|v| v.map_or(false, |d| d > Decimal::ZERO))
    }

    /// 영속 대상 여부 판정.
    ///
    /// 저장 제외 조건:
    /// - OHLC 전부 0/누락 (zero-filter)
    /// - `cutoff` 이전 날짜
    /// - `today`와 같은 날짜 — 당일 캔들은 업스트림에서 아직 확정 전
    pub fn is_storable(&self, today: NaiveDate, cutoff: NaiveDate) -> bool {
        self.date != today && self.date >= cutoff && self.has_price_data()
    }
}
