//! 누락 구간 계산.

use chrono::{Duration, NaiveDate};

/// 심볼 하나의 역사 데이터 누락 구간.
///
/// 저장된 최신 날짜로부터 매 실행마다 새로 계산되는 파생 값이며,
/// 저장되지 않습니다. 크래시 후 재실행하면 실제로 영속된 데이터 기준으로
/// 다시 계산되므로 별도의 체크포인트가 필요 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapInterval {
    /// 어제까지 데이터가 모두 존재
    UpToDate,
    /// `[from, to]` 구간 누락 (양 끝 포함, `to`는 어제)
    Missing { from: NaiveDate, to: NaiveDate },
}

impl GapInterval {
    /// 저장된 최신 날짜로부터 누락 구간 계산.
    ///
    /// - `latest`가 없으면 전체 구간 `[history_start, yesterday]`
    /// - `latest >= yesterday`이면 누락 없음
    /// - 그 외에는 `[latest + 1일, yesterday]`
    ///
    /// `yesterday`는 실행당 한 번 UTC 기준으로 계산하여 전달합니다.
    /// 구간이 실행 도중 흔들리지 않아야 하기 때문입니다.
    pub fn compute(
        latest: Option<NaiveDate>,
        history_start: NaiveDate,
        yesterday: NaiveDate,
    ) -> Self {
        match latest {
            None => Self::Missing {
                from: history_start,
                to: yesterday,
            },
            Some(last) if last >= yesterday => Self::UpToDate,
            Some(last) => Self::Missing {
                from: last + Duration::days(1),
                to: yesterday,
            },
        }
    }

    /// 누락 구간 일수 (양 끝 포함). 누락이 없으면 0.
    pub fn day_count(&self) -> i64 {
        match self {
            Self::UpToDate => 0,
            Self::Missing { from, to } => (*to - *from).num_days() + 1,
        }
    }

    /// 누락 여부.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}
