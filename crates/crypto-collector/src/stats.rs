//! 수집 통계 구조체.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 파이프라인 실행 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 처리 시도한 심볼 수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 역사가 이미 최신인 심볼 수
    pub up_to_date: usize,
    /// 백필이 실행된 심볼 수
    pub backfilled: usize,
    /// 저장된 총 일봉 수
    pub candles_saved: usize,
    /// 저장된 스냅샷 수
    pub snapshots_saved: usize,
    /// 이미 존재해서 건너뛴 스냅샷 수
    pub snapshots_skipped: usize,
    /// 시세를 얻지 못한 스냅샷 수
    pub snapshots_missing: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            up_to_date = self.up_to_date,
            backfilled = self.backfilled,
            candles_saved = self.candles_saved,
            snapshots_saved = self.snapshots_saved,
            snapshots_skipped = self.snapshots_skipped,
            snapshots_missing = self.snapshots_missing,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "실행 완료"
        );
    }
}
