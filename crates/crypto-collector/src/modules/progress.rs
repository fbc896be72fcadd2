//! 진행률 및 ETA 트래커.

use std::time::{Duration, Instant};

/// 심볼 처리 진행률을 추적하고 주기적으로 로그를 출력.
///
/// 최근 처리 시간의 이동 평균으로 남은 시간을 추정합니다.
pub struct ProgressTracker {
    overall_start: Instant,
    recent_durations: Vec<Duration>,
    window_size: usize,
    last_log_time: Instant,
    completed: usize,
    total: usize,
}

impl ProgressTracker {
    /// 총 심볼 수로 트래커 생성.
    pub fn new(total: usize) -> Self {
        let now = Instant::now();
        Self {
            overall_start: now,
            recent_durations: Vec::with_capacity(50),
            window_size: 50,
            last_log_time: now,
            completed: 0,
            total,
        }
    }

    /// 완료된 심볼 기록 및 이동 평균 업데이트.
    pub fn record(&mut self, duration: Duration) {
        self.completed += 1;
        if self.recent_durations.len() >= self.window_size {
            self.recent_durations.remove(0);
        }
        self.recent_durations.push(duration);
    }

    /// 이동 평균 기반 남은 시간 추정.
    fn estimated_remaining(&self) -> Option<Duration> {
        if self.recent_durations.is_empty() || self.completed == 0 {
            return None;
        }
        let avg: Duration =
            self.recent_durations.iter().sum::<Duration>() / self.recent_durations.len() as u32;
        let remaining = self.total.saturating_sub(self.completed);
        Some(avg * remaining as u32)
    }

    /// 10개마다, 마지막 심볼에서, 또는 1분마다 로그를 출력할지 결정.
    fn should_log(&self) -> bool {
        self.completed % 10 == 0
            || self.completed == self.total
            || self.last_log_time.elapsed() >= Duration::from_secs(60)
    }

    /// 진행률 로그 출력.
    pub fn log_progress(&mut self, symbol: &str) {
        if !self.should_log() {
            return;
        }
        self.last_log_time = Instant::now();

        let percent = if self.total > 0 {
            (self.completed * 100) / self.total
        } else {
            0
        };
        let eta_str = self
            .estimated_remaining()
            .map(format_duration)
            .unwrap_or_else(|| "계산 중".to_string());

        tracing::info!(
            "[{}/{}] ({}%) | ETA: {} | 경과: {} | 현재: {}",
            self.completed,
            self.total,
            percent,
            eta_str,
            format_duration(self.overall_start.elapsed()),
            symbol,
        );
    }
}

/// Duration을 사람이 읽기 쉬운 문자열로 변환.
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
