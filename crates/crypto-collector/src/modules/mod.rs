//! 데이터 수집 모듈.

pub mod backfill;
pub mod discovery;
pub mod liveness;
pub mod pipeline;
pub mod progress;
pub mod snapshot;

pub use backfill::backfill;
pub use discovery::discover_candidates;
pub use liveness::{is_live, select_live};
pub use pipeline::run_pipeline;
pub use progress::ProgressTracker;
pub use snapshot::{capture_snapshot, SnapshotOutcome};
