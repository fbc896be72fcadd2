//! 도메인 모듈.

pub mod asset;
pub mod candle;
pub mod gap;
pub mod snapshot;
pub mod source;
pub mod store;

pub use asset::{ListedCoin, TrackedAsset};
pub use candle::DailyCandle;
pub use gap::GapInterval;
pub use snapshot::SnapshotQuote;
pub use source::MarketDataSource;
pub use store::{MarketStore, StoreError};
