//! 영속성 구현.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{connect_pool, PgMarketStore};
