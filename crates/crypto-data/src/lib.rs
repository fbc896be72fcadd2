//! 업스트림 클라이언트와 영속성 구현.
//!
//! 이 crate는 다음을 제공합니다:
//! - 자격증명 로테이션이 포함된 CryptoCompare HTTP 클라이언트
//! - `MarketStore` 계약의 PostgreSQL 구현
//! - 테스트용 인메모리 스토어 및 모의 데이터 소스
//!
//! # 예제
//!
//! ```rust,ignore
//! use crypto_data::provider::{CryptoCompareClient, CryptoCompareConfig};
//! use crypto_data::storage::{connect_pool, PgMarketStore};
//!
//! let client = CryptoCompareClient::new(CryptoCompareConfig::default())?;
//! let pool = connect_pool(&database_url, 5).await?;
//! let store = PgMarketStore::new(pool, cutoff_date);
//! ```

pub mod error;
pub mod provider;
pub mod storage;

pub use error::DataError;
pub use provider::{CredentialRotator, CryptoCompareClient, CryptoCompareConfig};
pub use storage::{connect_pool, MemoryStore, PgMarketStore};
