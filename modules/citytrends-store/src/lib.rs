pub mod error;
mod postgres;
mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use error::{Result, StoreError};
pub use postgres::PgTrendStore;
pub use traits::TrendStore;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
