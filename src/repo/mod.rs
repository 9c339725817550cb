use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{CountrySummary, HistoricalRecord};

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::InMemoryHistorySource;
#[cfg(feature = "db")]
pub use pg::PgHistorySource;

/// Source of per-country yearly history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// All rows for an upper-case ISO3 code, ordered by year. Unknown codes yield an empty vec.
    async fn fetch_history(&self, iso3: &str) -> Result<Vec<HistoricalRecord>>;

    /// Known countries ordered by name
    async fn list_countries(&self) -> Result<Vec<CountrySummary>>;
}
