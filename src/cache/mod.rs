// Content cache module
// Author: json2sheet contributors

pub mod clock;
pub mod fingerprint;
pub mod manager;
pub mod models;
pub mod provider;
pub mod sweeper;

pub use crate::config::CacheConfig;
pub use clock::{Clock, SystemClock};
pub use manager::CacheService;
pub use models::{CacheEntry, CacheExport, CacheStats, EntrySummary, ModelClass};
pub use provider::{CacheProvider, NullCacheProvider};
pub use sweeper::{ExpirySweeper, SweeperHandle};
