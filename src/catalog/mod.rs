//! Catalog Engine
//!
//! In-memory registries of devices and services with TTL expiry, ordered
//! listings, pagination and path queries.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                           Catalog Store                              │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  RwLock ─┬─ primary map (id → record)                                │
//! │          ├─ secondary map (resource id → resource)   [devices only]  │
//! │          └─ entry index (sorted keys)                                │
//! │                    │                     │                           │
//! │            Pagination Utility    Path Query Evaluator                │
//! └──────────────────────────────────────────────────────────────────────┘
//!              ▲
//!              │ clean_expired(now)
//!        Expiry Sweeper (tokio task, CancellationToken)
//! ```
//!
//! # Guarantees
//!
//! - Every returned record is an owned copy.
//! - Mutations and their index rebuild happen under a single write lock.
//! - Listings and filters enumerate in ascending key order.

mod device;
mod index;
mod metrics;
pub mod paging;
pub mod pathfilter;
mod service;
mod sweeper;

#[cfg(test)]
mod proptest;

use std::time::Duration;

pub use device::DeviceStore;
pub use index::EntryIndex;
pub use metrics::{CatalogMetrics, MetricsSnapshot};
pub use paging::{page_count, validate_paging_params, window_of};
pub use pathfilter::{FilterOp, PathQuery};
pub use service::ServiceStore;
pub use sweeper::Sweeper;

/// Upper bound on entries per page
pub const MAX_PER_PAGE: usize = 100;

/// Default period between expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Engine-level store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Largest page a listing or filter will return
    pub max_per_page: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_per_page: MAX_PER_PAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use crate::domain::{CatalogStorage, Service};
    use std::sync::Arc;

    #[test]
    fn test_store_config_caps_pages() {
        let clock = Arc::new(ManualClock::default());
        let store = ServiceStore::with_config(StoreConfig { max_per_page: 3 }, clock);
        for i in 0..10 {
            store.add(Service::new(format!("host/s{:02}", i), -1)).unwrap();
        }

        let page = store.get_many(1, 50).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page.total, 10);
        assert_eq!(store.get_many(4, 50).unwrap().len(), 1);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(StoreConfig::default().max_per_page, 100);
    }
}
