//! Domain Ports
//!
//! Trait abstractions the catalog engine is built around. Stores implement
//! the storage ports; the clock port is implemented by adapters so that the
//! engine never reads a global clock on its own.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Ports (Traits)                         │
//! │   Clock  │  CatalogStorage  │  ResourceStorage            │
//! └──────────────────────────────────────────────────────────┘
//!        │                │                    │
//!        ▼                ▼                    ▼
//!  SystemClock      ServiceStore          DeviceStore
//!  ManualClock      DeviceStore
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::CatalogMetrics;
use crate::domain::model::Resource;
use crate::error::Result;

// =============================================================================
// Value Objects
// =============================================================================

/// One page of a paginated listing or filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Entries on this page
    pub items: Vec<T>,
    /// Number of countable units across all pages
    pub total: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Clock Port
// =============================================================================

/// Source of wall-clock time used for TTL stamping and expiry sweeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// Storage Ports
// =============================================================================

/// CRUD, listing, filtering and expiry surface shared by every catalog store.
///
/// All methods are safe to call concurrently. Returned entries are owned
/// copies; mutating them never affects the store.
pub trait CatalogStorage: Send + Sync {
    /// Record type held by the store
    type Entry: Clone + Send;

    /// Store a new entry; stamps `created`, `updated` and `expires`.
    fn add(&self, entry: Self::Entry) -> Result<Self::Entry>;

    /// Replace the mutable fields of an existing entry; `created` is preserved.
    fn update(&self, id: &str, entry: Self::Entry) -> Result<Self::Entry>;

    /// Remove an entry, returning it as it was just before removal.
    fn delete(&self, id: &str) -> Result<Self::Entry>;

    fn get(&self, id: &str) -> Result<Self::Entry>;

    /// List one page of entries in index order.
    ///
    /// A page past the end is empty, not an error.
    fn get_many(&self, page: usize, per_page: usize) -> Result<Page<Self::Entry>>;

    /// First entry in index order whose `path` satisfies `op value`.
    fn path_filter_one(&self, path: &str, op: &str, value: &str) -> Result<Self::Entry>;

    /// One page of all entries whose `path` satisfies `op value`.
    fn path_filter_many(
        &self,
        path: &str,
        op: &str,
        value: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Self::Entry>>;

    /// Remove every expiring entry whose expiry is at or before `now`.
    ///
    /// Returns the number of entries removed.
    fn clean_expired(&self, now: DateTime<Utc>) -> usize;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operation counters of this store.
    fn metrics(&self) -> Arc<CatalogMetrics>;
}

/// Resource-scoped lookups offered by stores whose entries own resources.
pub trait ResourceStorage: CatalogStorage {
    fn get_resource(&self, id: &str) -> Result<Resource>;

    /// First resource in index order whose `path` satisfies `op value`.
    fn path_filter_resource_one(&self, path: &str, op: &str, value: &str) -> Result<Resource>;

    /// One page of all resources whose `path` satisfies `op value`.
    fn path_filter_resource_many(
        &self,
        path: &str,
        op: &str,
        value: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Resource>>;

    /// Number of stored resources across all entries.
    fn resource_count(&self) -> usize;
}
