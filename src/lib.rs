//! IoT Catalog - In-memory Device and Service Registries
//!
//! Concurrency-safe catalogs that IoT middleware uses to register devices
//! (with their resources) and services, find them again by id or by path
//! query, list them page by page, and forget them once their TTL runs out.
//!
//! # Architecture
//!
//! ```text
//!   add / update / delete / get ──┐
//!   get_many / path_filter_* ─────┼──► Catalog Store ◄── Expiry Sweeper
//!                                 │     (RwLock)            (tokio task)
//!                                 │        │
//!                                 │        ├── Entry Index
//!                                 │        ├── Pagination Utility
//!                                 │        └── Path Query Evaluator
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Clock implementations for the domain ports
//! - [`catalog`] - Stores, index, paging, path queries, expiry sweeper
//! - [`config`] - Daemon configuration
//! - [`domain`] - Records and ports
//! - [`error`] - Error types

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use catalog::{DeviceStore, ServiceStore, StoreConfig, Sweeper};
pub use domain::{CatalogStorage, Clock, Device, Page, Resource, ResourceStorage, Service};
pub use error::{Error, Result};
