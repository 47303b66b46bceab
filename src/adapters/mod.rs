//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports, following the
//! Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use iot_catalog::adapters::{ManualClock, SystemClock};
//! use iot_catalog::catalog::DeviceStore;
//!
//! // Production stores read the system clock
//! let store = DeviceStore::new(Arc::new(SystemClock::new()));
//!
//! // Tests drive time explicitly
//! let clock = Arc::new(ManualClock::default());
//! let store = DeviceStore::new(clock.clone());
//! clock.advance(chrono::Duration::seconds(60));
//! store.clean_expired(clock.now());
//! ```

mod clock;

pub use clock::{ManualClock, SystemClock};
