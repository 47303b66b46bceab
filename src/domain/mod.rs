//! Domain Layer
//!
//! The catalog data model and the ports the engine is built around.
//!
//! - **Model** (`model.rs`) - Devices, resources, protocols and service registrations
//! - **Ports** (`ports.rs`) - Trait abstractions for clocks and catalog storage
//!
//! # Usage
//!
//! ```ignore
//! use iot_catalog::domain::{CatalogStorage, Device};
//!
//! fn register<S: CatalogStorage<Entry = Device>>(store: &S, device: Device) -> Result<Device> {
//!     match store.get(&device.id) {
//!         Ok(_) => store.update(&device.id.clone(), device),
//!         Err(e) if e.is_not_found() => store.add(device),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

pub mod model;
pub mod ports;

pub use model::{
    expiry_for, is_expired, validate_record_id, validate_resource_id, Device, Meta, Protocol,
    Resource, Service,
};
pub use ports::{CatalogStorage, Clock, Page, ResourceStorage};
