//! Device Catalog Store
//!
//! Devices own resources. Internally the two live in separate maps:
//!
//! ```text
//!   devices:   abc/dev1 ──► { device fields, resource_ids: [abc/dev1/a, abc/dev1/b] }
//!   resources: abc/dev1/a ──► Resource { device: abc/dev1, .. }
//!              abc/dev1/b ──► Resource { device: abc/dev1, .. }
//!
//!   index:     [abc/dev1, abc/dev2, ...]                   sorted device ids
//!   units:     [abc/dev1/a, abc/dev1/b, abc/dev2, ...]     sorted paging units
//! ```
//!
//! A paging unit is either a resource id or the id of a device without
//! resources. Because resource ids are prefixed by their device id, the units
//! of one device are contiguous in `units`, and a page of units maps back onto
//! a run of devices, each carrying only the resources that fell on the page.
//!
//! Everything above sits behind one `RwLock`, so readers never observe a
//! device whose resource map entries are half written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::index::EntryIndex;
use super::metrics::CatalogMetrics;
use super::paging::window_of;
use super::pathfilter::PathQuery;
use super::StoreConfig;
use crate::domain::model::{expiry_for, validate_record_id, validate_resource_id, Device, Resource};
use crate::domain::ports::{CatalogStorage, Clock, Page, ResourceStorage};
use crate::error::{Error, Result};

/// Device as held in the primary map; its resources live in the secondary map.
#[derive(Debug, Clone)]
struct StoredDevice {
    device: Device,
    resource_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct DeviceTables {
    devices: HashMap<String, StoredDevice>,
    resources: HashMap<String, Resource>,
    index: EntryIndex,
    units: EntryIndex,
}

impl DeviceTables {
    fn reindex(&mut self) {
        self.index.rebuild(self.devices.keys());

        let bare = self
            .devices
            .iter()
            .filter(|(_, stored)| stored.resource_ids.is_empty())
            .map(|(id, _)| id);
        self.units.rebuild(self.resources.keys().chain(bare));
    }

    fn check_resources(&self, owner: &str, resources: &[Resource]) -> Result<()> {
        let mut seen = HashSet::with_capacity(resources.len());
        for res in resources {
            validate_resource_id(&res.id, owner)?;
            if !seen.insert(res.id.as_str()) {
                return Err(Error::Validation(format!(
                    "resource {} is listed twice by device {}",
                    res.id, owner
                )));
            }
            if let Some(existing) = self.resources.get(&res.id) {
                if existing.device != owner {
                    return Err(Error::Validation(format!(
                        "resource {} already belongs to device {}",
                        res.id, existing.device
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut device: Device) {
        let resources = std::mem::take(&mut device.resources);
        let resource_ids = resources.iter().map(|r| r.id.clone()).collect();
        for res in resources {
            self.resources.insert(res.id.clone(), res);
        }
        self.devices.insert(
            device.id.clone(),
            StoredDevice {
                device,
                resource_ids,
            },
        );
    }

    /// Remove a device and its resources; indexes are left stale.
    fn remove(&mut self, id: &str) -> Option<Device> {
        let stored = self.devices.remove(id)?;
        let mut device = stored.device;
        for rid in &stored.resource_ids {
            if let Some(res) = self.resources.remove(rid) {
                device.resources.push(res);
            }
        }
        Some(device)
    }

    /// Rejoin a stored device with all of its resources.
    fn assemble(&self, id: &str) -> Result<Device> {
        let stored = self.devices.get(id).ok_or_else(|| Error::not_found(id))?;
        let mut device = stored.device.clone();
        device.resources = stored
            .resource_ids
            .iter()
            .map(|rid| {
                self.resources.get(rid).cloned().ok_or_else(|| {
                    Error::Consistency(format!("device {} lists missing resource {}", id, rid))
                })
            })
            .collect::<Result<_>>()?;
        Ok(device)
    }

    /// Group `(owner, resource)` pairs into owner devices, in order of first appearance.
    ///
    /// Each device carries only the resources given for it; a `None` resource
    /// just makes sure the owner appears.
    fn reconcile<I>(&self, units: I) -> Result<Vec<Device>>
    where
        I: IntoIterator<Item = (String, Option<Resource>)>,
    {
        let mut devices: Vec<Device> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for (owner, resource) in units {
            let slot = match slots.get(&owner) {
                Some(&slot) => slot,
                None => {
                    let stored = self.devices.get(&owner).ok_or_else(|| {
                        Error::Consistency(format!("owner device {} is not stored", owner))
                    })?;
                    let mut device = stored.device.clone();
                    device.resources.clear();
                    devices.push(device);
                    slots.insert(owner, devices.len() - 1);
                    devices.len() - 1
                }
            };
            if let Some(res) = resource {
                devices[slot].resources.push(res);
            }
        }
        Ok(devices)
    }

    /// Turn a window of paging units back into devices.
    fn devices_from_units(&self, keys: &[String]) -> Result<Vec<Device>> {
        let units = keys
            .iter()
            .map(|key| {
                if let Some(res) = self.resources.get(key) {
                    Ok((res.device.clone(), Some(res.clone())))
                } else if self.devices.contains_key(key) {
                    Ok((key.clone(), None))
                } else {
                    Err(Error::Consistency(format!(
                        "paging unit {} is neither a device nor a resource",
                        key
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        self.reconcile(units)
    }

    /// Paging units of an assembled device, in index order.
    fn units_of(device: &Device) -> Vec<String> {
        if device.resources.is_empty() {
            return vec![device.id.clone()];
        }
        let mut ids: Vec<String> = device.resources.iter().map(|r| r.id.clone()).collect();
        ids.sort_unstable();
        ids
    }
}

/// In-memory device catalog
pub struct DeviceStore {
    tables: RwLock<DeviceTables>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    metrics: Arc<CatalogMetrics>,
}

impl DeviceStore {
    /// Create a store with the default configuration
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(StoreConfig::default(), clock)
    }

    /// Create a store with a custom configuration
    pub fn with_config(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(DeviceTables::default()),
            clock,
            config,
            metrics: Arc::new(CatalogMetrics::new()),
        }
    }

    /// Reassemble `resources` into their owning devices.
    ///
    /// Owners are looked up from the stored resource with the same id, so the
    /// `device` field of the input is ignored. Owners appear in order of first
    /// appearance in the input, and each one carries only the resources from
    /// the input that belong to it. Fails with not found for a resource id
    /// that is not stored.
    pub fn devices_from_resources(&self, resources: &[Resource]) -> Result<Vec<Device>> {
        let tables = self.tables.read();
        let units = resources
            .iter()
            .map(|res| {
                let stored = tables
                    .resources
                    .get(&res.id)
                    .ok_or_else(|| Error::not_found(&res.id))?;
                let mut res = res.clone();
                res.device = stored.device.clone();
                Ok((stored.device.clone(), Some(res)))
            })
            .collect::<Result<Vec<_>>>()?;
        self.observe(tables.reconcile(units))
    }

    fn reject<T>(&self, err: Error) -> Result<T> {
        self.metrics.record_rejected();
        Err(err)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::Consistency(reason)) = &result {
            self.metrics.record_consistency_error();
            error!(reason = %reason, "Device catalog invariant violated");
        }
        result
    }

    /// Assembled devices in index order; inconsistent devices are logged and skipped.
    fn for_each_device<F>(&self, tables: &DeviceTables, mut f: F) -> Result<bool>
    where
        F: FnMut(Device) -> Result<bool>,
    {
        for id in tables.index.iter() {
            let device = match self.observe(tables.assemble(id)) {
                Ok(device) => device,
                Err(_) => continue,
            };
            if !f(device)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for DeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("DeviceStore")
            .field("devices", &tables.devices.len())
            .field("resources", &tables.resources.len())
            .field("config", &self.config)
            .finish()
    }
}

impl CatalogStorage for DeviceStore {
    type Entry = Device;

    fn add(&self, mut device: Device) -> Result<Device> {
        if let Err(e) = validate_record_id(&device.id) {
            return self.reject(e);
        }

        let now = self.clock.now();
        let expires = match expiry_for(now, device.ttl) {
            Ok(expires) => expires,
            Err(e) => return self.reject(e),
        };
        device.created = now;
        device.updated = now;
        device.expires = expires;
        for res in &mut device.resources {
            res.device = device.id.clone();
        }

        let mut tables = self.tables.write();
        if tables.devices.contains_key(&device.id) {
            return self.reject(Error::Validation(format!(
                "device {} already exists",
                device.id
            )));
        }
        if let Err(e) = tables.check_resources(&device.id, &device.resources) {
            return self.reject(e);
        }
        tables.insert(device.clone());
        tables.reindex();
        drop(tables);

        self.metrics.record_add();
        debug!(
            id = %device.id,
            resources = device.resources.len(),
            ttl = device.ttl,
            "Added device"
        );
        Ok(device)
    }

    fn update(&self, id: &str, device: Device) -> Result<Device> {
        let now = self.clock.now();
        let expires = match expiry_for(now, device.ttl) {
            Ok(expires) => expires,
            Err(e) => return self.reject(e),
        };
        let mut resources = device.resources;
        for res in &mut resources {
            res.device = id.to_string();
        }

        let mut tables = self.tables.write();
        let Some(created) = tables.devices.get(id).map(|s| s.device.created) else {
            self.metrics.record_lookup(false);
            return Err(Error::not_found(id));
        };
        if let Err(e) = tables.check_resources(id, &resources) {
            return self.reject(e);
        }

        let updated = Device {
            id: id.to_string(),
            device_type: device.device_type,
            name: device.name,
            meta: device.meta,
            description: device.description,
            ttl: device.ttl,
            created,
            updated: now,
            expires,
            resources,
        };
        tables.remove(id);
        tables.insert(updated.clone());
        tables.reindex();
        drop(tables);

        self.metrics.record_update();
        debug!(
            id = %id,
            resources = updated.resources.len(),
            ttl = updated.ttl,
            "Updated device"
        );
        Ok(updated)
    }

    fn delete(&self, id: &str) -> Result<Device> {
        let mut tables = self.tables.write();
        let Some(removed) = tables.remove(id) else {
            self.metrics.record_lookup(false);
            return Err(Error::not_found(id));
        };
        tables.reindex();
        drop(tables);

        self.metrics.record_delete();
        debug!(id = %id, resources = removed.resources.len(), "Deleted device");
        Ok(removed)
    }

    fn get(&self, id: &str) -> Result<Device> {
        let result = self.tables.read().assemble(id);
        self.metrics.record_lookup(result.is_ok());
        self.observe(result)
    }

    fn get_many(&self, page: usize, per_page: usize) -> Result<Page<Device>> {
        self.metrics.record_listing();
        let tables = self.tables.read();
        let keys = window_of(tables.units.keys(), page, per_page, self.config.max_per_page);
        let devices = self.observe(tables.devices_from_units(keys))?;
        Ok(Page::new(devices, tables.units.len()))
    }

    fn path_filter_one(&self, path: &str, op: &str, value: &str) -> Result<Device> {
        let query = PathQuery::parse(path, op, value)?;
        self.metrics.record_filter_query();

        let tables = self.tables.read();
        let mut found = None;
        self.for_each_device(&tables, |device| {
            if query.matches(&device)? {
                found = Some(device);
                return Ok(false);
            }
            Ok(true)
        })?;

        found.ok_or_else(|| {
            Error::NotFound(format!("no device matches {} {} {:?}", path, op, value))
        })
    }

    fn path_filter_many(
        &self,
        path: &str,
        op: &str,
        value: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Device>> {
        let query = PathQuery::parse(path, op, value)?;
        self.metrics.record_filter_query();

        let tables = self.tables.read();
        let mut matched = Vec::new();
        self.for_each_device(&tables, |device| {
            if query.matches(&device)? {
                matched.extend(DeviceTables::units_of(&device));
            }
            Ok(true)
        })?;

        let keys = window_of(&matched, page, per_page, self.config.max_per_page);
        let devices = self.observe(tables.devices_from_units(keys))?;
        Ok(Page::new(devices, matched.len()))
    }

    fn clean_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write();
        let expired: Vec<String> = tables
            .devices
            .values()
            .filter(|s| s.device.is_expired(now))
            .map(|s| s.device.id.clone())
            .collect();
        if expired.is_empty() {
            return 0;
        }

        for id in &expired {
            if let Some(device) = tables.remove(id) {
                warn!(
                    id = %id,
                    resources = device.resources.len(),
                    "Device registration has expired"
                );
            }
        }
        tables.reindex();
        drop(tables);

        self.metrics.record_expired(expired.len() as u64);
        info!(removed = expired.len(), "Removed expired devices");
        expired.len()
    }

    fn len(&self) -> usize {
        self.tables.read().devices.len()
    }

    fn metrics(&self) -> Arc<CatalogMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl ResourceStorage for DeviceStore {
    fn get_resource(&self, id: &str) -> Result<Resource> {
        let found = self.tables.read().resources.get(id).cloned();
        self.metrics.record_lookup(found.is_some());
        found.ok_or_else(|| Error::not_found(id))
    }

    fn path_filter_resource_one(&self, path: &str, op: &str, value: &str) -> Result<Resource> {
        let query = PathQuery::parse(path, op, value)?;
        self.metrics.record_filter_query();

        let tables = self.tables.read();
        for key in tables.units.iter() {
            let Some(res) = tables.resources.get(key) else {
                continue;
            };
            if query.matches(res)? {
                return Ok(res.clone());
            }
        }
        Err(Error::NotFound(format!(
            "no resource matches {} {} {:?}",
            path, op, value
        )))
    }

    fn path_filter_resource_many(
        &self,
        path: &str,
        op: &str,
        value: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Resource>> {
        let query = PathQuery::parse(path, op, value)?;
        self.metrics.record_filter_query();

        let tables = self.tables.read();
        let mut matched = Vec::new();
        for key in tables.units.iter() {
            if let Some(res) = tables.resources.get(key) {
                if query.matches(res)? {
                    matched.push(res);
                }
            }
        }

        let items = window_of(&matched, page, per_page, self.config.max_per_page)
            .iter()
            .map(|res| (*res).clone())
            .collect();
        Ok(Page::new(items, matched.len()))
    }

    fn resource_count(&self) -> usize {
        self.tables.read().resources.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
