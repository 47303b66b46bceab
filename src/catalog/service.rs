//! Service Catalog Store
//!
//! In-memory registry of service registrations. A single `RwLock` guards the
//! registration map and its entry index; the index is rebuilt after every
//! mutation while the write lock is still held.
//!
//! Expired registrations are only removed by [`CatalogStorage::clean_expired`].
//! Between sweeps an entry past its expiry is still returned as stored; the
//! staleness is bounded by the sweep interval.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::index::EntryIndex;
use super::metrics::CatalogMetrics;
use super::paging::window_of;
use super::pathfilter::PathQuery;
use super::StoreConfig;
use crate::domain::model::{expiry_for, Service};
use crate::domain::ports::{CatalogStorage, Clock, Page};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct ServiceTables {
    data: HashMap<String, Service>,
    index: EntryIndex,
}

impl ServiceTables {
    fn reindex(&mut self) {
        self.index.rebuild_from(&self.data);
    }

    fn entry(&self, id: &str) -> Result<&Service> {
        self.data.get(id).ok_or_else(|| {
            Error::Consistency(format!("indexed registration {} is not stored", id))
        })
    }
}

/// In-memory service catalog
pub struct ServiceStore {
    tables: RwLock<ServiceTables>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
    metrics: Arc<CatalogMetrics>,
}

impl ServiceStore {
    /// Create a store with the default configuration
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(StoreConfig::default(), clock)
    }

    /// Create a store with a custom configuration
    pub fn with_config(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(ServiceTables::default()),
            clock,
            config,
            metrics: Arc::new(CatalogMetrics::new()),
        }
    }

    fn reject<T>(&self, err: Error) -> Result<T> {
        self.metrics.record_rejected();
        Err(err)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::Consistency(reason)) = &result {
            self.metrics.record_consistency_error();
            error!(reason = %reason, "Service catalog invariant violated");
        }
        result
    }
}

impl std::fmt::Debug for ServiceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStore")
            .field("registrations", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl CatalogStorage for ServiceStore {
    type Entry = Service;

    fn add(&self, mut service: Service) -> Result<Service> {
        if let Err(e) = service.validate() {
            return self.reject(e);
        }

        let now = self.clock.now();
        let expires = match expiry_for(now, service.ttl) {
            Ok(expires) => expires,
            Err(e) => return self.reject(e),
        };
        service.created = now;
        service.updated = now;
        service.expires = expires;

        let mut tables = self.tables.write();
        if tables.data.contains_key(&service.id) {
            return self.reject(Error::Validation(format!(
                "registration {} already exists",
                service.id
            )));
        }
        tables.data.insert(service.id.clone(), service.clone());
        tables.reindex();
        drop(tables);

        self.metrics.record_add();
        debug!(id = %service.id, ttl = service.ttl, "Added service registration");
        Ok(service)
    }

    fn update(&self, id: &str, service: Service) -> Result<Service> {
        let now = self.clock.now();
        let expires = match expiry_for(now, service.ttl) {
            Ok(expires) => expires,
            Err(e) => return self.reject(e),
        };

        let mut tables = self.tables.write();
        let Some(stored) = tables.data.get_mut(id) else {
            self.metrics.record_lookup(false);
            return Err(Error::not_found(id));
        };

        stored.service_type = service.service_type;
        stored.name = service.name;
        stored.description = service.description;
        stored.meta = service.meta;
        stored.protocols = service.protocols;
        stored.representation = service.representation;
        stored.ttl = service.ttl;
        stored.updated = now;
        stored.expires = expires;
        let updated = stored.clone();
        tables.reindex();
        drop(tables);

        self.metrics.record_update();
        debug!(id = %id, ttl = updated.ttl, "Updated service registration");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> Result<Service> {
        let mut tables = self.tables.write();
        let Some(removed) = tables.data.remove(id) else {
            self.metrics.record_lookup(false);
            return Err(Error::not_found(id));
        };
        tables.reindex();
        drop(tables);

        self.metrics.record_delete();
        debug!(id = %id, "Deleted service registration");
        Ok(removed)
    }

    fn get(&self, id: &str) -> Result<Service> {
        let found = self.tables.read().data.get(id).cloned();
        self.metrics.record_lookup(found.is_some());
        found.ok_or_else(|| Error::not_found(id))
    }

    fn get_many(&self, page: usize, per_page: usize) -> Result<Page<Service>> {
        self.metrics.record_listing();
        let tables = self.tables.read();
        let keys = window_of(tables.index.keys(), page, per_page, self.config.max_per_page);
        let items = keys
            .iter()
            .map(|id| tables.entry(id).cloned())
            .collect::<Result<Vec<_>>>();
        let total = tables.data.len();
        drop(tables);

        Ok(Page::new(self.observe(items)?, total))
    }

    fn path_filter_one(&self, path: &str, op: &str, value: &str) -> Result<Service> {
        let query = PathQuery::parse(path, op, value)?;
        self.metrics.record_filter_query();

        let tables = self.tables.read();
        for id in tables.index.iter() {
            let service = self.observe(tables.entry(id))?;
            if query.matches(service)? {
                return Ok(service.clone());
            }
        }
        Err(Error::NotFound(format!(
            "no registration matches {} {} {:?}",
            path, op, value
        )))
    }

    fn path_filter_many(
        &self,
        path: &str,
        op: &str,
        value: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Page<Service>> {
        let query = PathQuery::parse(path, op, value)?;
        self.metrics.record_filter_query();

        let tables = self.tables.read();
        let mut matched = Vec::new();
        for id in tables.index.iter() {
            let service = self.observe(tables.entry(id))?;
            if query.matches(service)? {
                matched.push(service);
            }
        }

        let items = window_of(&matched, page, per_page, self.config.max_per_page)
            .iter()
            .map(|s| (*s).clone())
            .collect();
        Ok(Page::new(items, matched.len()))
    }

    fn clean_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write();
        let expired: Vec<String> = tables
            .data
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.id.clone())
            .collect();
        if expired.is_empty() {
            return 0;
        }

        for id in &expired {
            tables.data.remove(id);
            warn!(id = %id, "Service registration has expired");
        }
        tables.reindex();
        drop(tables);

        self.metrics.record_expired(expired.len() as u64);
        info!(removed = expired.len(), "Removed expired service registrations");
        expired.len()
    }

    fn len(&self) -> usize {
        self.tables.read().data.len()
    }

    fn metrics(&self) -> Arc<CatalogMetrics> {
        Arc::clone(&self.metrics)
    }
}

// =============================================================================
// Tests
// =============================================================================
