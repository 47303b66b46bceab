//! Catalog Data Model
//!
//! Records held by the catalogs: devices (with their resources) and service
//! registrations. Field names on the wire follow the catalog JSON format
//! (`type`, `content-types`, `device` back-reference, RFC 3339 timestamps).

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Free-form metadata attached to records, opaque to the engine.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Number of `/`-separated segments in a device or service id.
pub const RECORD_ID_SEGMENTS: usize = 2;

/// Number of `/`-separated segments in a resource id.
pub const RESOURCE_ID_SEGMENTS: usize = 3;

// =============================================================================
// Expiry
// =============================================================================

/// Expiry instant for a record updated at `updated` with the given TTL.
///
/// A negative TTL never expires and yields `None`. A non-negative TTL whose
/// expiry falls outside the representable time range is a validation error.
pub fn expiry_for(updated: DateTime<Utc>, ttl: i64) -> Result<Option<DateTime<Utc>>> {
    if ttl < 0 {
        return Ok(None);
    }
    Duration::try_seconds(ttl)
        .and_then(|d| updated.checked_add_signed(d))
        .map(Some)
        .ok_or_else(|| Error::Validation(format!("ttl {} is out of range", ttl)))
}

/// Whether an entry with the given TTL and expiry is due for removal at `now`.
pub fn is_expired(ttl: i64, expires: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires {
        Some(at) => ttl >= 0 && now >= at,
        None => false,
    }
}

// =============================================================================
// Id Validation
// =============================================================================

fn has_segments(id: &str, count: usize) -> bool {
    let mut segments = 0;
    for part in id.split('/') {
        if part.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == count
}

/// Check that `id` has the `<namespace>/<name>` shape.
pub fn validate_record_id(id: &str) -> Result<()> {
    if has_segments(id, RECORD_ID_SEGMENTS) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "record id {:?} has to be <namespace>/<name>",
            id
        )))
    }
}

/// Check that `id` has the `<namespace>/<name>/<resource>` shape and belongs to `owner`.
pub fn validate_resource_id(id: &str, owner: &str) -> Result<()> {
    let owned = id
        .strip_prefix(owner)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false);
    if has_segments(id, RESOURCE_ID_SEGMENTS) && owned {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "resource id {:?} has to be {}/<resource>",
            id, owner
        )))
    }
}

// =============================================================================
// Records
// =============================================================================

/// Protocol description of a resource or service API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Protocol {
    #[serde(rename = "type")]
    pub protocol_type: String,
    pub endpoint: Meta,
    pub methods: Vec<String>,
    #[serde(rename = "content-types")]
    pub content_types: Vec<String>,
}

/// A resource exposed by a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub meta: Meta,
    pub protocols: Vec<Protocol>,
    pub representation: Meta,
    /// Id of the owning device
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device: String,
}

/// A device registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Device {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub meta: Meta,
    pub description: String,
    /// Seconds to live after the last update; negative never expires
    pub ttl: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

impl Device {
    /// Create a device with the given id and TTL.
    pub fn new(id: impl Into<String>, ttl: i64) -> Self {
        Self {
            id: id.into(),
            ttl,
            ..Default::default()
        }
    }

    /// Look up one of this device's resources by name.
    pub fn resource_by_name(&self, name: &str) -> Result<&Resource> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::NotFound(format!("device {} has no resource {}", self.id, name)))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.ttl, self.expires, now)
    }
}

/// A service registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub name: String,
    pub description: String,
    pub meta: Meta,
    pub protocols: Vec<Protocol>,
    pub representation: Meta,
    /// Seconds to live after the last update; negative never expires
    pub ttl: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl Service {
    /// Create a service registration with the given id and TTL.
    pub fn new(id: impl Into<String>, ttl: i64) -> Self {
        Self {
            id: id.into(),
            ttl,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_record_id(&self.id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.ttl, self.expires, now)
    }
}

// =============================================================================
// Tests
// =============================================================================
