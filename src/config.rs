//! Daemon Configuration
//!
//! File-based configuration of a catalog daemon. JSON is the native format;
//! files ending in `.yaml` or `.yml` are read as YAML.
//!
//! ```json
//! {
//!   "name": "Local Service Catalog",
//!   "host": "gw1",
//!   "kind": "service",
//!   "storage": "memory",
//!   "endpoint": "0.0.0.0:8082",
//!   "maxPerPage": 100,
//!   "sweepIntervalSecs": 5
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::{StoreConfig, MAX_PER_PAGE};
use crate::domain::model::{validate_record_id, Protocol, Service};
use crate::error::{Error, Result};

/// Path under which a catalog serves its API
pub const CATALOG_BASE_PATH: &str = "/sc";

/// DNS-SD type advertised by service catalogs
pub const SERVICE_CATALOG_TYPE: &str = "_patchwork-sc._tcp";

/// Which flavor of catalog the daemon hosts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    #[default]
    Device,
    Service,
}

impl std::str::FromStr for CatalogKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "device" => Ok(CatalogKind::Device),
            "service" => Ok(CatalogKind::Service),
            other => Err(Error::Config(format!("unknown catalog kind {:?}", other))),
        }
    }
}

/// Storage backend; only the in-memory store exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
}

/// Catalog daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogConfig {
    pub name: String,
    pub description: String,
    /// Host part of the self-registration id
    pub host: String,
    pub kind: CatalogKind,
    pub storage: StorageBackend,
    /// `host:port` the catalog API is reachable at
    pub endpoint: String,
    pub max_per_page: usize,
    pub sweep_interval_secs: u64,
    /// Register the catalog in its own store (service catalogs only)
    pub self_register: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            name: "catalog".to_string(),
            description: String::new(),
            host: "localhost".to_string(),
            kind: CatalogKind::Device,
            storage: StorageBackend::Memory,
            endpoint: "0.0.0.0:8082".to_string(),
            max_per_page: MAX_PER_PAGE,
            sweep_interval_secs: 5,
            self_register: true,
        }
    }
}

impl CatalogConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: CatalogConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)?,
            _ => serde_json::from_str(&raw)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("name must not be empty".into()));
        }
        match self.endpoint.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => {}
            _ => {
                return Err(Error::Config(format!(
                    "endpoint {:?} must be host:port",
                    self.endpoint
                )))
            }
        }
        if self.max_per_page == 0 {
            return Err(Error::Config("maxPerPage must be positive".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config("sweepIntervalSecs must be positive".into()));
        }
        if self.kind == CatalogKind::Service && self.self_register {
            validate_record_id(&self.registration_id()).map_err(|e| {
                Error::Config(format!("host and name must form a registration id: {}", e))
            })?;
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_per_page: self.max_per_page,
        }
    }

    fn registration_id(&self) -> String {
        format!("{}/{}", self.host, self.name)
    }

    /// Registration a service catalog publishes about itself.
    ///
    /// Never expires; advertises the REST API under the catalog endpoint.
    pub fn self_registration(&self) -> Service {
        let mut service = Service::new(self.registration_id(), -1);
        service.service_type = "Service".to_string();
        service.name = self.name.clone();
        service.description = self.description.clone();
        service
            .meta
            .insert("serviceType".into(), json!(SERVICE_CATALOG_TYPE));

        let mut rest = Protocol {
            protocol_type: "REST".to_string(),
            methods: vec![
                "GET".into(),
                "POST".into(),
                "PUT".into(),
                "DELETE".into(),
            ],
            content_types: vec!["application/ld+json".into()],
            ..Default::default()
        };
        rest.endpoint.insert(
            "url".into(),
            json!(format!("http://{}{}", self.endpoint, CATALOG_BASE_PATH)),
        );
        service.protocols.push(rest);
        service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn temp_file(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("iot-catalog-{}-{}", std::process::id(), name));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_per_page, 100);
        assert_eq!(config.sweep_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_json() {
        let path = temp_file(
            "sc.json",
            r#"{ "name": "sc", "host": "gw1", "kind": "service", "storage": "memory", "endpoint": "0.0.0.0:8082" }"#,
        );
        let config = CatalogConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.kind, CatalogKind::Service);
        assert_eq!(config.max_per_page, 100);
        assert!(config.self_register);
    }

    #[test]
    fn test_load_yaml() {
        let path = temp_file(
            "dc.yaml",
            "name: dc\nkind: device\nendpoint: localhost:8081\nmaxPerPage: 20\nsweepIntervalSecs: 2\n",
        );
        let config = CatalogConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.kind, CatalogKind::Device);
        assert_eq!(config.store_config().max_per_page, 20);
        assert_eq!(config.sweep_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_unsupported_storage_rejected() {
        let path = temp_file("bad.json", r#"{ "name": "sc", "storage": "mongodb" }"#);
        let result = CatalogConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_matches!(result, Err(Error::Serialization(_)));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = CatalogConfig {
            endpoint: "localhost".into(),
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Config(_)));

        config.endpoint = "localhost:8082".into();
        config.max_per_page = 0;
        assert_matches!(config.validate(), Err(Error::Config(_)));

        config.max_per_page = 10;
        config.sweep_interval_secs = 0;
        assert_matches!(config.validate(), Err(Error::Config(_)));

        config.sweep_interval_secs = 5;
        config.name = " ".into();
        assert_matches!(config.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_registration_id_must_be_valid() {
        let mut config = CatalogConfig {
            name: "a/b".into(),
            kind: CatalogKind::Service,
            ..Default::default()
        };
        assert_matches!(config.validate(), Err(Error::Config(_)));

        config.name = "sc".into();
        config.host = String::new();
        assert_matches!(config.validate(), Err(Error::Config(_)));

        config.host = "gw1".into();
        assert!(config.validate().is_ok());
        assert!(config.self_registration().validate().is_ok());

        // Only service catalogs register themselves.
        config.name = "a/b".into();
        config.self_register = false;
        assert!(config.validate().is_ok());
        config.self_register = true;
        config.kind = CatalogKind::Device;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_self_registration() {
        let config = CatalogConfig {
            name: "sc".into(),
            host: "gw1".into(),
            endpoint: "10.0.0.1:8082".into(),
            ..Default::default()
        };
        let service = config.self_registration();

        assert_eq!(service.id, "gw1/sc");
        assert_eq!(service.ttl, -1);
        assert!(service.validate().is_ok());
        assert_eq!(service.protocols[0].protocol_type, "REST");
        assert_eq!(service.protocols[0].endpoint["url"], "http://10.0.0.1:8082/sc");
        assert_eq!(service.meta["serviceType"], SERVICE_CATALOG_TYPE);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Service".parse::<CatalogKind>().unwrap(), CatalogKind::Service);
        assert!("gateway".parse::<CatalogKind>().is_err());
    }
}
