//! Configuration snapshots read from a connected key/value store.
//!
//! Every top-level key of the store is a configuration domain holding a JSON
//! document. [`Configuration::load`] reads them all once; the snapshot is never
//! refreshed.

use serde::de::DeserializeOwned;
use serde_json::Value;
use smartforge_connector_kv::{KvBackend, KvConnector};
use smartforge_core::ConnectorError;
use std::collections::BTreeMap;

/// Domains a configuration store must contain.
pub const REQUIRED_DOMAINS: [&str; 3] = ["hosts", "endpoints", "opc_tags"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("the key/value connector must be connected before loading configuration")]
    NotConnected,
    #[error("configuration is missing required domains: {}", missing.join(", "))]
    Incomplete { missing: Vec<String> },
    #[error("domain {domain} vanished while loading")]
    DocumentUnavailable { domain: String },
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("domain {domain} does not match the requested type")]
    Deserialize {
        domain: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown domain {0}")]
    UnknownDomain(String),
}

/// Immutable map from domain name to its document.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    keys: Vec<String>,
    documents: BTreeMap<String, Value>,
    hosts: Value,
    endpoints: Value,
    opc_tags: Value,
}

impl Configuration {
    /// Snapshot every domain in the store behind `kv`.
    pub fn load<B: KvBackend>(kv: &KvConnector<B>) -> Result<Self, ConfigError> {
        if !kv.is_connected() {
            return Err(ConfigError::NotConnected);
        }
        let Some(keys) = kv.keys()? else {
            return Err(ConfigError::NotConnected);
        };

        let missing: Vec<String> = REQUIRED_DOMAINS
            .iter()
            .filter(|domain| !keys.iter().any(|k| k == *domain))
            .map(|domain| domain.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Incomplete { missing });
        }

        let mut documents = BTreeMap::new();
        for key in &keys {
            let document = kv
                .json_get(key)?
                .ok_or_else(|| ConfigError::DocumentUnavailable { domain: key.clone() })?;
            documents.insert(key.clone(), document);
        }
        tracing::info!(domains = documents.len(), "loaded configuration");

        let required = |domain: &str| {
            documents
                .get(domain)
                .cloned()
                .ok_or_else(|| ConfigError::DocumentUnavailable { domain: domain.to_string() })
        };
        Ok(Self {
            hosts: required("hosts")?,
            endpoints: required("endpoints")?,
            opc_tags: required("opc_tags")?,
            keys,
            documents,
        })
    }

    /// Every domain and its document.
    pub fn configuration(&self) -> &BTreeMap<String, Value> {
        &self.documents
    }

    /// Domain names in the order the store listed them.
    pub fn configurable_properties(&self) -> &[String] {
        &self.keys
    }

    pub fn domain(&self, name: &str) -> Option<&Value> {
        self.documents.get(name)
    }

    pub fn hosts(&self) -> &Value {
        &self.hosts
    }

    pub fn endpoints(&self) -> &Value {
        &self.endpoints
    }

    pub fn opc_tags(&self) -> &Value {
        &self.opc_tags
    }

    /// Deserialize domain `name` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let document = self
            .domain(name)
            .ok_or_else(|| ConfigError::UnknownDomain(name.to_string()))?;
        T::deserialize(document).map_err(|source| ConfigError::Deserialize {
            domain: name.to_string(),
            source,
        })
    }
}
