//! Errors shared by all connectors.
//!
//! Only failures that propagate to the caller live here. "Not connected",
//! usage errors and marshaling errors are reported through the connector's
//! diagnostics and answered with an empty sentinel instead.

use crate::marshal::ConversionError;
use std::sync::Arc;

/// A boxed error kept as the source of a [`TransportError`].
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result alias for connector operations.
pub type Result<T, E = ConnectorError> = std::result::Result<T, E>;

/// Failure raised by a backend's native client.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that connector operations return to the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectorError {
    #[error("{connector}: {operation} failed: {source}")]
    Transport {
        connector: String,
        operation: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("{connector}: value stored at {key:?} is unreadable: {source}")]
    Conversion {
        connector: String,
        key: String,
        #[source]
        source: ConversionError,
    },
}

impl ConnectorError {
    pub fn transport(connector: impl Into<String>, operation: &'static str, source: TransportError) -> Self {
        Self::Transport {
            connector: connector.into(),
            operation,
            source,
        }
    }

    pub fn conversion(connector: impl Into<String>, key: impl Into<String>, source: ConversionError) -> Self {
        Self::Conversion {
            connector: connector.into(),
            key: key.into(),
            source,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}
