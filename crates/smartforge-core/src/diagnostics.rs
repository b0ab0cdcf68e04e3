//! Injected diagnostics sink.
//!
//! Connectors never reach for a global logger. Each one is handed an
//! `Arc<dyn Diagnostics>` at construction and reports through a [`Reporter`]
//! that stamps every message with the connector's name.

use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Destination for connector diagnostics.
pub trait Diagnostics: Send + Sync {
    /// Emit one message at `level` on behalf of `connector`.
    fn report(&self, level: Level, connector: &str, message: &str);
}

/// Forwards diagnostics to the `tracing` subscriber of the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, level: Level, connector: &str, message: &str) {
        match level {
            Level::ERROR => tracing::error!(connector, "{message}"),
            Level::WARN => tracing::warn!(connector, "{message}"),
            Level::INFO => tracing::info!(connector, "{message}"),
            Level::DEBUG => tracing::debug!(connector, "{message}"),
            _ => tracing::trace!(connector, "{message}"),
        }
    }
}

/// A named handle onto a [`Diagnostics`] sink.
#[derive(Clone)]
pub struct Reporter {
    connector: String,
    sink: Arc<dyn Diagnostics>,
}

impl Reporter {
    pub fn new(connector: impl Into<String>, sink: Arc<dyn Diagnostics>) -> Self {
        Self {
            connector: connector.into(),
            sink,
        }
    }

    /// A reporter that forwards to `tracing`.
    pub fn tracing(connector: impl Into<String>) -> Self {
        Self::new(connector, Arc::new(TracingDiagnostics))
    }

    pub fn connector(&self) -> &str {
        &self.connector
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.report(Level::INFO, &self.connector, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.report(Level::WARN, &self.connector, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.sink.report(Level::ERROR, &self.connector, message.as_ref());
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.sink.report(Level::DEBUG, &self.connector, message.as_ref());
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").field("connector", &self.connector).finish_non_exhaustive()
    }
}
