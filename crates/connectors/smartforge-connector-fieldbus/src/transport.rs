//! Native client boundary for the field-bus server.

use crate::node::{DataChangeHandler, NodeId};
use async_trait::async_trait;
use smartforge_core::{Credentials, Endpoint, TransportError, Variant};
use std::sync::Arc;
use std::time::Duration;

/// Asynchronous field-bus client.
///
/// One client instance is owned by one connector for its whole life; the
/// connector calls [`configure_security`](Self::configure_security) before
/// every [`connect`](Self::connect).
#[async_trait]
pub trait FieldBusClient: Send + Sync + 'static {
    /// Server-side subscription handle.
    type Subscription: Send + Sync + 'static;

    /// Set the security policy string and user credentials for the next handshake.
    async fn configure_security(&self, security: &str, credentials: &Credentials) -> Result<(), TransportError>;

    /// Open the session. Every request afterwards is bounded by `timeout`.
    async fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Current value attribute of `node`.
    async fn read_value(&self, node: &NodeId) -> Result<Option<Variant>, TransportError>;

    async fn write_value(&self, node: &NodeId, value: Variant) -> Result<(), TransportError>;

    /// Create a subscription publishing changes of `node` every `interval`.
    async fn subscribe(
        &self,
        node: &NodeId,
        interval: Duration,
        handler: Arc<dyn DataChangeHandler>,
    ) -> Result<Self::Subscription, TransportError>;

    /// Delete a subscription on the server.
    async fn delete_subscription(&self, subscription: &Self::Subscription) -> Result<(), TransportError>;
}
