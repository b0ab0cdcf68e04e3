//! Guarded field-bus connector with a subscription registry.

use crate::node::{DataChangeHandler, NodeId};
use crate::transport::FieldBusClient;
use smartforge_core::marshal::to_variant;
use smartforge_core::{
    AsyncExclusionPolicy, ConnectorError, ConnectorState, Diagnostics, FieldBusSettings, Lifecycle, Precision,
    Reporter, Result, ScalarValue, TracingDiagnostics, TransportError, Variant,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const NAME: &str = "FieldBusConnector";

/// Connector for an industrial field-bus server.
///
/// Subscriptions are tracked per node: a node already subscribed is not
/// subscribed again, and [`disconnect`](Self::disconnect) deletes every
/// subscription on the server before closing the session.
pub struct FieldBusConnector<C: FieldBusClient> {
    settings: FieldBusSettings,
    client: Arc<C>,
    exclusion: AsyncExclusionPolicy,
    lifecycle: Lifecycle<C>,
    subscriptions: Mutex<HashMap<NodeId, C::Subscription>>,
}

impl<C: FieldBusClient> FieldBusConnector<C> {
    pub fn new(settings: FieldBusSettings, client: C) -> Self {
        Self::with_diagnostics(settings, client, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(settings: FieldBusSettings, client: C, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let reporter = Reporter::new(NAME, diagnostics);
        reporter.info(format!("creating a new {NAME} connecting to {}", settings.endpoint));
        Self {
            exclusion: AsyncExclusionPolicy::new(settings.exclusion),
            settings,
            client: Arc::new(client),
            lifecycle: Lifecycle::new(reporter),
            subscriptions: Mutex::default(),
        }
    }

    pub fn settings(&self) -> &FieldBusSettings {
        &self.settings
    }

    fn reporter(&self) -> &Reporter {
        self.lifecycle.reporter()
    }

    fn transport_failure(&self, operation: &'static str, err: TransportError) -> ConnectorError {
        self.reporter().error(format!("{operation} failed: {err}"));
        ConnectorError::transport(NAME, operation, err)
    }

    /// Negotiate security and credentials, then open the session.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.exclusion.acquire().await;
        if !self.lifecycle.should_connect() {
            return Ok(());
        }
        self.client
            .configure_security(&self.settings.security, &self.settings.credentials())
            .await
            .map_err(|e| self.transport_failure("connect", e))?;
        self.client
            .connect(&self.settings.endpoint, self.settings.timeout())
            .await
            .map_err(|e| self.transport_failure("connect", e))?;
        self.lifecycle.establish(Arc::clone(&self.client));
        Ok(())
    }

    /// Delete every subscription, then close the session.
    ///
    /// If deleting a subscription fails, the ones not yet deleted stay
    /// registered and the connector stays connected.
    pub async fn disconnect(&self) -> Result<()> {
        let _guard = self.exclusion.acquire().await;
        let Some(client) = self.lifecycle.closing() else {
            return Ok(());
        };

        {
            let mut registry = self.subscriptions.lock().await;
            let nodes: Vec<NodeId> = registry.keys().cloned().collect();
            for node in nodes {
                if let Some(subscription) = registry.get(&node) {
                    client
                        .delete_subscription(subscription)
                        .await
                        .map_err(|e| self.transport_failure("disconnect", e))?;
                }
                registry.remove(&node);
            }
        }

        client
            .disconnect()
            .await
            .map_err(|e| self.transport_failure("disconnect", e))?;
        self.lifecycle.release();
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        let _guard = self.exclusion.acquire().await;
        self.lifecycle.is_connected()
    }

    pub async fn state(&self) -> ConnectorState {
        let _guard = self.exclusion.acquire().await;
        self.lifecycle.state()
    }

    /// Write `value` to `node_id` using the wire type selected by `precision`.
    ///
    /// Values without a field-bus encoding are reported and not written.
    pub async fn set(
        &self,
        node_id: impl Into<NodeId>,
        value: impl Into<ScalarValue>,
        precision: Option<Precision>,
    ) -> Result<()> {
        let node = node_id.into();
        let _guard = self.exclusion.acquire().await;
        let variant = match to_variant(&value.into(), precision) {
            Ok(variant) => variant,
            Err(e) => {
                self.reporter().error(format!("not writing {node}: {e}"));
                return Ok(());
            }
        };
        let Some(client) = self.lifecycle.session("set") else {
            return Ok(());
        };
        client
            .write_value(&node, variant)
            .await
            .map_err(|e| self.transport_failure("set", e))
    }

    /// Read the current value of `node_id` as the server encodes it.
    pub async fn get(&self, node_id: impl Into<NodeId>) -> Result<Option<Variant>> {
        let node = node_id.into();
        let _guard = self.exclusion.acquire().await;
        let Some(client) = self.lifecycle.session("get") else {
            return Ok(None);
        };
        client
            .read_value(&node)
            .await
            .map_err(|e| self.transport_failure("get", e))
    }

    /// Subscribe to `node_id` at the configured update interval.
    pub async fn start_subscription(
        &self,
        node_id: impl Into<NodeId>,
        handler: Arc<dyn DataChangeHandler>,
    ) -> Result<()> {
        self.start_subscription_every(node_id, handler, self.settings.update_interval())
            .await
    }

    /// Subscribe to `node_id`, publishing changes every `update_interval`.
    ///
    /// A node that already has a subscription is left untouched and the call
    /// is reported as an error.
    pub async fn start_subscription_every(
        &self,
        node_id: impl Into<NodeId>,
        handler: Arc<dyn DataChangeHandler>,
        update_interval: Duration,
    ) -> Result<()> {
        let node = node_id.into();
        let _guard = self.exclusion.acquire().await;
        let Some(client) = self.lifecycle.session("start_subscription") else {
            return Ok(());
        };

        let mut registry = self.subscriptions.lock().await;
        if registry.contains_key(&node) {
            self.reporter().error(format!(
                "{node} is already subscribed, stop the subscription before starting a new one"
            ));
            return Ok(());
        }
        let subscription = client
            .subscribe(&node, update_interval, handler)
            .await
            .map_err(|e| self.transport_failure("start_subscription", e))?;
        registry.insert(node, subscription);
        Ok(())
    }

    /// Delete the subscription on `node_id`, if there is one.
    pub async fn stop_subscription(&self, node_id: impl Into<NodeId>) -> Result<()> {
        let node = node_id.into();
        let _guard = self.exclusion.acquire().await;
        let Some(client) = self.lifecycle.session("stop_subscription") else {
            return Ok(());
        };

        let mut registry = self.subscriptions.lock().await;
        let Some(subscription) = registry.get(&node) else {
            self.reporter().warn(format!("{node} has no subscription to stop"));
            return Ok(());
        };
        client
            .delete_subscription(subscription)
            .await
            .map_err(|e| self.transport_failure("stop_subscription", e))?;
        registry.remove(&node);
        Ok(())
    }

    /// Nodes with an active subscription, sorted.
    pub async fn subscriptions(&self) -> Vec<NodeId> {
        let _guard = self.exclusion.acquire().await;
        let mut nodes: Vec<NodeId> = self.subscriptions.lock().await.keys().cloned().collect();
        nodes.sort();
        nodes
    }
}

impl<C: FieldBusClient> std::fmt::Debug for FieldBusConnector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBusConnector")
            .field("endpoint", &self.settings.endpoint)
            .field("exclusion", &self.exclusion.mode())
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
