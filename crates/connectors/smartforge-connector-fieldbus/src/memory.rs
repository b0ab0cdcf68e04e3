//! In-memory field-bus server and client.
//!
//! [`MemoryFieldBusClient`] keeps a table of nodes and live subscriptions.
//! Writes, and values pushed with [`MemoryFieldBusClient::push_value`], are
//! published to every subscription on the node. Each transport call is
//! appended to an event log so tests can check ordering.

use crate::node::{DataChange, DataChangeHandler, NodeId};
use crate::transport::FieldBusClient;
use async_trait::async_trait;
use smartforge_core::{Credentials, Endpoint, TransportError, Variant};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

/// A transport call observed by the in-memory server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    SecurityConfigured { security: String, username: String },
    Connected { endpoint: Endpoint, timeout: Duration },
    Read(NodeId),
    Wrote(NodeId, Variant),
    Subscribed { node: NodeId, interval: Duration },
    Deleted(NodeId),
    Disconnected,
}

/// Client calls that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Disconnect,
    Read,
    Write,
    Subscribe,
    Delete,
}

struct ServerSubscription {
    node: NodeId,
    handler: Arc<dyn DataChangeHandler>,
}

#[derive(Default)]
struct Server {
    connected: bool,
    nodes: HashMap<NodeId, Variant>,
    subscriptions: BTreeMap<u64, ServerSubscription>,
    next_subscription: u64,
    events: Vec<ClientEvent>,
    fail_next: Option<Operation>,
}

impl Server {
    fn check(&mut self, op: Operation) -> Result<(), TransportError> {
        if self.fail_next == Some(op) {
            self.fail_next = None;
            return Err(TransportError::new(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn require_session(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::new("BadSessionClosed"))
        }
    }

    fn handlers_for(&self, node: &NodeId) -> Vec<Arc<dyn DataChangeHandler>> {
        self.subscriptions
            .values()
            .filter(|s| &s.node == node)
            .map(|s| Arc::clone(&s.handler))
            .collect()
    }
}

/// Handle to a subscription on a [`MemoryFieldBusClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySubscription {
    id: u64,
    node: NodeId,
}

impl MemorySubscription {
    pub fn node(&self) -> &NodeId {
        &self.node
    }
}

/// In-memory field-bus client; clones share the same server.
#[derive(Clone, Default)]
pub struct MemoryFieldBusClient {
    server: Arc<Mutex<Server>>,
}

impl MemoryFieldBusClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn server(&self) -> MutexGuard<'_, Server> {
        self.server.lock()
    }

    /// Create `node` with an initial value.
    pub fn add_node(&self, node: impl Into<NodeId>, value: Variant) {
        self.server().nodes.insert(node.into(), value);
    }

    /// Current value of `node` on the server.
    pub fn value(&self, node: &NodeId) -> Option<Variant> {
        self.server().nodes.get(node).cloned()
    }

    /// Change a node server-side and publish it to subscribers.
    pub fn push_value(&self, node: impl Into<NodeId>, value: Variant) {
        let node = node.into();
        let handlers = {
            let mut server = self.server();
            server.nodes.insert(node.clone(), value.clone());
            server.handlers_for(&node)
        };
        publish(&node, &value, &handlers);
    }

    pub fn fail_next(&self, op: Operation) {
        self.server().fail_next = Some(op);
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.server().events.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.server().connected
    }

    /// Number of subscriptions alive on the server.
    pub fn active_subscriptions(&self) -> usize {
        self.server().subscriptions.len()
    }
}

impl fmt::Debug for MemoryFieldBusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let server = self.server();
        f.debug_struct("MemoryFieldBusClient")
            .field("connected", &server.connected)
            .field("nodes", &server.nodes.len())
            .field("subscriptions", &server.subscriptions.len())
            .finish()
    }
}

fn publish(node: &NodeId, value: &Variant, handlers: &[Arc<dyn DataChangeHandler>]) {
    if handlers.is_empty() {
        return;
    }
    let change = DataChange::new(value.clone());
    for handler in handlers {
        handler.datachange_notification(node, &change);
    }
}

#[async_trait]
impl FieldBusClient for MemoryFieldBusClient {
    type Subscription = MemorySubscription;

    async fn configure_security(&self, security: &str, credentials: &Credentials) -> Result<(), TransportError> {
        self.server().events.push(ClientEvent::SecurityConfigured {
            security: security.to_string(),
            username: credentials.username.clone(),
        });
        Ok(())
    }

    async fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<(), TransportError> {
        let mut server = self.server();
        server.check(Operation::Connect)?;
        server.connected = true;
        server.events.push(ClientEvent::Connected {
            endpoint: endpoint.clone(),
            timeout,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut server = self.server();
        server.check(Operation::Disconnect)?;
        server.connected = false;
        server.events.push(ClientEvent::Disconnected);
        Ok(())
    }

    async fn read_value(&self, node: &NodeId) -> Result<Option<Variant>, TransportError> {
        let mut server = self.server();
        server.require_session()?;
        server.check(Operation::Read)?;
        server.events.push(ClientEvent::Read(node.clone()));
        Ok(server.nodes.get(node).cloned())
    }

    async fn write_value(&self, node: &NodeId, value: Variant) -> Result<(), TransportError> {
        let handlers = {
            let mut server = self.server();
            server.require_session()?;
            server.check(Operation::Write)?;
            if !server.nodes.contains_key(node) {
                return Err(TransportError::new(format!("BadNodeIdUnknown: {node}")));
            }
            server.nodes.insert(node.clone(), value.clone());
            server.events.push(ClientEvent::Wrote(node.clone(), value.clone()));
            server.handlers_for(node)
        };
        publish(node, &value, &handlers);
        Ok(())
    }

    async fn subscribe(
        &self,
        node: &NodeId,
        interval: Duration,
        handler: Arc<dyn DataChangeHandler>,
    ) -> Result<Self::Subscription, TransportError> {
        let mut server = self.server();
        server.require_session()?;
        server.check(Operation::Subscribe)?;
        if !server.nodes.contains_key(node) {
            return Err(TransportError::new(format!("BadNodeIdUnknown: {node}")));
        }
        let id = server.next_subscription;
        server.next_subscription += 1;
        server.subscriptions.insert(
            id,
            ServerSubscription {
                node: node.clone(),
                handler,
            },
        );
        server.events.push(ClientEvent::Subscribed {
            node: node.clone(),
            interval,
        });
        Ok(MemorySubscription { id, node: node.clone() })
    }

    async fn delete_subscription(&self, subscription: &Self::Subscription) -> Result<(), TransportError> {
        let mut server = self.server();
        server.require_session()?;
        server.check(Operation::Delete)?;
        if server.subscriptions.remove(&subscription.id).is_none() {
            return Err(TransportError::new("BadSubscriptionIdInvalid"));
        }
        server.events.push(ClientEvent::Deleted(subscription.node.clone()));
        Ok(())
    }
}
