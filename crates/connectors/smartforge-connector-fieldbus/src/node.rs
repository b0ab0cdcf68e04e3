//! Node identifiers and data-change notifications.

use serde::{Deserialize, Serialize};
use smartforge_core::Variant;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// Address of a node on the field-bus server, e.g. `ns=2;s=Press.Temperature`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

/// Server-reported quality of a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// The value is reliable.
    #[default]
    Good,
    /// The server could not fully vouch for the value.
    Uncertain,
    /// The value must not be used.
    Bad,
}

/// A new value for a subscribed node, with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChange {
    pub value: Variant,
    pub quality: Quality,
    pub source_timestamp: Option<SystemTime>,
}

impl DataChange {
    pub fn new(value: Variant) -> Self {
        Self {
            value,
            quality: Quality::Good,
            source_timestamp: Some(SystemTime::now()),
        }
    }
}

/// Receives value changes for subscribed nodes.
///
/// Called from the transport's notification context, so implementations
/// should hand work off rather than block.
pub trait DataChangeHandler: Send + Sync {
    fn datachange_notification(&self, node: &NodeId, change: &DataChange);
}

impl<F> DataChangeHandler for F
where
    F: Fn(&NodeId, &DataChange) + Send + Sync,
{
    fn datachange_notification(&self, node: &NodeId, change: &DataChange) {
        self(node, change)
    }
}

/// Handler that forwards every change into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<(NodeId, DataChange)>,
}

impl ChannelHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(NodeId, DataChange)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl DataChangeHandler for ChannelHandler {
    fn datachange_notification(&self, node: &NodeId, change: &DataChange) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.tx.send((node.clone(), change.clone()));
    }
}
