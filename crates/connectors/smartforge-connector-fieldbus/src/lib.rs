//! Industrial field-bus connector for SmartForge.
//!
//! [`FieldBusConnector`] reads and writes node values and manages at most one
//! subscription per node. All operations are async; with the default
//! `protected` exclusion mode they are serialized per connector.
//!
//! ```
//! use smartforge_connector_fieldbus::{FieldBusConnector, MemoryFieldBusClient};
//! use smartforge_core::{FieldBusSettings, Precision, Variant};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let client = MemoryFieldBusClient::new();
//! client.add_node("ns=2;s=Oven.Setpoint", Variant::Double(0.0));
//!
//! let settings = FieldBusSettings::new("opc.tcp://plc:4840".parse().unwrap());
//! let bus = FieldBusConnector::new(settings, client);
//! bus.connect().await.unwrap();
//! bus.set("ns=2;s=Oven.Setpoint", 180.0, Some(Precision::Bits32)).await.unwrap();
//! assert_eq!(bus.get("ns=2;s=Oven.Setpoint").await.unwrap(), Some(Variant::Float(180.0)));
//! bus.disconnect().await.unwrap();
//! # });
//! ```

mod connector;
pub mod memory;
mod node;
mod transport;

pub use connector::FieldBusConnector;
pub use memory::{ClientEvent, MemoryFieldBusClient, MemorySubscription};
pub use node::{ChannelHandler, DataChange, DataChangeHandler, NodeId, Quality};
pub use transport::FieldBusClient;
