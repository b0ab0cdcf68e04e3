//! Key/value and document store connector for SmartForge.
//!
//! [`KvConnector`] wraps a native key/value client, plugged in through the
//! [`KvBackend`] / [`KvSession`] traits, behind the shared connection
//! lifecycle. Values are typed on the way out with [`DataType`] because the
//! store itself keeps opaque byte strings.
//!
//! ```
//! use smartforge_connector_kv::{KvConnector, MemoryKvBackend};
//! use smartforge_core::{DataType, KvSettings, ScalarValue};
//!
//! let kv = KvConnector::new(KvSettings::new("localhost"), MemoryKvBackend::new());
//! kv.connect(0)?;
//! kv.set("flag", true)?;
//! assert_eq!(kv.get("flag", DataType::Boolean)?, Some(ScalarValue::Boolean(true)));
//! # Ok::<(), smartforge_core::ConnectorError>(())
//! ```
//!
//! [`DataType`]: smartforge_core::DataType

mod connector;
pub mod memory;
mod transport;

pub use connector::KvConnector;
pub use memory::{MemoryKvBackend, MemoryKvSession};
pub use transport::{KvBackend, KvSession, ROOT_PATH};
