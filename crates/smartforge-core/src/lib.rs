//! Core types for SmartForge connectors.
//!
//! This crate holds what every backend connector shares: the scalar value
//! model, wire marshaling, the connection lifecycle with its exclusion policy,
//! injected diagnostics, settings and logging setup. Backend crates plug a
//! native client in behind a transport trait and build on these pieces.

mod diagnostics;
mod endpoint;
mod error;
mod exclusion;
mod lifecycle;
pub mod logging;
pub mod marshal;
pub mod settings;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
mod value;

pub use diagnostics::{Diagnostics, Reporter, TracingDiagnostics};
pub use endpoint::{DEFAULT_SCHEME, Endpoint, EndpointParseError};
pub use error::{BoxError, ConnectorError, Result, TransportError};
pub use exclusion::{AsyncExclusionGuard, AsyncExclusionPolicy, ExclusionGuard, ExclusionMode, ExclusionPolicy};
pub use lifecycle::{ConnectorState, Lifecycle};
pub use marshal::{ConversionError, MarshalError, Variant, VariantType};
pub use settings::{ColumnSettings, Credentials, FieldBusSettings, KvSettings, LoggingSettings, Settings};
pub use value::{DataType, Precision, ScalarValue};
