//! Column-family database connector for SmartForge.
//!
//! [`ColumnConnector`] is deliberately thin: it guards a native cluster
//! handle, refuses to run statements whose bind markers have nothing to bind,
//! and keeps user-type registrations scoped to the connected keyspace.

mod connector;
pub mod memory;
mod statement;
mod transport;

pub use connector::ColumnConnector;
pub use memory::{MemoryColumnCluster, MemoryColumnSession};
pub use statement::{Placeholders, StatementArgs, UserType, UserTypeField};
pub use transport::{ColumnCluster, ColumnSession};
