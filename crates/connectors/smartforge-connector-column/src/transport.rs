//! Native client boundary for the column-family database.

use crate::statement::{StatementArgs, UserType};
use smartforge_core::{Credentials, TransportError};

/// Cluster handle for one column-family database deployment.
pub trait ColumnCluster: Send + Sync {
    type Session: ColumnSession;

    /// Open a session bound to `keyspace` through the contact point
    /// `host:port`. `credentials` is `None` for unauthenticated clusters.
    fn connect(
        &self,
        host: &str,
        port: u16,
        credentials: Option<&Credentials>,
        keyspace: &str,
    ) -> Result<Self::Session, TransportError>;

    /// Close every session and release cluster resources.
    fn shutdown(&self) -> Result<(), TransportError>;

    /// Map `mapping` onto the user-defined type `type_name` of `keyspace`.
    fn register_user_type(&self, keyspace: &str, type_name: &str, mapping: &UserType) -> Result<(), TransportError>;
}

/// Session executing statements against one keyspace.
pub trait ColumnSession: Send + Sync {
    /// Run a statement without bind markers.
    fn execute(&self, statement: &str) -> Result<(), TransportError>;

    /// Run a statement with bind markers.
    fn execute_bound(&self, statement: &str, args: &StatementArgs) -> Result<(), TransportError>;
}
