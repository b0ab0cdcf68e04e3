//! In-memory column-family cluster that records what it is asked to do.

use crate::statement::{StatementArgs, UserType};
use crate::transport::{ColumnCluster, ColumnSession};
use parking_lot::{Mutex, MutexGuard};
use smartforge_core::{Credentials, TransportError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A statement the cluster executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub keyspace: String,
    pub statement: String,
    /// `None` for verbatim execution.
    pub args: Option<StatementArgs>,
}

/// Contact point, login and keyspace of an accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub host: String,
    pub port: u16,
    /// `None` when the connection was not authenticated.
    pub username: Option<String>,
    pub keyspace: String,
}

/// A user type registration the cluster received.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub keyspace: String,
    pub type_name: String,
    pub mapping: UserType,
}

/// Cluster operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Shutdown,
    Execute,
    Register,
}

#[derive(Debug, Default)]
struct State {
    keyspaces: BTreeSet<String>,
    executed: Vec<Executed>,
    registrations: Vec<Registration>,
    connections: Vec<ConnectRequest>,
    shutdowns: usize,
    fail_next: Option<Operation>,
}

impl State {
    fn check(&mut self, op: Operation) -> Result<(), TransportError> {
        if self.fail_next == Some(op) {
            self.fail_next = None;
            return Err(TransportError::new(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

/// Shared in-memory cluster with a fixed set of keyspaces.
#[derive(Debug, Clone, Default)]
pub struct MemoryColumnCluster {
    state: Arc<Mutex<State>>,
}

impl MemoryColumnCluster {
    pub fn with_keyspaces<I, S>(keyspaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cluster = Self::default();
        cluster.state().keyspaces = keyspaces.into_iter().map(Into::into).collect();
        cluster
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    pub fn fail_next(&self, op: Operation) {
        self.state().fail_next = Some(op);
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state().executed.clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.state().registrations.clone()
    }

    pub fn connects(&self) -> usize {
        self.state().connections.len()
    }

    /// Every accepted connection, oldest first.
    pub fn connections(&self) -> Vec<ConnectRequest> {
        self.state().connections.clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.state().shutdowns
    }
}

impl ColumnCluster for MemoryColumnCluster {
    type Session = MemoryColumnSession;

    fn connect(
        &self,
        host: &str,
        port: u16,
        credentials: Option<&Credentials>,
        keyspace: &str,
    ) -> Result<Self::Session, TransportError> {
        let mut state = self.state();
        state.check(Operation::Connect)?;
        if !state.keyspaces.contains(keyspace) {
            return Err(TransportError::new(format!("keyspace {keyspace:?} does not exist")));
        }
        state.connections.push(ConnectRequest {
            host: host.to_string(),
            port,
            username: credentials.map(|c| c.username.clone()),
            keyspace: keyspace.to_string(),
        });
        Ok(MemoryColumnSession {
            state: Arc::clone(&self.state),
            keyspace: keyspace.to_string(),
        })
    }

    fn shutdown(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.check(Operation::Shutdown)?;
        state.shutdowns += 1;
        Ok(())
    }

    fn register_user_type(&self, keyspace: &str, type_name: &str, mapping: &UserType) -> Result<(), TransportError> {
        let mut state = self.state();
        state.check(Operation::Register)?;
        state.registrations.push(Registration {
            keyspace: keyspace.to_string(),
            type_name: type_name.to_string(),
            mapping: mapping.clone(),
        });
        Ok(())
    }
}

/// Session of a [`MemoryColumnCluster`].
#[derive(Debug)]
pub struct MemoryColumnSession {
    state: Arc<Mutex<State>>,
    keyspace: String,
}

impl MemoryColumnSession {
    fn record(&self, statement: &str, args: Option<&StatementArgs>) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.check(Operation::Execute)?;
        state.executed.push(Executed {
            keyspace: self.keyspace.clone(),
            statement: statement.to_string(),
            args: args.cloned(),
        });
        Ok(())
    }
}

impl ColumnSession for MemoryColumnSession {
    fn execute(&self, statement: &str) -> Result<(), TransportError> {
        self.record(statement, None)
    }

    fn execute_bound(&self, statement: &str, args: &StatementArgs) -> Result<(), TransportError> {
        self.record(statement, Some(args))
    }
}
