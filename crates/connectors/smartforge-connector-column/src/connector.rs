//! Guarded column-family connector.

use crate::statement::{Placeholders, StatementArgs, UserType};
use crate::transport::{ColumnCluster, ColumnSession};
use smartforge_core::{
    ColumnSettings, ConnectorError, ConnectorState, Diagnostics, ExclusionPolicy, Lifecycle, Reporter, Result,
    TracingDiagnostics, TransportError,
};
use std::collections::BTreeMap;
use parking_lot::Mutex;
use std::sync::Arc;

const NAME: &str = "ColumnConnector";

/// A live session and what it was opened for.
struct Connection<S> {
    session: S,
    keyspace: String,
    registered: Mutex<BTreeMap<String, UserType>>,
}

/// Connector for a column-family database.
pub struct ColumnConnector<C: ColumnCluster> {
    settings: ColumnSettings,
    cluster: C,
    exclusion: ExclusionPolicy,
    lifecycle: Lifecycle<Connection<C::Session>>,
}

impl<C: ColumnCluster> ColumnConnector<C> {
    pub fn new(settings: ColumnSettings, cluster: C) -> Self {
        Self::with_diagnostics(settings, cluster, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(settings: ColumnSettings, cluster: C, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let reporter = Reporter::new(NAME, diagnostics);
        reporter.info(format!(
            "creating a new {NAME} connecting to {}:{}",
            settings.host, settings.port
        ));
        if settings.credentials().is_none() {
            reporter.warn("no username or password set, connecting without authentication");
        }
        Self {
            exclusion: ExclusionPolicy::new(settings.exclusion),
            settings,
            cluster,
            lifecycle: Lifecycle::new(reporter),
        }
    }

    pub fn settings(&self) -> &ColumnSettings {
        &self.settings
    }

    fn transport_failure(&self, operation: &'static str, err: TransportError) -> ConnectorError {
        self.lifecycle.reporter().error(format!("{operation} failed: {err}"));
        ConnectorError::transport(NAME, operation, err)
    }

    /// Open a session bound to `keyspace`.
    pub fn connect(&self, keyspace: &str) -> Result<()> {
        let _guard = self.exclusion.acquire();
        self.lifecycle
            .connect_with(|| {
                let credentials = self.settings.credentials();
                let session = self.cluster.connect(
                    &self.settings.host,
                    self.settings.port,
                    credentials.as_ref(),
                    keyspace,
                )?;
                Ok::<_, TransportError>(Connection {
                    session,
                    keyspace: keyspace.to_string(),
                    registered: Mutex::default(),
                })
            })
            .map_err(|e| self.transport_failure("connect", e))
    }

    /// Open a session on the keyspace named in the settings.
    ///
    /// Reports an error and stays disconnected when the settings name none.
    pub fn connect_default(&self) -> Result<()> {
        match self.settings.keyspace.clone() {
            Some(keyspace) => self.connect(&keyspace),
            None => {
                self.lifecycle.reporter().error("no keyspace configured, not connecting");
                Ok(())
            }
        }
    }

    /// Shut the cluster down.
    pub fn disconnect(&self) -> Result<()> {
        let _guard = self.exclusion.acquire();
        self.lifecycle
            .disconnect_with(|_| self.cluster.shutdown())
            .map_err(|e| self.transport_failure("disconnect", e))
    }

    pub fn is_connected(&self) -> bool {
        let _guard = self.exclusion.acquire();
        self.lifecycle.is_connected()
    }

    pub fn state(&self) -> ConnectorState {
        let _guard = self.exclusion.acquire();
        self.lifecycle.state()
    }

    /// Keyspace of the live session.
    pub fn keyspace(&self) -> Option<String> {
        let _guard = self.exclusion.acquire();
        self.lifecycle.current().map(|c| c.keyspace.clone())
    }

    /// Execute a statement that returns no rows.
    ///
    /// - bind markers and `args` ⇒ bound execution
    /// - bind markers without `args` ⇒ usage error, nothing executed
    /// - no bind markers ⇒ verbatim execution, `args` ignored
    pub fn insert(&self, statement: &str, args: &StatementArgs) -> Result<()> {
        let _guard = self.exclusion.acquire();
        let Some(conn) = self.lifecycle.session("insert") else {
            return Ok(());
        };

        let placeholders = Placeholders::scan(statement);
        let result = if placeholders.is_empty() {
            conn.session.execute(statement)
        } else if args.is_empty() {
            self.lifecycle
                .reporter()
                .warn(format!("statement {statement:?} expects arguments that were not given"));
            return Ok(());
        } else {
            conn.session.execute_bound(statement, args)
        };
        result.map_err(|e| self.transport_failure("insert", e))
    }

    /// Associate `mapping` with the user-defined type `type_name` in the
    /// keyspace passed to [`connect`](Self::connect).
    pub fn register_type(&self, type_name: &str, mapping: UserType) -> Result<()> {
        let _guard = self.exclusion.acquire();
        let Some(conn) = self.lifecycle.session("register_type") else {
            return Ok(());
        };
        self.cluster
            .register_user_type(&conn.keyspace, type_name, &mapping)
            .map_err(|e| self.transport_failure("register_type", e))?;
        conn.registered.lock().insert(type_name.to_string(), mapping);
        Ok(())
    }

    /// User types registered on the live session.
    pub fn registered_types(&self) -> Vec<String> {
        let _guard = self.exclusion.acquire();
        self.lifecycle
            .current()
            .map(|c| c.registered.lock().keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl<C: ColumnCluster> std::fmt::Debug for ColumnConnector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnConnector")
            .field("host", &self.settings.host)
            .field("port", &self.settings.port)
            .field("exclusion", &self.exclusion.mode())
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ConnectRequest, Executed, MemoryColumnCluster, Operation};
    use smartforge_core::testutil::RecordingDiagnostics;
    use tracing::Level;

    fn connector() -> (ColumnConnector<MemoryColumnCluster>, MemoryColumnCluster, RecordingDiagnostics) {
        let cluster = MemoryColumnCluster::with_keyspaces(["forge"]);
        let diagnostics = RecordingDiagnostics::default();
        let mut settings = ColumnSettings::new("cassandra");
        settings.username = "forge".into();
        settings.password = "secret".into();
        let connector = ColumnConnector::with_diagnostics(settings, cluster.clone(), Arc::new(diagnostics.clone()));
        (connector, cluster, diagnostics)
    }

    #[test]
    fn missing_credentials_warn_at_construction() {
        let diagnostics = RecordingDiagnostics::default();
        let _ = ColumnConnector::with_diagnostics(
            ColumnSettings::new("cassandra"),
            MemoryColumnCluster::default(),
            Arc::new(diagnostics.clone()),
        );
        assert!(diagnostics.contains(Level::WARN, "without authentication"));
    }

    #[test]
    fn cluster_receives_contact_point_and_login() {
        let (col, cluster, _) = connector();
        col.connect("forge").unwrap();
        assert_eq!(
            cluster.connections(),
            vec![ConnectRequest {
                host: "cassandra".into(),
                port: 9042,
                username: Some("forge".into()),
                keyspace: "forge".into(),
            }]
        );
    }

    #[test]
    fn anonymous_login_passes_no_credentials() {
        let cluster = MemoryColumnCluster::with_keyspaces(["forge"]);
        let col = ColumnConnector::with_diagnostics(
            ColumnSettings::new("cassandra"),
            cluster.clone(),
            Arc::new(RecordingDiagnostics::default()),
        );
        col.connect("forge").unwrap();
        assert_eq!(cluster.connections()[0].username, None);
    }

    #[test]
    fn bound_execution_with_args() {
        let (col, cluster, _) = connector();
        col.connect("forge").unwrap();
        let args = StatementArgs::new().bind("id", 1).bind("temp", 21.5);
        col.insert("INSERT INTO readings (id, temp) VALUES (:id, :temp)", &args).unwrap();

        assert_eq!(
            cluster.executed(),
            vec![Executed {
                keyspace: "forge".into(),
                statement: "INSERT INTO readings (id, temp) VALUES (:id, :temp)".into(),
                args: Some(args),
            }]
        );
    }

    #[test]
    fn markers_without_args_execute_nothing() {
        let (col, cluster, diagnostics) = connector();
        col.connect("forge").unwrap();
        col.insert("INSERT INTO readings (id) VALUES (?)", &StatementArgs::new()).unwrap();

        assert!(cluster.executed().is_empty());
        assert!(diagnostics.contains(Level::WARN, "expects arguments"));
    }

    #[test]
    fn verbatim_statement_ignores_args() {
        let (col, cluster, _) = connector();
        col.connect("forge").unwrap();
        col.insert("TRUNCATE readings", &StatementArgs::new().bind("unused", 1)).unwrap();
        assert_eq!(cluster.executed()[0].args, None);
    }

    #[test]
    fn register_type_is_scoped_to_keyspace() {
        let (col, cluster, _) = connector();
        col.register_type("reading", UserType::new().field("value", "double")).unwrap();
        assert!(cluster.registrations().is_empty());

        col.connect("forge").unwrap();
        col.register_type("reading", UserType::new().field("value", "double")).unwrap();
        let registrations = cluster.registrations();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].keyspace, "forge");
        assert_eq!(col.registered_types(), vec!["reading".to_string()]);
    }

    #[test]
    fn disconnected_insert_never_reaches_cluster() {
        let (col, cluster, diagnostics) = connector();
        col.insert("TRUNCATE readings", &StatementArgs::new()).unwrap();
        assert!(cluster.executed().is_empty());
        assert!(diagnostics.contains(Level::ERROR, "not connected"));
    }

    #[test]
    fn lifecycle_and_failures() {
        let (col, cluster, diagnostics) = connector();
        assert!(col.connect("missing").unwrap_err().is_transport());
        assert!(!col.is_connected());

        col.connect("forge").unwrap();
        col.connect("forge").unwrap();
        assert_eq!(cluster.connects(), 1);
        assert_eq!(diagnostics.count(Level::WARN), 1);
        assert_eq!(col.keyspace().as_deref(), Some("forge"));

        cluster.fail_next(Operation::Shutdown);
        assert!(col.disconnect().is_err());
        assert!(col.is_connected());

        col.disconnect().unwrap();
        assert_eq!(col.state(), ConnectorState::Disconnected);
        assert_eq!(col.keyspace(), None);
        assert_eq!(cluster.shutdowns(), 1);
    }

    #[test]
    fn connect_default_uses_settings() {
        let cluster = MemoryColumnCluster::with_keyspaces(["forge"]);
        let mut settings = ColumnSettings::new("cassandra");
        settings.keyspace = Some("forge".into());
        let col = ColumnConnector::new(settings, cluster);
        col.connect_default().unwrap();
        assert_eq!(col.keyspace().as_deref(), Some("forge"));
    }
}
