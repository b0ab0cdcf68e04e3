use smartforge_connector_column::memory::Operation;
use smartforge_connector_column::{ColumnConnector, MemoryColumnCluster, StatementArgs, UserType};
use smartforge_core::testutil::RecordingDiagnostics;
use smartforge_core::{ColumnSettings, ScalarValue, Settings};
use std::sync::Arc;
use tracing::Level;

fn from_settings(toml: &str) -> (ColumnConnector<MemoryColumnCluster>, MemoryColumnCluster, RecordingDiagnostics) {
    let settings: ColumnSettings = Settings::from_toml_str(toml).unwrap().column.unwrap();
    let cluster = MemoryColumnCluster::with_keyspaces(["plant", "archive"]);
    let diagnostics = RecordingDiagnostics::default();
    let connector = ColumnConnector::with_diagnostics(settings, cluster.clone(), Arc::new(diagnostics.clone()));
    (connector, cluster, diagnostics)
}

#[test]
fn session_from_settings_file() {
    let (db, cluster, diagnostics) = from_settings(
        r#"
        [column]
        host = "historian"
        username = "writer"
        password = "secret"
        keyspace = "plant"
        "#,
    );
    assert_eq!(diagnostics.count(Level::WARN), 0);

    db.connect_default().unwrap();
    assert_eq!(db.keyspace().as_deref(), Some("plant"));

    db.register_type("reading", UserType::new().field("value", "double").field("unit", "text"))
        .unwrap();
    db.insert(
        "INSERT INTO readings (sensor, value) VALUES (:sensor, :value)",
        &StatementArgs::new().bind("sensor", "press-1").bind("value", 23.5),
    )
    .unwrap();
    db.insert("TRUNCATE staging", &StatementArgs::new()).unwrap();

    let executed = cluster.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(
        executed[0].args.as_ref().unwrap().get("value"),
        Some(&ScalarValue::Float(23.5))
    );
    assert!(executed[1].args.is_none());
    assert_eq!(cluster.registrations()[0].keyspace, "plant");

    db.disconnect().unwrap();
    assert_eq!(cluster.shutdowns(), 1);
    assert!(db.registered_types().is_empty());
}

#[test]
fn anonymous_connection_warns_once_at_construction() {
    let (_, _, diagnostics) = from_settings("[column]\nhost = \"historian\"\n");
    assert_eq!(diagnostics.count(Level::WARN), 1);
    assert!(diagnostics.contains(Level::WARN, "without authentication"));
}

#[test]
fn failed_shutdown_leaves_session_usable() {
    let (db, cluster, _) = from_settings("[column]\nhost = \"historian\"\nkeyspace = \"archive\"\n");
    db.connect_default().unwrap();
    cluster.fail_next(Operation::Shutdown);

    assert!(db.disconnect().unwrap_err().is_transport());
    assert!(db.is_connected());
    db.insert("INSERT INTO events (id) VALUES (1)", &StatementArgs::new())
        .unwrap();
    assert_eq!(cluster.executed()[0].keyspace, "archive");
}
