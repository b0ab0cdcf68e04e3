//! Guarded key/value connector.

use crate::transport::{KvBackend, KvSession, ROOT_PATH};
use serde_json::Value;
use smartforge_core::marshal::{decode_kv, encode_kv};
use smartforge_core::{
    ConnectorError, ConnectorState, DataType, Diagnostics, ExclusionPolicy, KvSettings, Lifecycle, Reporter, Result,
    ScalarValue, TransportError, TracingDiagnostics,
};
use std::sync::Arc;

const NAME: &str = "KvConnector";

/// Connector for a key/value and document store.
///
/// All operations take `&self` and run under the exclusion policy selected by
/// [`KvSettings::exclusion`]. While disconnected, data-plane operations report
/// an error and return their empty sentinel: `Ok(None)` for reads and `Ok(())`
/// for writes.
pub struct KvConnector<B: KvBackend> {
    settings: KvSettings,
    backend: B,
    exclusion: ExclusionPolicy,
    lifecycle: Lifecycle<B::Session>,
}

impl<B: KvBackend> KvConnector<B> {
    /// Create a connector that reports through `tracing`.
    pub fn new(settings: KvSettings, backend: B) -> Self {
        Self::with_diagnostics(settings, backend, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(settings: KvSettings, backend: B, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let reporter = Reporter::new(NAME, diagnostics);
        reporter.info(format!(
            "creating a new {NAME} connecting to {}:{}",
            settings.host, settings.port
        ));
        Self {
            exclusion: ExclusionPolicy::new(settings.exclusion),
            settings,
            backend,
            lifecycle: Lifecycle::new(reporter),
        }
    }

    pub fn settings(&self) -> &KvSettings {
        &self.settings
    }

    fn reporter(&self) -> &Reporter {
        self.lifecycle.reporter()
    }

    fn transport_failure(&self, operation: &'static str, err: TransportError) -> ConnectorError {
        self.reporter().error(format!("{operation} failed: {err}"));
        ConnectorError::transport(NAME, operation, err)
    }

    /// Open a session on logical database `database`.
    pub fn connect(&self, database: u8) -> Result<()> {
        let _guard = self.exclusion.acquire();
        self.lifecycle
            .connect_with(|| self.backend.open(&self.settings, database))
            .map_err(|e| self.transport_failure("connect", e))
    }

    /// Open a session on the database named in the settings.
    pub fn connect_default(&self) -> Result<()> {
        self.connect(self.settings.database)
    }

    pub fn disconnect(&self) -> Result<()> {
        let _guard = self.exclusion.acquire();
        self.lifecycle
            .disconnect_with(|session| session.close())
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

    /// Store a scalar. Booleans are stored as the text `True`/`False`.
    pub fn set(&self, key: &str, value: impl Into<ScalarValue>) -> Result<()> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("set") else {
            return Ok(());
        };
        session
            .set(key, encode_kv(&value.into()))
            .map_err(|e| self.transport_failure("set", e))
    }

    /// Read a scalar and decode it as `data_type`.
    ///
    /// Returns `Ok(None)` when the key does not exist or the connector is
    /// disconnected. A stored value that does not parse as `data_type` is a
    /// [`ConnectorError::Conversion`].
    pub fn get(&self, key: &str, data_type: DataType) -> Result<Option<ScalarValue>> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("get") else {
            return Ok(None);
        };
        let raw = session.get(key).map_err(|e| self.transport_failure("get", e))?;
        decode_kv(raw, data_type).map_err(|e| ConnectorError::conversion(NAME, key, e))
    }

    /// Store several scalars in one round trip.
    ///
    /// `keys` and `values` must have the same length; otherwise nothing is
    /// written and a usage error is reported.
    pub fn multiple_set<K: AsRef<str>>(&self, keys: &[K], values: &[ScalarValue]) -> Result<()> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("multiple_set") else {
            return Ok(());
        };
        if keys.len() != values.len() {
            self.reporter().error(format!(
                "multiple_set: got {} keys but {} values, nothing written",
                keys.len(),
                values.len()
            ));
            return Ok(());
        }
        if keys.is_empty() {
            return Ok(());
        }

        let items = keys
            .iter()
            .zip(values)
            .map(|(key, value)| (key.as_ref().to_string(), encode_kv(value)))
            .collect();
        session
            .mset(items)
            .map_err(|e| self.transport_failure("multiple_set", e))
    }

    /// Read several scalars, each decoded by its declared type.
    ///
    /// The returned vector always has one entry per key. `Ok(None)` means the
    /// read was skipped, either because the connector is disconnected or
    /// because `keys` and `data_types` differ in length.
    pub fn multiple_get<K: AsRef<str>>(
        &self,
        keys: &[K],
        data_types: &[DataType],
    ) -> Result<Option<Vec<Option<ScalarValue>>>> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("multiple_get") else {
            return Ok(None);
        };
        if keys.len() != data_types.len() {
            self.reporter().error(format!(
                "multiple_get: got {} keys but {} data types, nothing read",
                keys.len(),
                data_types.len()
            ));
            return Ok(None);
        }
        if keys.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let names: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let raws = session
            .mget(&names)
            .map_err(|e| self.transport_failure("multiple_get", e))?;

        names
            .iter()
            .zip(raws)
            .zip(data_types)
            .map(|((key, raw), data_type)| {
                decode_kv(raw, *data_type).map_err(|e| ConnectorError::conversion(NAME, key, e))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Store a whole document at `key`.
    pub fn json_set(&self, key: &str, value: &Value) -> Result<()> {
        self.json_set_at(key, ROOT_PATH, value)
    }

    /// Store `value` at dot-path `path` inside the document at `key`.
    pub fn json_set_at(&self, key: &str, path: &str, value: &Value) -> Result<()> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("json_set") else {
            return Ok(());
        };
        session
            .json_set(key, path, value)
            .map_err(|e| self.transport_failure("json_set", e))
    }

    /// The whole document at `key`.
    pub fn json_get(&self, key: &str) -> Result<Option<Value>> {
        self.json_get_at(key, ROOT_PATH)
    }

    pub fn json_get_at(&self, key: &str, path: &str) -> Result<Option<Value>> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("json_get") else {
            return Ok(None);
        };
        session
            .json_get(key, path)
            .map_err(|e| self.transport_failure("json_get", e))
    }

    /// Every key in the current database.
    pub fn keys(&self) -> Result<Option<Vec<String>>> {
        self.keys_matching("*")
    }

    /// Keys matching glob `pattern`.
    pub fn keys_matching(&self, pattern: &str) -> Result<Option<Vec<String>>> {
        let _guard = self.exclusion.acquire();
        let Some(session) = self.lifecycle.session("keys") else {
            return Ok(None);
        };
        session
            .keys(pattern)
            .map(Some)
            .map_err(|e| self.transport_failure("keys", e))
    }
}

impl<B: KvBackend> std::fmt::Debug for KvConnector<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvConnector")
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
    use crate::memory::{MemoryKvBackend, OpenRequest, Operation};
    use serde_json::json;
    use smartforge_core::testutil::RecordingDiagnostics;
    use tracing::Level;

    fn connector() -> (KvConnector<MemoryKvBackend>, MemoryKvBackend, RecordingDiagnostics) {
        let backend = MemoryKvBackend::new();
        let diagnostics = RecordingDiagnostics::default();
        let connector = KvConnector::with_diagnostics(
            KvSettings::new("localhost"),
            backend.clone(),
            Arc::new(diagnostics.clone()),
        );
        (connector, backend, diagnostics)
    }

    #[test]
    fn backend_receives_address_and_credentials() {
        let backend = MemoryKvBackend::new();
        let mut settings = KvSettings::new("cache.plant.local");
        settings.port = 6380;
        settings.password = "hunter2".into();
        settings.database = 3;
        let kv = KvConnector::with_diagnostics(settings, backend.clone(), Arc::new(RecordingDiagnostics::default()));

        kv.connect_default().unwrap();
        kv.set("k", 1).unwrap();

        assert_eq!(
            backend.opened(),
            vec![OpenRequest {
                host: "cache.plant.local".into(),
                port: 6380,
                password: "hunter2".into(),
                database: 3,
            }]
        );
        assert_eq!(backend.raw(3, "k"), Some(b"1".to_vec()));
        assert_eq!(backend.raw(0, "k"), None);
    }

    #[test]
    fn boolean_round_trip() {
        let (kv, backend, _) = connector();
        kv.connect(0).unwrap();
        kv.set("flag", true).unwrap();

        assert_eq!(backend.raw(0, "flag"), Some(b"True".to_vec()));
        assert_eq!(kv.get("flag", DataType::Boolean).unwrap(), Some(ScalarValue::Boolean(true)));
        assert_eq!(
            kv.get("flag", DataType::Byte).unwrap(),
            Some(ScalarValue::Bytes(b"True".to_vec()))
        );
    }

    #[test]
    fn get_absent_key_is_none() {
        let (kv, _, _) = connector();
        kv.connect(0).unwrap();
        assert_eq!(kv.get("missing", DataType::Integer).unwrap(), None);
    }

    #[test]
    fn empty_value_is_not_absent() {
        let (kv, backend, _) = connector();
        backend.insert_raw(0, "empty", Vec::new());
        kv.connect(0).unwrap();

        assert_eq!(kv.get("empty", DataType::String).unwrap(), Some(ScalarValue::String(String::new())));
        assert!(kv.get("empty", DataType::Integer).unwrap_err().is_conversion());
    }

    #[test]
    fn conversion_errors_propagate() {
        let (kv, _, _) = connector();
        kv.connect(0).unwrap();
        kv.set("temp", "warm").unwrap();
        let err = kv.get("temp", DataType::Float).unwrap_err();
        assert!(err.is_conversion());
        assert!(err.to_string().contains("temp"));
    }

    #[test]
    fn single_key_batch_still_returns_a_vector() {
        let (kv, _, _) = connector();
        kv.connect(0).unwrap();
        kv.multiple_set(&["a"], &[ScalarValue::Integer(5)]).unwrap();
        assert_eq!(
            kv.multiple_get(&["a"], &[DataType::Integer]).unwrap(),
            Some(vec![Some(ScalarValue::Integer(5))])
        );
    }

    #[test]
    fn batch_round_trip_keeps_order() {
        let (kv, _, _) = connector();
        kv.connect(0).unwrap();
        kv.multiple_set(
            &["b", "i", "f", "s"],
            &[
                ScalarValue::Boolean(false),
                ScalarValue::Integer(-3),
                ScalarValue::Float(0.25),
                ScalarValue::from("text"),
            ],
        )
        .unwrap();

        let values = kv
            .multiple_get(
                &["s", "missing", "f", "i", "b"],
                &[DataType::String, DataType::Integer, DataType::Float, DataType::Integer, DataType::Boolean],
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            values,
            vec![
                Some(ScalarValue::from("text")),
                None,
                Some(ScalarValue::Float(0.25)),
                Some(ScalarValue::Integer(-3)),
                Some(ScalarValue::Boolean(false)),
            ]
        );
    }

    #[test]
    fn mismatched_batches_touch_nothing() {
        let (kv, backend, diagnostics) = connector();
        kv.connect(0).unwrap();
        let before = backend.stats();

        kv.multiple_set(&["a", "b"], &[ScalarValue::Integer(1)]).unwrap();
        assert_eq!(kv.multiple_get(&["a"], &[DataType::Integer, DataType::String]).unwrap(), None);

        assert_eq!(backend.stats(), before);
        assert!(backend.is_empty(0));
        assert_eq!(diagnostics.count(Level::ERROR), 2);
    }

    #[test]
    fn disconnected_operations_return_sentinels() {
        let (kv, backend, diagnostics) = connector();

        kv.set("k", 1).unwrap();
        assert_eq!(kv.get("k", DataType::Integer).unwrap(), None);
        kv.multiple_set(&["k"], &[ScalarValue::Integer(1)]).unwrap();
        assert_eq!(kv.multiple_get(&["k"], &[DataType::Integer]).unwrap(), None);
        kv.json_set("doc", &json!({})).unwrap();
        assert_eq!(kv.json_get("doc").unwrap(), None);
        assert_eq!(kv.keys().unwrap(), None);

        assert_eq!(backend.stats(), Default::default());
        assert_eq!(diagnostics.count(Level::ERROR), 7);
    }

    #[test]
    fn connect_is_idempotent() {
        let (kv, backend, diagnostics) = connector();
        kv.connect(0).unwrap();
        kv.connect(0).unwrap();

        assert!(kv.is_connected());
        assert_eq!(backend.stats().opens, 1);
        assert_eq!(diagnostics.count(Level::WARN), 1);
    }

    #[test]
    fn failed_connect_leaves_disconnected() {
        let (kv, backend, diagnostics) = connector();
        backend.fail_next(Operation::Open);

        let err = kv.connect(0).unwrap_err();
        assert!(err.is_transport());
        assert!(!kv.is_connected());
        assert!(diagnostics.contains(Level::ERROR, "connect failed"));

        kv.connect(0).unwrap();
        assert!(kv.is_connected());
    }

    #[test]
    fn failed_disconnect_stays_connected() {
        let (kv, backend, _) = connector();
        kv.connect(0).unwrap();
        backend.fail_next(Operation::Close);

        assert!(kv.disconnect().is_err());
        assert_eq!(kv.state(), ConnectorState::Connected);

        kv.disconnect().unwrap();
        assert_eq!(kv.state(), ConnectorState::Disconnected);
    }

    #[test]
    fn disconnect_twice_warns() {
        let (kv, backend, diagnostics) = connector();
        kv.connect(0).unwrap();
        kv.disconnect().unwrap();
        kv.disconnect().unwrap();
        assert_eq!(backend.stats().closes, 1);
        assert_eq!(diagnostics.count(Level::WARN), 1);
    }

    #[test]
    fn transport_errors_propagate_and_keep_connection() {
        let (kv, backend, _) = connector();
        kv.connect(0).unwrap();
        backend.fail_next(Operation::Write);

        assert!(kv.set("k", 1).unwrap_err().is_transport());
        assert!(kv.is_connected());
        kv.set("k", 1).unwrap();
    }

    #[test]
    fn documents_and_keys() {
        let (kv, _, _) = connector();
        kv.connect(3).unwrap();
        kv.json_set("hosts", &json!({"plc": "10.0.0.2"})).unwrap();
        kv.json_set_at("hosts", ".historian", &json!("10.0.0.3")).unwrap();
        kv.set("counter", 1).unwrap();

        assert_eq!(kv.json_get_at("hosts", ".plc").unwrap(), Some(json!("10.0.0.2")));
        assert_eq!(
            kv.json_get("hosts").unwrap(),
            Some(json!({"plc": "10.0.0.2", "historian": "10.0.0.3"}))
        );
        assert_eq!(kv.keys().unwrap(), Some(vec!["counter".to_string(), "hosts".to_string()]));
        assert_eq!(kv.keys_matching("h*").unwrap(), Some(vec!["hosts".to_string()]));
    }
}
