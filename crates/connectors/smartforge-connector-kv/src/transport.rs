//! Native client boundary for the key/value store.
//!
//! A [`KvBackend`] opens [`KvSession`]s against one logical database, using
//! the address and password from the connector's settings. Sessions speak raw bytes and
//! JSON documents; all typing happens in the connector.

use serde_json::Value;
use smartforge_core::{KvSettings, TransportError};

/// Root of a JSON document in dot-path syntax.
pub const ROOT_PATH: &str = ".";

/// Factory for sessions against a key/value server.
pub trait KvBackend: Send + Sync {
    type Session: KvSession;

    /// Open a session on logical database `database` of the server
    /// addressed by `settings`, authenticating with its password.
    fn open(&self, settings: &KvSettings, database: u8) -> Result<Self::Session, TransportError>;
}

/// An open connection to one logical database.
pub trait KvSession: Send + Sync {
    /// Raw value at `key`, `None` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TransportError>;

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), TransportError>;

    /// Raw values for `keys`, in order, `None` for missing keys.
    fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, TransportError>;

    /// Set all pairs in one round trip.
    fn mset(&self, items: Vec<(String, Vec<u8>)>) -> Result<(), TransportError>;

    /// Store `value` at dot-path `path` of the document at `key`.
    fn json_set(&self, key: &str, path: &str, value: &Value) -> Result<(), TransportError>;

    /// Document fragment at `path`, `None` when the key or path is missing.
    fn json_get(&self, key: &str, path: &str) -> Result<Option<Value>, TransportError>;

    /// Key names matching a glob `pattern`.
    fn keys(&self, pattern: &str) -> Result<Vec<String>, TransportError>;

    fn close(&self) -> Result<(), TransportError>;
}
