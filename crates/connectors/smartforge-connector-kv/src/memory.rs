//! In-memory key/value backend.
//!
//! [`MemoryKvBackend`] behaves like a small key/value server: numbered logical
//! databases, raw byte values, JSON documents addressed by dot-path and glob
//! key enumeration. Sessions opened from the same backend share its data.
//! Every transport call is counted and a single failure can be injected, which
//! makes it the backend of choice for development and tests.

use crate::transport::{KvBackend, KvSession};
use serde_json::{Map, Value};
use parking_lot::{Mutex, MutexGuard};
use smartforge_core::{KvSettings, TransportError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Transport call categories, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Close,
    Read,
    Write,
}

/// What a session was opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub database: u8,
}

/// Snapshot of transport call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KvStats {
    pub opens: usize,
    pub closes: usize,
    pub reads: usize,
    pub writes: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Bytes(Vec<u8>),
    Json(Value),
}

type Database = BTreeMap<String, Entry>;

#[derive(Debug, Default)]
struct Shared {
    databases: Mutex<HashMap<u8, Database>>,
    fail_next: Mutex<Option<Operation>>,
    opened: Mutex<Vec<OpenRequest>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl Shared {
    fn databases(&self) -> MutexGuard<'_, HashMap<u8, Database>> {
        self.databases.lock()
    }

    fn record(&self, op: Operation) -> Result<(), TransportError> {
        let counter = match op {
            Operation::Open => &self.opens,
            Operation::Close => &self.closes,
            Operation::Read => &self.reads,
            Operation::Write => &self.writes,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let mut fail = self.fail_next.lock();
        if *fail == Some(op) {
            *fail = None;
            return Err(TransportError::new(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

/// Shared in-memory key/value server.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvBackend {
    shared: Arc<Shared>,
}

impl MemoryKvBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next transport call of kind `op` fail.
    pub fn fail_next(&self, op: Operation) {
        *self.shared.fail_next.lock() = Some(op);
    }

    pub fn stats(&self) -> KvStats {
        KvStats {
            opens: self.shared.opens.load(Ordering::SeqCst),
            closes: self.shared.closes.load(Ordering::SeqCst),
            reads: self.shared.reads.load(Ordering::SeqCst),
            writes: self.shared.writes.load(Ordering::SeqCst),
        }
    }

    /// Every successful `open`, oldest first.
    pub fn opened(&self) -> Vec<OpenRequest> {
        self.shared.opened.lock().clone()
    }

    /// Seed a raw value without going through a session.
    pub fn insert_raw(&self, database: u8, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.shared
            .databases()
            .entry(database)
            .or_default()
            .insert(key.into(), Entry::Bytes(value.into()));
    }

    /// Seed a JSON document without going through a session.
    pub fn insert_json(&self, database: u8, key: impl Into<String>, value: Value) {
        self.shared
            .databases()
            .entry(database)
            .or_default()
            .insert(key.into(), Entry::Json(value));
    }

    /// Raw bytes stored at `key`, if it holds a plain value.
    pub fn raw(&self, database: u8, key: &str) -> Option<Vec<u8>> {
        match self.shared.databases().get(&database)?.get(key)? {
            Entry::Bytes(bytes) => Some(bytes.clone()),
            Entry::Json(_) => None,
        }
    }

    pub fn len(&self, database: u8) -> usize {
        self.shared.databases().get(&database).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, database: u8) -> bool {
        self.len(database) == 0
    }
}

impl KvBackend for MemoryKvBackend {
    type Session = MemoryKvSession;

    fn open(&self, settings: &KvSettings, database: u8) -> Result<Self::Session, TransportError> {
        self.shared.record(Operation::Open)?;
        self.shared.opened.lock().push(OpenRequest {
            host: settings.host.clone(),
            port: settings.port,
            password: settings.password.clone(),
            database,
        });
        Ok(MemoryKvSession {
            shared: Arc::clone(&self.shared),
            database,
            closed: AtomicBool::new(false),
        })
    }
}

/// Session on one database of a [`MemoryKvBackend`].
#[derive(Debug)]
pub struct MemoryKvSession {
    shared: Arc<Shared>,
    database: u8,
    closed: AtomicBool,
}

impl MemoryKvSession {
    fn begin(&self, op: Operation) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::new("connection closed"));
        }
        self.shared.record(op)
    }

    fn with_db<T>(&self, f: impl FnOnce(&mut Database) -> T) -> T {
        let mut databases = self.shared.databases();
        f(databases.entry(self.database).or_default())
    }
}

fn wrong_type(key: &str) -> TransportError {
    TransportError::new(format!("WRONGTYPE operation against key {key:?} holding the wrong kind of value"))
}

fn read_bytes(db: &Database, key: &str) -> Result<Option<Vec<u8>>, TransportError> {
    match db.get(key) {
        None => Ok(None),
        Some(Entry::Bytes(bytes)) => Ok(Some(bytes.clone())),
        Some(Entry::Json(_)) => Err(wrong_type(key)),
    }
}

impl KvSession for MemoryKvSession {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TransportError> {
        self.begin(Operation::Read)?;
        self.with_db(|db| read_bytes(db, key))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), TransportError> {
        self.begin(Operation::Write)?;
        self.with_db(|db| db.insert(key.to_string(), Entry::Bytes(value)));
        Ok(())
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, TransportError> {
        self.begin(Operation::Read)?;
        // MGET reports non-string keys as missing instead of failing.
        self.with_db(|db| Ok(keys.iter().map(|key| read_bytes(db, key).ok().flatten()).collect()))
    }

    fn mset(&self, items: Vec<(String, Vec<u8>)>) -> Result<(), TransportError> {
        self.begin(Operation::Write)?;
        self.with_db(|db| {
            for (key, value) in items {
                db.insert(key, Entry::Bytes(value));
            }
        });
        Ok(())
    }

    fn json_set(&self, key: &str, path: &str, value: &Value) -> Result<(), TransportError> {
        let segments = parse_path(path)?;
        self.begin(Operation::Write)?;
        self.with_db(|db| {
            let Some((last, parents)) = segments.split_last() else {
                if let Some(Entry::Bytes(_)) = db.get(key) {
                    return Err(wrong_type(key));
                }
                db.insert(key.to_string(), Entry::Json(value.clone()));
                return Ok(());
            };

            let doc = match db.get_mut(key) {
                Some(Entry::Json(doc)) => doc,
                Some(Entry::Bytes(_)) => return Err(wrong_type(key)),
                None => {
                    return Err(TransportError::new(format!(
                        "new document {key:?} must be created at the root path"
                    )));
                }
            };
            let mut current = doc;
            for segment in parents {
                current = current
                    .get_mut(*segment)
                    .ok_or_else(|| TransportError::new(format!("path {path:?} does not exist in {key:?}")))?;
            }
            let object: &mut Map<String, Value> = current
                .as_object_mut()
                .ok_or_else(|| TransportError::new(format!("path {path:?} does not address an object member")))?;
            object.insert((*last).to_string(), value.clone());
            Ok(())
        })
    }

    fn json_get(&self, key: &str, path: &str) -> Result<Option<Value>, TransportError> {
        let segments = parse_path(path)?;
        self.begin(Operation::Read)?;
        self.with_db(|db| {
            let doc = match db.get(key) {
                None => return Ok(None),
                Some(Entry::Json(doc)) => doc,
                Some(Entry::Bytes(_)) => return Err(wrong_type(key)),
            };
            let found = segments
                .iter()
                .try_fold(doc, |current, segment| current.get(*segment));
            Ok(found.cloned())
        })
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, TransportError> {
        self.begin(Operation::Read)?;
        let pattern: Vec<char> = pattern.chars().collect();
        self.with_db(|db| {
            Ok(db
                .keys()
                .filter(|key| glob_match(&pattern, &key.chars().collect::<Vec<_>>()))
                .cloned()
                .collect())
        })
    }

    fn close(&self) -> Result<(), TransportError> {
        self.begin(Operation::Close)?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Split a dot-path into member names. `.` is the document root.
fn parse_path(path: &str) -> Result<Vec<&str>, TransportError> {
    let invalid = || TransportError::new(format!("invalid document path {path:?}"));
    let rest = path.strip_prefix('.').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = rest.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid());
    }
    Ok(segments)
}

/// Glob matching with `*` (any run) and `?` (one character).
///
/// Backtracks only to the most recent `*`, so matching is linear in
/// `pattern.len() * text.len()` at worst.
fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}
