//! Test helpers shared by the connector crates.
//!
//! Enable the `testutil` feature in `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! smartforge-core = { workspace = true, features = ["testutil"] }
//! ```

use crate::diagnostics::{Diagnostics, Reporter};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::Level;

/// A diagnostic captured by [`RecordingDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub connector: String,
    pub message: String,
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    records: Arc<Mutex<Vec<Record>>>,
}

impl RecordingDiagnostics {
    /// A reporter for `connector` that records into this sink.
    pub fn reporter(&self, connector: &str) -> Reporter {
        Reporter::new(connector, Arc::new(self.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock()
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.records().iter().filter(|r| r.level == level).count()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, level: Level, connector: &str, message: &str) {
        self.lock().push(Record {
            level,
            connector: connector.to_string(),
            message: message.to_string(),
        });
    }
}
