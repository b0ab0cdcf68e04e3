//! Exclusion policies.
//!
//! A connector picks its policy once, at construction. In protected mode every
//! public operation holds the policy's mutex for its whole duration; in
//! unprotected mode acquisition is a no-op and the caller is responsible for
//! not racing `disconnect` against in-flight operations.

use serde::{Deserialize, Serialize};
use parking_lot::{Mutex, MutexGuard};

/// How a connector serializes its public operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionMode {
    /// Every public operation runs under the connector's mutex.
    #[default]
    Protected,
    /// Operations run concurrently; the caller coordinates.
    Unprotected,
}

/// Exclusion policy for connectors with blocking operations.
#[derive(Debug)]
pub struct ExclusionPolicy {
    lock: Option<Mutex<()>>,
}

impl ExclusionPolicy {
    /// Policy for `mode`, fixed for the connector's lifetime.
    pub fn new(mode: ExclusionMode) -> Self {
        match mode {
            ExclusionMode::Protected => Self::protected(),
            ExclusionMode::Unprotected => Self::unprotected(),
        }
    }

    pub fn protected() -> Self {
        Self {
            lock: Some(Mutex::new(())),
        }
    }

    /// Acquisition never blocks.
    pub fn unprotected() -> Self {
        Self { lock: None }
    }

    pub fn mode(&self) -> ExclusionMode {
        if self.lock.is_some() {
            ExclusionMode::Protected
        } else {
            ExclusionMode::Unprotected
        }
    }

    /// Enter the exclusive region. The region is left when the guard drops.
    pub fn acquire(&self) -> ExclusionGuard<'_> {
        ExclusionGuard {
            _held: self.lock.as_ref().map(|lock| lock.lock()),
        }
    }
}

/// Scoped hold on an [`ExclusionPolicy`].
#[must_use = "the exclusive region ends as soon as the guard is dropped"]
pub struct ExclusionGuard<'a> {
    _held: Option<MutexGuard<'a, ()>>,
}

/// Exclusion policy for async connectors; the guard may be held across `.await`.
#[derive(Debug)]
pub struct AsyncExclusionPolicy {
    lock: Option<tokio::sync::Mutex<()>>,
}

impl AsyncExclusionPolicy {
    pub fn new(mode: ExclusionMode) -> Self {
        match mode {
            ExclusionMode::Protected => Self {
                lock: Some(tokio::sync::Mutex::new(())),
            },
            ExclusionMode::Unprotected => Self { lock: None },
        }
    }

    pub fn mode(&self) -> ExclusionMode {
        if self.lock.is_some() {
            ExclusionMode::Protected
        } else {
            ExclusionMode::Unprotected
        }
    }

    /// Wait for the exclusive region without blocking the executor.
    pub async fn acquire(&self) -> AsyncExclusionGuard<'_> {
        let held = match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        AsyncExclusionGuard { _held: held }
    }
}

/// Scoped hold on an [`AsyncExclusionPolicy`].
#[must_use = "the exclusive region ends as soon as the guard is dropped"]
pub struct AsyncExclusionGuard<'a> {
    _held: Option<tokio::sync::MutexGuard<'a, ()>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn protected_serializes_holders() {
        let policy = Arc::new(ExclusionPolicy::protected());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let policy = Arc::clone(&policy);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let _guard = policy.acquire();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_is_released_after_panic() {
        let policy = Arc::new(ExclusionPolicy::protected());
        let clone = Arc::clone(&policy);
        let result = thread::spawn(move || {
            let _guard = clone.acquire();
            panic!("operation failed");
        })
        .join();
        assert!(result.is_err());
        let _guard = policy.acquire();
    }

    #[test]
    fn unprotected_never_blocks() {
        let policy = ExclusionPolicy::unprotected();
        let _a = policy.acquire();
        let _b = policy.acquire();
        assert_eq!(policy.mode(), ExclusionMode::Unprotected);
    }

    #[tokio::test]
    async fn async_guard_released_on_drop() {
        let policy = AsyncExclusionPolicy::new(ExclusionMode::Protected);
        {
            let _guard = policy.acquire().await;
        }
        let _again = policy.acquire().await;
        assert_eq!(policy.mode(), ExclusionMode::Protected);
    }
}
