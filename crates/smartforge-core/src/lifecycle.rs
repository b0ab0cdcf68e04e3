//! Connection lifecycle shared by every connector.
//!
//! [`Lifecycle`] owns the transport session of a connector. Holding a session
//! means the connector is [`ConnectorState::Connected`]. The session is only
//! installed after the transport reported success and only removed after it
//! closed cleanly, so a failed `connect` or `disconnect` leaves the state as it
//! was before the call.

use crate::diagnostics::Reporter;
use parking_lot::RwLock;
use std::sync::Arc;

/// Connection state of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// No live session; data-plane operations are skipped.
    Disconnected,
    /// A transport session is open.
    Connected,
}

/// Session slot plus the check-then-act discipline around it.
#[derive(Debug)]
pub struct Lifecycle<S> {
    session: RwLock<Option<Arc<S>>>,
    reporter: Reporter,
}

impl<S> Lifecycle<S> {
    /// A disconnected lifecycle reporting through `reporter`.
    pub fn new(reporter: Reporter) -> Self {
        Self {
            session: RwLock::new(None),
            reporter,
        }
    }

    /// Reporter tagged with the owning connector's name.
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Connected exactly while a session is installed.
    pub fn state(&self) -> ConnectorState {
        if self.current().is_some() {
            ConnectorState::Connected
        } else {
            ConnectorState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectorState::Connected
    }

    /// The live session, without reporting anything.
    pub fn current(&self) -> Option<Arc<S>> {
        self.session.read().clone()
    }

    /// The live session for a data-plane operation.
    ///
    /// Reports an error and returns `None` when disconnected; callers return
    /// their empty sentinel in that case.
    pub fn session(&self, operation: &str) -> Option<Arc<S>> {
        let session = self.current();
        if session.is_none() {
            self.reporter.error(format!("not connected, skipping {operation}"));
        }
        session
    }

    /// Whether `connect` should go ahead. Warns when already connected.
    pub fn should_connect(&self) -> bool {
        if self.is_connected() {
            self.reporter.warn("already connected, ignoring connect");
            return false;
        }
        true
    }

    /// The session `disconnect` has to close. Warns when not connected.
    pub fn closing(&self) -> Option<Arc<S>> {
        let session = self.current();
        if session.is_none() {
            self.reporter.warn("not connected, ignoring disconnect");
        }
        session
    }

    /// Record a freshly opened session.
    pub fn establish(&self, session: Arc<S>) {
        *self.session.write() = Some(session);
    }

    /// Forget the session after the transport closed.
    pub fn release(&self) {
        self.session.write().take();
    }

    /// Open a session unless one is already live.
    pub fn connect_with<E>(&self, open: impl FnOnce() -> Result<S, E>) -> Result<(), E> {
        if !self.should_connect() {
            return Ok(());
        }
        let session = open()?;
        self.establish(Arc::new(session));
        Ok(())
    }

    /// Close the live session, if any.
    pub fn disconnect_with<E>(&self, close: impl FnOnce(&S) -> Result<(), E>) -> Result<(), E> {
        let Some(session) = self.closing() else {
            return Ok(());
        };
        close(&session)?;
        self.release();
        Ok(())
    }
}
