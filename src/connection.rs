//! Connection state of the platform billing binding.
//!
//! The binding itself lives outside this crate; whoever owns it reports
//! lifecycle events here, and the facade refuses service calls until the
//! state is [`ConnectionState::Ready`].

use std::sync::Mutex;

use crate::error::{KinAppError, Result};

/// Lifecycle state of the billing binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not bound.
    #[default]
    Disconnected,
    /// Bind requested, or the service dropped and may come back.
    Connecting,
    /// Service calls may be made.
    Ready,
}

impl core::fmt::Display for ConnectionState {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match *self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
        })
    }
}

/// Lifecycle events reported by the binding owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    /// The caller asked to bind to the service.
    Bind,
    /// The platform delivered the service handle.
    ServiceConnected,
    /// The platform lost the service (the binding stays alive).
    ServiceDisconnected,
    /// The caller released the binding.
    Unbind,
}

impl ConnectionState {
    /// Returns the state reached by applying `event`.
    ///
    /// Events that make no sense in the current state leave it unchanged.
    #[inline]
    #[must_use]
    pub const fn next(self, event: ConnectionEvent) -> Self {
        match (self, event) {
            (_, ConnectionEvent::Unbind) => Self::Disconnected,
            (Self::Disconnected, ConnectionEvent::Bind) => Self::Connecting,
            (Self::Connecting, ConnectionEvent::ServiceConnected) => Self::Ready,
            (Self::Ready, ConnectionEvent::ServiceDisconnected) => Self::Connecting,
            (state, _) => state,
        }
    }
}

/// Callback notified on every state change.
type Listener = Box<dyn Fn(ConnectionState) + Send + Sync>;

/// Thread-safe connection state machine with change listeners.
#[derive(Default)]
pub struct Connection {
    /// Current state.
    state: Mutex<ConnectionState>,
    /// Registered listeners, called in registration order.
    listeners: Mutex<Vec<Listener>>,
}

impl core::fmt::Debug for Connection {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let listeners = self.listeners.lock().map_or(0, |guard| guard.len());
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("listeners", &listeners)
            .finish()
    }
}

impl Connection {
    /// Creates a disconnected state machine.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::Config`] if the state lock is poisoned.
    #[inline]
    pub fn state(&self) -> Result<ConnectionState> {
        self.state
            .lock()
            .map(|guard| *guard)
            .map_err(|err| lock_error(&err))
    }

    /// Fails with [`KinAppError::NotConnected`] unless the state is ready.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::NotConnected`] or a lock error.
    #[inline]
    pub fn ensure_ready(&self) -> Result<()> {
        match self.state()? {
            ConnectionState::Ready => Ok(()),
            state => Err(KinAppError::NotConnected { state }),
        }
    }

    /// Registers a listener called with the new state after every change.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::Config`] if the listener lock is poisoned.
    #[inline]
    pub fn on_change<F>(&self, listener: F) -> Result<()>
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .map_err(|err| lock_error(&err))?
            .push(Box::new(listener));
        Ok(())
    }

    /// Applies a lifecycle event and notifies listeners if the state
    /// changed. Returns the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::Config`] if a lock is poisoned.
    pub fn apply(&self, event: ConnectionEvent) -> Result<ConnectionState> {
        let (previous, current) = {
            let mut state = self.state.lock().map_err(|err| lock_error(&err))?;
            let previous = *state;
            *state = previous.next(event);
            (previous, *state)
        };
        if previous == current {
            tracing::trace!(?event, state = %current, "connection event ignored");
            return Ok(current);
        }
        tracing::debug!(?event, from = %previous, to = %current, "connection state changed");
        let listeners = self.listeners.lock().map_err(|err| lock_error(&err))?;
        for listener in listeners.iter() {
            listener(current);
        }
        Ok(current)
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> KinAppError {
    KinAppError::Config(format!("connection lock poisoned: {err}"))
}
