//! Backend bridge - named events in, named commands out

pub mod local;

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use local::LocalBridge;

/// Callback invoked with the raw payload of each delivered event
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Errors reported by a bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no handler registered for command {0:?}")]
    CommandNotFound(String),
    #[error("bridge closed")]
    Closed,
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("command {command:?} failed: {message}")]
    CommandFailed { command: String, message: String },
}

/// One-shot handle that removes an event listener
pub struct Unlisten(Box<dyn FnOnce() + Send>);

impl Unlisten {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Remove the listener
    pub fn unlisten(self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Unlisten {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Unlisten")
    }
}

/// Transport between the adapter and the device backend
pub trait Bridge: Send + Sync {
    /// Subscribe `handler` to `event`. The subscription resolves to its unsubscribe handle.
    fn listen(
        &self,
        event: &'static str,
        handler: EventHandler,
    ) -> BoxFuture<'static, Result<Unlisten, BridgeError>>;

    /// Issue a command to the backend. No result payload is returned.
    fn invoke(&self, command: &'static str) -> BoxFuture<'static, Result<(), BridgeError>>;
}
