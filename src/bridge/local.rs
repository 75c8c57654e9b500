//! In-process bridge
//!
//! Delivers events synchronously to listeners registered in the same process.
//! Used by the replay binary and by tests in place of a real IPC transport.

use super::{Bridge, BridgeError, EventHandler, Unlisten};
use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Handler run when a command is invoked. Receives a handle to the bridge so it can emit events.
pub type CommandHandler =
    Arc<dyn Fn(LocalBridge) -> BoxFuture<'static, Result<(), BridgeError>> + Send + Sync>;

#[derive(Default)]
struct Inner {
    /// Listeners per event name, in registration order
    listeners: Mutex<HashMap<String, Vec<(u64, EventHandler)>>>,
    commands: Mutex<HashMap<String, CommandHandler>>,
    invocations: Mutex<HashMap<String, usize>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Bridge whose backend lives in the same process
#[derive(Clone, Default)]
pub struct LocalBridge {
    inner: Arc<Inner>,
}

impl LocalBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for `command`, replacing any previous one
    pub fn register_command<F>(&self, command: &str, handler: F)
    where
        F: Fn(LocalBridge) -> BoxFuture<'static, Result<(), BridgeError>> + Send + Sync + 'static,
    {
        self.inner
            .commands
            .lock()
            .insert(command.to_string(), Arc::new(handler));
    }

    /// Deliver `payload` to every current listener of `event`.
    /// Returns the number of listeners reached.
    pub fn emit<P: Serialize>(&self, event: &str, payload: P) -> Result<usize, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }
        let payload = serde_json::to_value(payload)?;

        // Snapshot so handlers may listen/unlisten while being called
        let handlers: Vec<EventHandler> = self
            .inner
            .listeners
            .lock()
            .get(event)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        trace!("emit {} to {} listener(s)", event, handlers.len());
        for handler in &handlers {
            handler(payload.clone());
        }
        Ok(handlers.len())
    }

    /// Number of listeners currently subscribed to `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .get(event)
            .map_or(0, |list| list.len())
    }

    /// Number of times `command` has been invoked
    pub fn invocations(&self, command: &str) -> usize {
        self.inner
            .invocations
            .lock()
            .get(command)
            .copied()
            .unwrap_or(0)
    }

    /// Reject further subscriptions, commands and emits
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

fn remove_listener(inner: &Weak<Inner>, event: &str, id: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut listeners = inner.listeners.lock();
    if let Some(list) = listeners.get_mut(event) {
        list.retain(|(lid, _)| *lid != id);
        if list.is_empty() {
            listeners.remove(event);
        }
    }
    debug!("listener {} removed from {}", id, event);
}

impl Bridge for LocalBridge {
    fn listen(
        &self,
        event: &'static str,
        handler: EventHandler,
    ) -> BoxFuture<'static, Result<Unlisten, BridgeError>> {
        if self.is_closed() {
            return future::ready(Err(BridgeError::Closed)).boxed();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        debug!("listener {} added to {}", id, event);

        let weak = Arc::downgrade(&self.inner);
        let unlisten = Unlisten::new(move || remove_listener(&weak, event, id));
        future::ready(Ok(unlisten)).boxed()
    }

    fn invoke(&self, command: &'static str) -> BoxFuture<'static, Result<(), BridgeError>> {
        if self.is_closed() {
            return future::ready(Err(BridgeError::Closed)).boxed();
        }

        *self
            .inner
            .invocations
            .lock()
            .entry(command.to_string())
            .or_insert(0) += 1;

        let handler = self.inner.commands.lock().get(command).cloned();
        match handler {
            Some(handler) => handler(self.clone()),
            None => future::ready(Err(BridgeError::CommandNotFound(command.to_string()))).boxed(),
        }
    }
}
