//! Device state adapter
//!
//! Mirrors the backend's device events into observable stores:
//!
//! - [`provide_context`] creates the stores on a view-tree root scope
//! - [`get_context`] hands read-only views of them to descendant views
//! - [`start_listening`] subscribes to the five device events, asks the
//!   backend to start monitoring and returns a guard that releases the
//!   subscriptions when the owning view goes away
//!
//! The adapter is the only writer. A `device_status` of `false` resets every
//! record to its empty default before `connected` drops, so no stale device
//! data is observable while disconnected.

use super::context::{ContextError, ContextScope};
use super::events::{DeviceEvent, CHECK_DEVICE, DEVICE_EVENTS};
use super::state::{Battery, Hardware, Os, Storage};
use super::store::{Store, StoreReader};
use crate::bridge::{Bridge, BridgeError, EventHandler, Unlisten};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Key the device stores are registered under
pub const DEVICE_CONTEXT_KEY: &str = "device";

/// Errors returned by [`start_listening`]
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("start_listening must be called from within a tokio runtime")]
    NoRuntime,
}

/// Writer side of the device stores. Only the adapter holds this.
#[derive(Clone, Default)]
struct DeviceStores {
    hardware: Store<Hardware>,
    battery: Store<Battery>,
    os: Store<Os>,
    storage: Store<Storage>,
    connected: Store<bool>,
}

impl DeviceStores {
    fn context(&self) -> DeviceContext {
        DeviceContext {
            hardware: self.hardware.reader(),
            battery: self.battery.reader(),
            os: self.os.reader(),
            storage: self.storage.reader(),
            connected: self.connected.reader(),
        }
    }

    fn apply(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Hardware(hardware) => self.hardware.set(hardware),
            DeviceEvent::Battery(battery) => self.battery.set(battery),
            DeviceEvent::Os(os) => self.os.set(os),
            DeviceEvent::Storage(storage) => self.storage.set(storage),
            DeviceEvent::Status(true) => {
                if self.connected.set_if_changed(true) {
                    info!("Device connected");
                }
            }
            DeviceEvent::Status(false) => {
                self.hardware.reset();
                self.battery.reset();
                self.os.reset();
                self.storage.reset();
                if self.connected.set_if_changed(false) {
                    info!("Device disconnected");
                }
            }
        }
    }
}

/// Read-only view of the device stores
#[derive(Clone, Debug)]
pub struct DeviceContext {
    pub hardware: StoreReader<Hardware>,
    pub battery: StoreReader<Battery>,
    pub os: StoreReader<Os>,
    pub storage: StoreReader<Storage>,
    pub connected: StoreReader<bool>,
}

impl DeviceContext {
    /// Current value of every store
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            hardware: self.hardware.get(),
            battery: self.battery.get(),
            os: self.os.get(),
            storage: self.storage.get(),
            connected: self.connected.get(),
        }
    }
}

/// Point-in-time copy of all device state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub hardware: Hardware,
    pub battery: Battery,
    pub os: Os,
    pub storage: Storage,
    pub connected: bool,
}

/// Create the device stores with empty defaults and register them on `scope`.
///
/// Call once on the view-tree root before any descendant calls [`get_context`].
/// Calling it again on the same scope replaces the stores.
pub fn provide_context(scope: &ContextScope) -> DeviceContext {
    if scope.has(DEVICE_CONTEXT_KEY) {
        debug!("Replacing device context visible from this scope");
    }
    let stores = DeviceStores::default();
    let context = stores.context();
    scope.set(DEVICE_CONTEXT_KEY, stores);
    debug!("Device context provided");
    context
}

/// Read-only device stores visible from `scope`
pub fn get_context(scope: &ContextScope) -> Result<DeviceContext, ContextError> {
    scope
        .get::<DeviceStores>(DEVICE_CONTEXT_KEY)
        .map(|stores| stores.context())
}

/// Subscribe the stores on `scope` to the device events and send `check_device`.
///
/// Must be called from within a tokio runtime. The command is sent exactly
/// once per call; its failure is logged and otherwise ignored. Keep the
/// returned guard alive for as long as the owning view is active.
pub fn start_listening(
    scope: &ContextScope,
    bridge: &dyn Bridge,
) -> Result<ListenerGuard, AdapterError> {
    let stores = scope.get::<DeviceStores>(DEVICE_CONTEXT_KEY)?;
    let runtime = Handle::try_current().map_err(|_| AdapterError::NoRuntime)?;
    let active = Arc::new(AtomicBool::new(true));

    let subscriptions: Vec<Subscription> = DEVICE_EVENTS
        .iter()
        .map(|&event| {
            let handler = event_handler(event, stores.clone(), Arc::clone(&active));
            (event, runtime.spawn(bridge.listen(event, handler)))
        })
        .collect();

    let command = bridge.invoke(CHECK_DEVICE);
    runtime.spawn(async move {
        if let Err(e) = command.await {
            warn!("{} failed: {}", CHECK_DEVICE, e);
        }
    });
    info!("Listening for device events");

    Ok(ListenerGuard {
        subscriptions,
        active,
        runtime,
    })
}

fn event_handler(
    event: &'static str,
    stores: DeviceStores,
    active: Arc<AtomicBool>,
) -> EventHandler {
    Arc::new(move |payload: Value| {
        if !active.load(Ordering::SeqCst) {
            trace!("Dropping {} received after teardown", event);
            return;
        }
        match DeviceEvent::parse(event, payload) {
            Ok(device_event) => {
                debug!("Received {}", device_event.name());
                stores.apply(device_event);
            }
            Err(e) => warn!("Ignoring event: {}", e),
        }
    })
}

type Subscription = (&'static str, JoinHandle<Result<Unlisten, BridgeError>>);

/// Keeps the device event subscriptions alive.
///
/// [`ListenerGuard::teardown`] releases them and waits until every
/// subscription has been cancelled. Dropping the guard stops store updates
/// immediately and releases the subscriptions in the background.
pub struct ListenerGuard {
    subscriptions: Vec<Subscription>,
    active: Arc<AtomicBool>,
    runtime: Handle,
}

impl ListenerGuard {
    /// Whether events still reach the stores
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop updating the stores and unsubscribe from every event
    pub async fn teardown(mut self) {
        self.active.store(false, Ordering::SeqCst);
        release(std::mem::take(&mut self.subscriptions)).await;
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        self.active.store(false, Ordering::SeqCst);
        let subscriptions = std::mem::take(&mut self.subscriptions);
        self.runtime.spawn(release(subscriptions));
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("subscriptions", &self.subscriptions.len())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Wait for each subscription to resolve, then unsubscribe it
async fn release(subscriptions: Vec<Subscription>) {
    for (event, subscription) in subscriptions {
        match subscription.await {
            Ok(Ok(unlisten)) => {
                unlisten.unlisten();
                trace!("Unsubscribed from {}", event);
            }
            Ok(Err(e)) => debug!("Subscription to {} never became active: {}", event, e),
            Err(e) => warn!("Subscription task for {} failed: {}", event, e),
        }
    }
    info!("Stopped listening for device events");
}
