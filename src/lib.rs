//! Device State
//!
//! Keeps a companion UI in sync with a device backend.
//!
//! # Features
//! - Typed hardware, battery, OS and storage records
//! - Observable single-writer stores that views subscribe to
//! - View-tree scoped context so nested views find the stores without plumbing
//! - Subscription to the backend's `device_*` events with guarded teardown
//! - Reset of all device data when the device disconnects
//! - In-process bridge and a scripted replay backend

pub mod bridge;
pub mod core;
pub mod replay;

pub use bridge::{Bridge, BridgeError, LocalBridge};
pub use crate::core::adapter::{
    get_context, provide_context, start_listening, AdapterError, DeviceContext, DeviceSnapshot,
    ListenerGuard, DEVICE_CONTEXT_KEY,
};
pub use crate::core::config::Config;
pub use crate::core::context::{ContextError, ContextScope};
pub use crate::core::events::DeviceEvent;
pub use crate::core::state::{Battery, Hardware, Os, Storage};
pub use crate::core::store::StoreReader;
