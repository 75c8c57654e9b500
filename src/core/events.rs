//! Backend event definitions

use super::state::{Battery, Hardware, Os, Storage};
use serde_json::Value;
use thiserror::Error;

/// Hardware identity snapshot
pub const DEVICE_HARDWARE: &str = "device_hardware";
/// Battery snapshot
pub const DEVICE_BATTERY: &str = "device_battery";
/// Operating system snapshot
pub const DEVICE_OS: &str = "device_os";
/// Storage snapshot
pub const DEVICE_STORAGE: &str = "device_storage";
/// Connection status (boolean payload)
pub const DEVICE_STATUS: &str = "device_status";

/// Every event the adapter subscribes to
pub const DEVICE_EVENTS: [&str; 5] = [
    DEVICE_HARDWARE,
    DEVICE_BATTERY,
    DEVICE_OS,
    DEVICE_STORAGE,
    DEVICE_STATUS,
];

/// Command that asks the backend to start device monitoring
pub const CHECK_DEVICE: &str = "check_device";

/// Errors raised while decoding an inbound event
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Typed inbound event from the device backend
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Hardware(Hardware),
    Battery(Battery),
    Os(Os),
    Storage(Storage),
    /// Device connected (true) or disconnected (false)
    Status(bool),
}

impl DeviceEvent {
    /// Decode a named event, validating the payload shape
    pub fn parse(name: &str, payload: Value) -> Result<Self, EventError> {
        match name {
            DEVICE_HARDWARE => decode(DEVICE_HARDWARE, payload).map(DeviceEvent::Hardware),
            DEVICE_BATTERY => decode(DEVICE_BATTERY, payload).map(DeviceEvent::Battery),
            DEVICE_OS => decode(DEVICE_OS, payload).map(DeviceEvent::Os),
            DEVICE_STORAGE => decode(DEVICE_STORAGE, payload).map(DeviceEvent::Storage),
            DEVICE_STATUS => decode(DEVICE_STATUS, payload).map(DeviceEvent::Status),
            other => Err(EventError::UnknownEvent(other.to_string())),
        }
    }

    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::Hardware(_) => DEVICE_HARDWARE,
            DeviceEvent::Battery(_) => DEVICE_BATTERY,
            DeviceEvent::Os(_) => DEVICE_OS,
            DeviceEvent::Storage(_) => DEVICE_STORAGE,
            DeviceEvent::Status(_) => DEVICE_STATUS,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    event: &'static str,
    payload: Value,
) -> Result<T, EventError> {
    serde_json::from_value(payload).map_err(|source| EventError::InvalidPayload { event, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hardware() {
        let event = DeviceEvent::parse(
            DEVICE_HARDWARE,
            json!({"model": "X1", "model_number": "A1", "region": "US"}),
        )
        .unwrap();
        assert_eq!(
            event,
            DeviceEvent::Hardware(Hardware {
                model: "X1".into(),
                model_number: "A1".into(),
                region: "US".into(),
            })
        );
        assert_eq!(event.name(), DEVICE_HARDWARE);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            DeviceEvent::parse(DEVICE_STATUS, json!(false)).unwrap(),
            DeviceEvent::Status(false)
        );
    }

    #[test]
    fn test_status_requires_bool() {
        let err = DeviceEvent::parse(DEVICE_STATUS, json!("yes")).unwrap_err();
        assert!(matches!(err, EventError::InvalidPayload { event: DEVICE_STATUS, .. }));
    }

    #[test]
    fn test_storage_rejects_non_numeric_size() {
        let err = DeviceEvent::parse(
            DEVICE_STORAGE,
            json!({"total_storage": "128 GB", "used_storage": 0, "available_storage": 0}),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid payload for device_storage"));
    }

    #[test]
    fn test_unknown_event() {
        let err = DeviceEvent::parse("carrier_bundle_install_status", json!(true)).unwrap_err();
        assert!(matches!(
            err,
            EventError::UnknownEvent(name) if name == "carrier_bundle_install_status"
        ));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let event = DeviceEvent::parse(
            DEVICE_OS,
            json!({"ios_ver": "17.4", "build_num": "21E219", "beta": false}),
        )
        .unwrap();
        assert!(matches!(event, DeviceEvent::Os(os) if os.build_num == "21E219"));
    }
}
