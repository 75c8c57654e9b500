//! End-to-end adapter tests driven by replay scripts

use device_state::replay::{parse_script, register_replay};
use device_state::{
    get_context, provide_context, start_listening, ContextScope, DeviceSnapshot, Hardware,
    LocalBridge,
};
use std::time::Duration;

fn replay_bridge(script: &str) -> (LocalBridge, std::sync::Arc<tokio::sync::Notify>) {
    let bridge = LocalBridge::new();
    let finished = register_replay(&bridge, parse_script(script).unwrap(), Duration::ZERO);
    (bridge, finished)
}

#[tokio::test]
async fn test_plug_in_populates_every_store() {
    let (bridge, finished) = replay_bridge(include_str!("../fixtures/scripts/plug_in.jsonl"));
    let root = ContextScope::root();
    provide_context(&root);
    let view = get_context(&root.child()).unwrap();

    let guard = start_listening(&root, &bridge).unwrap();
    finished.notified().await;

    let snapshot = view.snapshot();
    assert!(snapshot.connected);
    assert_eq!(snapshot.hardware.model_number, "A2848");
    assert_eq!(snapshot.battery.cycle_counts, 214.0);
    assert_eq!(snapshot.os.build_num, "21E237");
    assert_eq!(
        snapshot.storage.used_storage + snapshot.storage.available_storage,
        snapshot.storage.total_storage
    );

    guard.teardown().await;
}

#[tokio::test]
async fn test_unplug_clears_device_data() {
    let (bridge, finished) = replay_bridge(include_str!("../fixtures/scripts/unplug.jsonl"));
    let root = ContextScope::root();
    let context = provide_context(&root);

    let guard = start_listening(&root, &bridge).unwrap();
    finished.notified().await;

    assert_eq!(context.hardware.get(), Hardware::default());
    assert_eq!(context.snapshot(), DeviceSnapshot::default());
    guard.teardown().await;
}

#[tokio::test]
async fn test_connect_without_data_keeps_defaults() {
    let (bridge, finished) = replay_bridge(r#"{"event": "device_status", "payload": true}"#);
    let root = ContextScope::root();
    let context = provide_context(&root);

    let guard = start_listening(&root, &bridge).unwrap();
    finished.notified().await;

    let snapshot = context.snapshot();
    assert!(snapshot.connected);
    assert!(snapshot.hardware.is_empty());
    assert!(snapshot.battery.is_empty());
    assert!(snapshot.os.is_empty());
    assert!(snapshot.storage.is_empty());
    guard.teardown().await;
}

#[tokio::test]
async fn test_each_start_sends_one_check_device() {
    let (bridge, finished) = replay_bridge("");
    let root = ContextScope::root();
    provide_context(&root);

    let first = start_listening(&root, &bridge).unwrap();
    finished.notified().await;
    first.teardown().await;
    assert_eq!(bridge.invocations("check_device"), 1);

    let second = start_listening(&root, &bridge).unwrap();
    finished.notified().await;
    second.teardown().await;
    assert_eq!(bridge.invocations("check_device"), 2);
}

#[tokio::test]
async fn test_backend_keeps_emitting_after_teardown() {
    let bridge = LocalBridge::new();
    let root = ContextScope::root();
    let context = provide_context(&root);

    let guard = start_listening(&root, &bridge).unwrap();
    bridge.emit("device_status", true).unwrap();
    guard.teardown().await;

    assert_eq!(bridge.emit("device_status", false).unwrap(), 0);
    assert_eq!(
        bridge
            .emit(
                "device_hardware",
                Hardware {
                    model: "X1".into(),
                    model_number: "A1".into(),
                    region: "US".into(),
                },
            )
            .unwrap(),
        0
    );
    assert!(context.connected.get());
    assert!(context.hardware.get().is_empty());
}
