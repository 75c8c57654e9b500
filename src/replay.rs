//! Scripted device backend
//!
//! Answers `check_device` on a [`LocalBridge`] by emitting a recorded event
//! script, one entry per line:
//!
//! ```text
//! # device plugged in
//! {"event": "device_status", "payload": true}
//! {"event": "device_hardware", "payload": {"model": "X1", "model_number": "A1", "region": "US"}}
//! ```

use crate::bridge::{BridgeError, LocalBridge};
use crate::core::events::CHECK_DEVICE;
use futures_util::future::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info};

/// One recorded backend event
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptEntry {
    pub event: String,
    pub payload: Value,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a JSON-lines script. Blank lines and `#` comments are skipped.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEntry>, ScriptError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| ScriptError::Parse {
                line: index + 1,
                source,
            })
        })
        .collect()
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptEntry>, ScriptError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_script(&text)
}

/// Install a `check_device` handler that replays `script` with `delay`
/// between events. The returned `Notify` fires once the replay ends, whether
/// the script was exhausted or an emit failed.
pub fn register_replay(
    bridge: &LocalBridge,
    script: Vec<ScriptEntry>,
    delay: Duration,
) -> Arc<Notify> {
    let script = Arc::new(script);
    let finished = Arc::new(Notify::new());
    let done = Arc::clone(&finished);

    bridge.register_command(CHECK_DEVICE, move |bridge: LocalBridge| {
        let script = Arc::clone(&script);
        let done = Arc::clone(&done);
        async move {
            let result = play(&bridge, &script, delay).await;
            done.notify_one();
            result
        }
        .boxed()
    });

    finished
}

async fn play(
    bridge: &LocalBridge,
    script: &[ScriptEntry],
    delay: Duration,
) -> Result<(), BridgeError> {
    info!("Replaying {} event(s)", script.len());
    for (index, entry) in script.iter().enumerate() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reached = bridge
            .emit(&entry.event, &entry.payload)
            .map_err(|e| BridgeError::CommandFailed {
                command: CHECK_DEVICE.to_string(),
                message: format!("replay stopped at entry {}: {}", index + 1, e),
            })?;
        debug!("{} delivered to {} listener(s)", entry.event, reached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use serde_json::json;
    use std::io::Write;

    const SCRIPT: &str = r#"
# plugged in
{"event": "device_status", "payload": true}

{"event": "device_os", "payload": {"ios_ver": "17.4", "build_num": "21E219"}}
"#;

    #[test]
    fn test_parse_script_skips_comments() {
        let entries = parse_script(SCRIPT).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "device_status");
        assert_eq!(entries[0].payload, json!(true));
        assert_eq!(entries[1].payload["build_num"], json!("21E219"));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let script = "{\"event\": \"device_status\", \"payload\": true}\nnot json";
        let err = parse_script(script).unwrap_err();
        assert!(matches!(err, ScriptError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_load_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SCRIPT).unwrap();
        assert_eq!(load_script(file.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(&dir.path().join("none.jsonl")).unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }

    #[tokio::test]
    async fn test_replay_emits_script_in_order() {
        let bridge = LocalBridge::new();
        let finished = register_replay(&bridge, parse_script(SCRIPT).unwrap(), Duration::ZERO);

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut unlisteners = Vec::new();
        for event in ["device_status", "device_os"] {
            let seen = Arc::clone(&seen);
            let handler: crate::bridge::EventHandler =
                Arc::new(move |_payload: Value| seen.lock().push(event));
            unlisteners.push(bridge.listen(event, handler).await.unwrap());
        }

        bridge.invoke(CHECK_DEVICE).await.unwrap();
        finished.notified().await;
        assert_eq!(*seen.lock(), vec!["device_status", "device_os"]);
    }

    #[tokio::test]
    async fn test_replay_signals_finish_when_emit_fails() {
        let bridge = LocalBridge::new();
        let finished = register_replay(&bridge, parse_script(SCRIPT).unwrap(), Duration::ZERO);

        // The backend shuts down as soon as the first event is delivered
        let closer = bridge.clone();
        let handler: crate::bridge::EventHandler =
            Arc::new(move |_payload: Value| closer.close());
        let _unlisten = bridge.listen("device_status", handler).await.unwrap();

        let err = bridge.invoke(CHECK_DEVICE).await.unwrap_err();
        assert!(matches!(
            &err,
            BridgeError::CommandFailed { command, message }
                if command == CHECK_DEVICE && message.starts_with("replay stopped at entry 2")
        ));
        tokio::time::timeout(Duration::from_secs(1), finished.notified())
            .await
            .unwrap();
        assert!(bridge.is_closed());
    }
}
