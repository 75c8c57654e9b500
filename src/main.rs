//! Device State - replay a recorded device backend through the state adapter

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use device_state::replay::{load_script, register_replay};
use device_state::{
    get_context, provide_context, start_listening, Config, ContextScope, DeviceContext, LocalBridge,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "device-state", about = "Mirror device backend events into observable stores")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines event script as the device backend
    Replay {
        /// Script file, one {"event": ..., "payload": ...} object per line
        script: PathBuf,
        /// Delay between events in milliseconds (overrides the config)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Print the default configuration file path
    ConfigPath,
    /// Print the default configuration
    DefaultConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Replay { script, delay_ms } => {
            let delay = delay_ms.unwrap_or(config.replay.event_delay_ms);
            replay(script, delay, config.replay.linger_ms).await
        }
        Commands::ConfigPath => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
        Commands::DefaultConfig => {
            print!("{}", Config::default().to_toml()?);
            Ok(())
        }
    }
}

async fn replay(script: PathBuf, delay_ms: u64, linger_ms: u64) -> Result<()> {
    let entries = load_script(&script).context("Failed to load replay script")?;
    info!("Loaded {} event(s) from {:?}", entries.len(), script);

    let bridge = LocalBridge::new();
    let finished = register_replay(&bridge, entries, Duration::from_millis(delay_ms));

    let root = ContextScope::root();
    provide_context(&root);

    // Read through a descendant scope the way a nested view would
    let context = get_context(&root.child())?;
    let watcher = tokio::spawn(log_changes(context.clone()));

    let guard = start_listening(&root, &bridge)?;
    finished.notified().await;
    tokio::time::sleep(Duration::from_millis(linger_ms)).await;
    guard.teardown().await;
    bridge.close();
    watcher.abort();

    println!("{}", serde_json::to_string_pretty(&context.snapshot())?);
    Ok(())
}

async fn log_changes(context: DeviceContext) {
    let mut hardware = context.hardware.subscribe();
    let mut battery = context.battery.subscribe();
    let mut os = context.os.subscribe();
    let mut storage = context.storage.subscribe();
    let mut connected = context.connected.subscribe();

    loop {
        tokio::select! {
            Ok(()) = hardware.changed() => info!("hardware: {:?}", *hardware.borrow_and_update()),
            Ok(()) = battery.changed() => info!("battery: {:?}", *battery.borrow_and_update()),
            Ok(()) = os.changed() => info!("os: {:?}", *os.borrow_and_update()),
            Ok(()) = storage.changed() => info!("storage: {:?}", *storage.borrow_and_update()),
            Ok(()) = connected.changed() => info!("connected: {}", *connected.borrow_and_update()),
            else => break,
        }
    }
}
