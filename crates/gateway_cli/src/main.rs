//! Gateway CLI
//!
//! Inspect and edit persisted gateway state, preload assets and drive the
//! headless frame loop.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateway_assets::{AssetManager, FileLoader};
use gateway_core::events::names;
use gateway_core::{FileStorage, GatewayRuntime, StateStore, StateValue};
use gateway_voice::{install_default_commands, RecognitionResult, VoiceCommands};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::GatewayConfig;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "VR gateway state and asset tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./gateway.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and write persisted state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },

    /// Work with 3D assets
    Assets {
        #[command(subcommand)]
        command: AssetCommands,
    },

    /// Run the frame loop headless
    Run {
        /// Number of frames to tick
        #[arg(short, long, default_value = "60")]
        frames: u64,
    },

    /// Dispatch a recognized phrase through the default voice commands
    Voice {
        /// Recognized transcript
        transcript: String,

        /// Recognizer confidence
        #[arg(long, default_value = "1.0")]
        confidence: f64,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// Print the value at a dotted path, or the whole tree
    Get {
        path: Option<String>,
    },

    /// Write a value at a dotted path
    Set {
        path: String,

        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,
    },

    /// Print the full tree as JSON
    Export,

    /// Merge a JSON export into the state
    Import {
        file: PathBuf,
    },

    /// Restore the initial state and drop the persisted snapshot
    Reset,

    /// Drop the persisted snapshot
    Clear,
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Load assets from the configured root
    Preload {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = GatewayConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::State { command } => cmd_state(&config, command),
        Commands::Assets { command } => match command {
            AssetCommands::Preload { paths } => cmd_preload(&config, paths),
        },
        Commands::Run { frames } => cmd_run(&config, frames),
        Commands::Voice {
            transcript,
            confidence,
        } => cmd_voice(&config, &transcript, confidence),
    }
}

fn open_store(config: &GatewayConfig) -> StateStore {
    let storage = FileStorage::new(&config.storage.dir);
    StateStore::with_storage(config.state.clone(), Box::new(storage))
}

fn cmd_state(config: &GatewayConfig, command: StateCommands) -> Result<()> {
    let store = open_store(config);

    match command {
        StateCommands::Get { path } => {
            let value = match path {
                Some(path) => store
                    .get(&path)
                    .with_context(|| format!("No state at '{}'", path))?,
                None => store.get_root(),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        StateCommands::Set { path, value } => {
            let (old, new) = set_value(&store, &path, value)?;
            info!("{}: {} -> {}", path, old, new);
        }

        StateCommands::Export => {
            println!("{}", store.export()?);
        }

        StateCommands::Import { file } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            store
                .import(&content)
                .with_context(|| format!("Failed to import {}", file.display()))?;
        }

        StateCommands::Reset => {
            store.reset();
            store.clear_persisted();
        }

        StateCommands::Clear => {
            store.clear_persisted();
        }
    }

    Ok(())
}

/// Write a raw CLI value at `path`, returning the previous and new values
fn set_value(store: &StateStore, path: &str, raw: String) -> Result<(StateValue, StateValue)> {
    let value: StateValue =
        serde_json::from_str(&raw).unwrap_or_else(|_| StateValue::String(raw));
    let old = store.get(path).unwrap_or_default();
    let new = store
        .set(path, value)
        .with_context(|| format!("Failed to set '{}'", path))?;
    Ok((old, new))
}

fn cmd_preload(config: &GatewayConfig, paths: Vec<String>) -> Result<()> {
    let manager = AssetManager::new(config.assets.clone());
    manager.register_loader(Rc::new(FileLoader::new(&config.assets.root)));

    let loaded = pollster::block_on(manager.preload_assets(paths))?;
    for asset in &loaded {
        println!("{}\t{}\t{} bytes", asset.path, asset.format, asset.data.len());
    }

    let stats = manager.stats();
    info!(
        "{} assets cached (max {}), {} evicted",
        stats.loaded, stats.max_cache_size, stats.evictions
    );
    Ok(())
}

fn runtime(config: &GatewayConfig) -> GatewayRuntime {
    let runtime = GatewayRuntime::with_store(open_store(config), config.scheduler.clone());

    runtime.events.on(names::NAVIGATE_PORTAL, |data| {
        let portal = data.and_then(StateValue::as_str).unwrap_or("unknown");
        info!("Navigating to portal '{}'", portal);
    });
    runtime.events.on(names::RESET_POSITION, |_| {
        info!("Position reset to home");
    });
    runtime.events.on(names::VR_MODE_CHANGED, |data| {
        info!("VR mode changed: {}", data.cloned().unwrap_or_default());
    });
    runtime
}

fn cmd_run(config: &GatewayConfig, frames: u64) -> Result<()> {
    let runtime = runtime(config);

    info!("Running {} frames at {} fps", frames, config.scheduler.target_fps);
    let ticked = runtime.scheduler.run(Some(frames));

    let stats = runtime.stats();
    println!(
        "frames: {}\nelapsed: {:.3}s\nfps: {:.1}\nhistory: {}",
        ticked,
        runtime.scheduler.elapsed(),
        runtime.scheduler.fps(),
        stats.store.history_len
    );
    Ok(())
}

fn cmd_voice(config: &GatewayConfig, transcript: &str, confidence: f64) -> Result<()> {
    let runtime = runtime(config);
    let commands = Rc::new(VoiceCommands::new(config.voice.clone()));
    install_default_commands(&commands, &runtime.events)?;

    commands.start();
    let result = RecognitionResult::final_result(transcript, confidence);
    match commands.handle_result(&result) {
        Some(matched) => println!("matched: {}", matched.trigger),
        None => warn!(
            "No command dispatched for \"{}\" (confidence {}, sensitivity {})",
            transcript, confidence, config.voice.sensitivity
        ),
    }

    runtime.tick();
    Ok(())
}
