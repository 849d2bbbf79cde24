mod reload;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;
use voxchat_audio::{
    DeviceKind, DeviceManager, LoopingCue, PlaybackController, RodioBackend, SilentCue, TypingCue,
};
use voxchat_core::{AppConfig, CaptureStrategy};
use voxchat_session::{
    route_ui_commands, run_capture_loop, ChatBackend, HttpBackend, SessionController,
};

use crate::reload::{Overrides, ReloadTargets};

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Recording,
    Transcription,
}

impl From<StrategyArg> for CaptureStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Recording => CaptureStrategy::Recording,
            StrategyArg::Transcription => CaptureStrategy::Transcription,
        }
    }
}

#[derive(Parser)]
#[command(name = "voxchat", about = "Push-to-talk voice chat client")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Chat backend base URL, overriding backend.base_url
    #[arg(long)]
    backend_url: Option<String>,

    /// Capture strategy, overriding capture.strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Print audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

const LOG_CAPACITY: usize = 1000;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_devices();
    }

    let overrides = Overrides {
        backend_url: cli.backend_url.clone(),
        strategy: cli.strategy.map(CaptureStrategy::from),
    };
    let config_exists = cli.config.exists();
    let mut config = if config_exists {
        AppConfig::load_from_file(&cli.config)
            .with_context(|| format!("failed to load config from {:?}", cli.config))?
    } else {
        AppConfig::default()
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;

    // Set up TUI log buffer and layered tracing subscriber
    let log_buffer = Arc::new(Mutex::new(VecDeque::<String>::new()));
    let tui_log_layer = voxchat_tui::TuiLogLayer::new(Arc::clone(&log_buffer), LOG_CAPACITY);

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tui_log_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("voxchat starting");
    if !config_exists {
        tracing::warn!("no config at {:?}, using defaults", cli.config);
    }

    // Playback. The output stream must outlive every sink, so it stays here.
    let (_output_stream, output_handle) = voxchat_audio::open_output(&config.playback.device_name)
        .with_context(|| {
            format!(
                "failed to open output device: {}",
                config.playback.device_name
            )
        })?;
    let playback = PlaybackController::new(Box::new(RodioBackend::new(
        output_handle.clone(),
        config.playback.volume,
    )));

    let cue: Box<dyn TypingCue> = match &config.playback.typing_sound {
        Some(path) => match LoopingCue::from_file(output_handle.clone(), path, config.playback.volume) {
            Ok(cue) => Box::new(cue),
            Err(e) => {
                tracing::warn!("typing sound disabled: {e}");
                Box::new(SilentCue)
            }
        },
        None => Box::new(SilentCue),
    };

    let backend: Arc<dyn ChatBackend> =
        Arc::new(HttpBackend::new(&config.backend).context("failed to create backend client")?);
    tracing::info!(url = %config.backend.turn_url(), "chat backend");

    // Session actor
    let controller = SessionController::new(backend, playback, cue);
    let state_rx = controller.subscribe();
    let (session_tx, session_rx) = mpsc::unbounded_channel();
    let session_task = tokio::spawn(controller.run(session_rx));

    // Capture
    let source = voxchat_capture::build_source(&config.capture);
    tracing::info!(
        strategy = ?source.strategy(),
        device = %config.capture.device_name,
        "capture ready"
    );
    let (capture_tx, capture_rx) = mpsc::unbounded_channel();
    let capture_task = tokio::spawn(run_capture_loop(source, capture_rx, session_tx.clone()));

    // UI command routing
    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let router_task = tokio::spawn(route_ui_commands(
        ui_rx,
        capture_tx.clone(),
        session_tx.clone(),
    ));

    let (tick_tx, tick_rx) = watch::channel(Duration::from_millis(config.typewriter.tick_ms));

    // Config hot reload
    let mut _watcher = None;
    let mut reload_task = None;
    if config_exists {
        match reload::watch_config(&cli.config) {
            Ok((watcher, changes)) => {
                _watcher = Some(watcher);
                reload_task = Some(tokio::spawn(reload::reload_loop(
                    cli.config.clone(),
                    config.clone(),
                    overrides,
                    changes,
                    ReloadTargets {
                        session: session_tx.clone(),
                        capture: capture_tx.clone(),
                        tick: tick_tx,
                    },
                )));
            }
            Err(e) => tracing::warn!("config hot reload disabled: {e}"),
        }
    }
    drop(capture_tx);
    drop(session_tx);

    tracing::info!("TUI active, Space to talk, 'q' to quit");

    // Run TUI (blocks until user quits)
    voxchat_tui::run(state_rx, ui_tx, log_buffer, tick_rx)
        .await
        .context("TUI error")?;

    tracing::info!("shutting down");
    if let Some(task) = reload_task {
        task.abort();
    }
    let _ = router_task.await;
    if tokio::time::timeout(Duration::from_secs(3), capture_task)
        .await
        .is_err()
    {
        tracing::warn!("capture did not stop in time");
    }
    if tokio::time::timeout(Duration::from_secs(3), session_task)
        .await
        .is_err()
    {
        tracing::warn!("session did not stop in time");
    }

    Ok(())
}

fn list_devices() -> Result<()> {
    let manager = DeviceManager::new();
    for (kind, label) in [(DeviceKind::Input, "Input"), (DeviceKind::Output, "Output")] {
        println!("{label} devices:");
        let devices = manager
            .list(kind)
            .with_context(|| format!("failed to list {} devices", label.to_lowercase()))?;
        for (name, _) in devices {
            println!("  {name}");
        }
    }
    Ok(())
}
