//! Board Console - Running Boards in a Terminal
//!
//! Loads board definitions from a TOML file, runs every board on its own
//! schedule and prints what each viewer would see as it changes.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in demo boards
//! board-console
//!
//! # With config file
//! board-console --config ~/.config/board/boards.toml
//!
//! # Faster default tick, stop after ten seconds
//! board-console --tick-ms 250 --duration-secs 10
//!
//! # Verbose logging
//! RUST_LOG=debug board-console
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: close every board and exit

mod boards;
mod config;
mod sender;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use board_core::{BoardEvent, BoardRegistry, BoardSender};
use clap::Parser;
use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use config::{default_config_path, load_config_from_path, ConfigOverrides, ConsoleConfig};
use sender::{SharedOutput, TerminalSender};

/// Consecutive render failures that get escalated to an error log
const FAILURE_ALERT_THRESHOLD: u64 = 3;

/// Board Console - per-viewer text boards in your terminal
#[derive(Parser, Debug)]
#[command(name = "board-console")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "BOARD_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Default render period in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Default delay before the first render in milliseconds
    #[arg(long, value_name = "MS")]
    start_delay_ms: Option<u64>,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(short = 'd', long, value_name = "SECS")]
    duration_secs: Option<u64>,

    /// Strip color codes instead of printing ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Print every board event to stderr as a JSON line
    #[arg(long)]
    json_events: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "BOARD_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            tick_ms: self.tick_ms,
            start_delay_ms: self.start_delay_ms,
        }
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they do not interleave with board output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("board_console={level},board_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Log board events that need attention
async fn watch_events(mut events: mpsc::UnboundedReceiver<BoardEvent>, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => eprintln!("{line}"),
                Err(e) => warn!(error = %e, "Failed to encode board event"),
            }
        }
        match event {
            BoardEvent::RenderFailed {
                board_id,
                message,
                consecutive,
            } if consecutive >= FAILURE_ALERT_THRESHOLD => {
                error!(board_id = ?board_id, consecutive, error = %message, "Board keeps failing");
            }
            BoardEvent::CallbackFailed {
                board_id,
                stage,
                message,
            } => {
                warn!(board_id = ?board_id, stage = %stage, error = %message, "Board callback panicked");
            }
            BoardEvent::Evicted { board_id, count } => {
                info!(board_id = ?board_id, count, "Viewers evicted");
            }
            _ => {}
        }
    }
}

/// Wait for a shutdown signal or for `run_for` to elapse
async fn wait_for_shutdown(run_for: Option<Duration>) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let elapsed = async {
        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
        () = elapsed => info!("Run duration elapsed, initiating shutdown"),
    }
    Ok(())
}

/// Build and start every board, then run until shutdown
async fn run(
    config: &ConsoleConfig,
    registry: &BoardRegistry,
    events: &mpsc::UnboundedSender<BoardEvent>,
    output: &SharedOutput<io::Stdout>,
    ansi: bool,
    run_for: Option<Duration>,
) -> Result<()> {
    let boards = boards::build_boards(config, registry, events, |_| {
        Arc::new(TerminalSender::<String, io::Stdout>::with_output(
            Arc::clone(output),
            ansi,
        )) as Arc<dyn BoardSender<String>>
    })
    .context("Failed to build boards")?;

    for board in &boards {
        board
            .start()
            .with_context(|| format!("Failed to start board {:?}", board.id()))?;
    }
    info!(boards = boards.len(), "Boards running");

    wait_for_shutdown(run_for).await?;

    for board in &boards {
        let stats = board.stats();
        info!(
            board_id = ?board.id(),
            renders = stats.renders,
            skipped = stats.skipped,
            failures = stats.failures,
            "Board statistics"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Board console starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(default_config_path);
    if let Some(ref path) = config_path {
        info!(config_path = ?path, "Config file");
    }

    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(
        source = %config.source,
        boards = config.boards.len(),
        tick_ms = config.tick_ms,
        "Configuration resolved"
    );

    let registry = BoardRegistry::new();
    let output: SharedOutput<io::Stdout> = Arc::new(Mutex::new(io::stdout()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let watcher = tokio::spawn(watch_events(events_rx, args.json_events));

    let result = run(
        &config,
        &registry,
        &events_tx,
        &output,
        !args.no_color,
        args.duration_secs.map(Duration::from_secs),
    )
    .await;

    // Close waits for in-flight renders, so keep it off the async workers
    info!("Shutting down...");
    let closing = registry.clone();
    match tokio::task::spawn_blocking(move || closing.close_all()).await {
        Ok(closed) => info!(closed, "Boards closed"),
        Err(e) => error!(error = %e, "Closing boards panicked"),
    }
    watcher.abort();

    match result {
        Ok(()) => {
            info!("Board console stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Board console stopped with error");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["board-console"]).unwrap();
        assert_eq!(args.log_level, "info");
        assert!(!args.no_color);
        assert!(!args.json_events);
        assert!(args.duration_secs.is_none());
        assert!(args.overrides().tick_ms.is_none());
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "board-console",
            "--tick-ms",
            "250",
            "--start-delay-ms",
            "10",
            "-d",
            "5",
            "--no-color",
        ])
        .unwrap();
        let overrides = args.overrides();
        assert_eq!(overrides.tick_ms, Some(250));
        assert_eq!(overrides.start_delay_ms, Some(10));
        assert_eq!(args.duration_secs, Some(5));
        assert!(args.no_color);
    }

    #[test]
    fn test_args_reject_bad_tick() {
        assert!(Args::try_parse_from(["board-console", "--tick-ms", "fast"]).is_err());
    }
}
