// src/main.rs

//! Agent entry-point.
//!
//! 1. Load configuration (`config.toml` next to the executable, or argv[1])
//! 2. Set up structured logging
//! 3. Hook Ctrl-C into the supervisor's shutdown flag
//! 4. Run one capture session: rtl_433 → queue → SQLite
//! 5. Exit non-zero if the session failed
//!
// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::Context;
use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::{
    path::{Path, PathBuf},
    process,
    sync::atomic::Ordering,
    thread,
};

// ───── local imports ────────────────────────────────────────────────────────
use rtl_agent::config::{self, Config};
use rtl_agent::supervisor::Supervisor;

// ───── helpers ──────────────────────────────────────────────────────────────

/// Print an error with context and terminate the process.
macro_rules! fatal {
    ($ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            chrono::Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        std::process::exit(1);
    }};
}

/// Directory that contains the running executable.
fn exe_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine exe path")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// First positional argument, else `config.toml` beside the binary.
fn config_path() -> anyhow::Result<PathBuf> {
    match std::env::args_os().nth(1) {
        Some(arg) => Ok(PathBuf::from(arg)),
        None => Ok(exe_dir()?.join("config.toml")),
    }
}

/// Configure global logging as requested in `[logging]` / `[agent].debug`.
fn setup_logging(cfg: &Config) -> Result<(), fern::InitError> {
    let level = if cfg.agent.debug {
        LevelFilter::Debug
    } else {
        match cfg.logging.level.to_uppercase().as_str() {
            "ERROR" => LevelFilter::Error,
            "WARN" => LevelFilter::Warn,
            "DEBUG" => LevelFilter::Debug,
            "TRACE" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    };

    let log_path = cfg.logging.enable.then(|| cfg.logging.file.clone());

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

// ───── agent logic ──────────────────────────────────────────────────────────

fn run() -> anyhow::Result<()> {
    // 1 ─ Configuration
    let path = config_path()?;
    let cfg = config::load(&path).with_context(|| format!("loading {}", path.display()))?;

    // 2 ─ Logging
    setup_logging(&cfg).context("logging setup failed")?;
    log::info!("rtl-agent starting (config {})", path.display());

    // 3 ─ Supervisor + Ctrl-C
    let mut supervisor = Supervisor::from_config(&cfg);
    let shutdown = supervisor.shutdown_handle();
    ctrlc::set_handler(move || {
        log::warn!("Interrupt received, draining");
        shutdown.store(true, Ordering::Release);
    })
    .context("installing Ctrl-C handler")?;

    // 4 ─ Capture session
    let summary = supervisor.run()?;
    log::info!(
        "rtl-agent stopped cleanly ({} stored, {} dropped)",
        summary.written,
        summary.dropped
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        fatal!("main", "{:#}", e);
    }
}
