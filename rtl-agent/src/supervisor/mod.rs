//! Supervisor loop
//! ===============
//! Brackets one capture session: takes both PID markers, opens the store,
//! launches the capture subprocess, and drains the reader's queue into the
//! store until the subprocess's stdout closes (or a shutdown is requested).
//!
//! ```text
//!   Starting ─► Running ─► Draining ─► Stopped
//!      │           │           │
//!      └───────────┴───────────┴──────► Failed
//! ```
//!
//! Teardown (kill + reap the subprocess, join the reader, close the store,
//! delete both markers) runs on every exit path: explicitly on the normal
//! path, and through `Drop` on `CaptureProcess` / `MarkerLease` when an error
//! unwinds the session early.

mod child;

use std::{
    io::{self, BufReader},
    path::PathBuf,
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam::channel::{Receiver, TryRecvError};
use log::Level;
use thiserror::Error;

use crate::agent_log;
use crate::comms::{line_queue, EofSignal, LineReader, PipeSource, RawLine, Reading};
use crate::config::Config;
use crate::db::{DbError, SensorStore};
use crate::lock::{MarkerError, PidMarker};

pub use child::CaptureProcess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Draining,
    Stopped,
    Failed,
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Marker(#[from] MarkerError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] DbError),

    #[error("cannot launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("subprocess stdout was not captured")]
    NoStdout,

    #[error("cannot start line reader: {0}")]
    Reader(#[source] io::Error),
}

impl SupervisorError {
    pub fn is_already_running(&self) -> bool {
        matches!(self, SupervisorError::Marker(MarkerError::AlreadyRunning { .. }))
    }
}

/// What a finished session did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub written: u64,
    pub dropped: u64,
}

/// Knobs for one session, usually lifted from `Config`.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub program:        PathBuf,
    pub args:           Vec<String>,
    pub queue_capacity: usize,
    pub poll_interval:  Duration,
    pub raw_log:        Option<PathBuf>,
}

impl SupervisorOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program:        cfg.subprocess.path.clone(),
            args:           cfg.subprocess.args.clone(),
            queue_capacity: cfg.agent.queue_capacity,
            poll_interval:  cfg.agent.poll_interval,
            raw_log:        cfg.logging.raw_file.clone(),
        }
    }
}

pub struct Supervisor {
    opts:         SupervisorOptions,
    store:        SensorStore,
    own_marker:   PidMarker,
    child_marker: PidMarker,
    shutdown:     Arc<AtomicBool>,
    state:        SupervisorState,
}

impl Supervisor {
    pub fn new(
        opts: SupervisorOptions,
        store: SensorStore,
        own_marker: PidMarker,
        child_marker: PidMarker,
    ) -> Self {
        Self {
            opts,
            store,
            own_marker,
            child_marker,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: SupervisorState::Starting,
        }
    }

    /// Wire everything from `Config`, checking liveness against the host.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            SupervisorOptions::from_config(cfg),
            SensorStore::new(cfg.database.clone()),
            PidMarker::system(&cfg.agent.pid_file),
            PidMarker::system(&cfg.subprocess.pid_file),
        )
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Setting this flag moves a running session to `Draining`.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run one capture session to completion.
    pub fn run(&mut self) -> Result<RunSummary, SupervisorError> {
        let result = self.run_session();
        self.store.close();
        match &result {
            Ok(summary) => {
                self.transition(SupervisorState::Stopped);
                agent_log!(
                    Level::Info,
                    "supervisor",
                    "Session finished: {} written, {} dropped",
                    summary.written,
                    summary.dropped
                );
            }
            Err(e) => {
                self.transition(SupervisorState::Failed);
                agent_log!(Level::Error, "supervisor", "Session failed: {}", e);
            }
        }
        result
    }

    fn run_session(&mut self) -> Result<RunSummary, SupervisorError> {
        self.transition(SupervisorState::Starting);

        let own_lease = self.own_marker.acquire(process::id())?;
        if let Some(pid) = self.child_marker.ensure_vacant()? {
            agent_log!(
                Level::Warn,
                "supervisor",
                "{} (pid {}) terminated unexpectedly during a previous run",
                self.opts.program.display(),
                pid
            );
        }
        self.store.connect()?;

        let mut child = CaptureProcess::spawn(&self.opts.program, &self.opts.args)
            .map_err(|source| SupervisorError::Spawn { program: self.opts.program.clone(), source })?;
        let child_lease = self.child_marker.acquire(child.id())?;
        let stdout = child.take_stdout().ok_or(SupervisorError::NoStdout)?;

        let (tx, rx) = line_queue(self.opts.queue_capacity);
        let reader = LineReader::new(PipeSource(BufReader::new(stdout)), tx, self.opts.raw_log.clone())
            .spawn()
            .map_err(SupervisorError::Reader)?;

        let outcome = self.pump(&rx, reader.eof());

        // Consumer first, then producer, then the markers that advertise them.
        drop(rx);
        child.terminate();
        match reader.join() {
            Some(stats) => log::debug!("reader pushed {} line(s), skipped {}", stats.pushed, stats.skipped),
            None => log::error!("line reader thread panicked"),
        }
        self.store.close();
        drop(child_lease);
        drop(own_lease);

        outcome
    }

    /// Drain `rx` into the store until the stream ends and the queue is empty.
    fn pump(&mut self, rx: &Receiver<RawLine>, eof: &EofSignal) -> Result<RunSummary, SupervisorError> {
        let mut summary = RunSummary::default();
        self.transition(SupervisorState::Running);

        loop {
            match self.state {
                SupervisorState::Running => {
                    if self.shutdown.load(Ordering::Acquire) {
                        agent_log!(Level::Info, "supervisor", "Shutdown requested");
                        self.transition(SupervisorState::Draining);
                        continue;
                    }
                    match rx.try_recv() {
                        Ok(line) => self.ingest(&line, &mut summary)?,
                        Err(TryRecvError::Empty) if eof.is_set() => {
                            agent_log!(Level::Info, "supervisor", "Subprocess output ended");
                            self.transition(SupervisorState::Draining);
                        }
                        Err(TryRecvError::Empty) => thread::sleep(self.opts.poll_interval),
                        Err(TryRecvError::Disconnected) => self.transition(SupervisorState::Draining),
                    }
                }
                SupervisorState::Draining => match rx.try_recv() {
                    Ok(line) => self.ingest(&line, &mut summary)?,
                    Err(_) => {
                        self.transition(SupervisorState::Stopped);
                        break;
                    }
                },
                _ => break,
            }
        }

        Ok(summary)
    }

    /// Parse one line and store it; malformed lines are counted and dropped.
    fn ingest(&mut self, line: &[u8], summary: &mut RunSummary) -> Result<(), SupervisorError> {
        match Reading::parse(line) {
            Ok(reading) => {
                let id = self.store.write(&reading)?;
                summary.written += 1;
                log::debug!("stored #{}: {}", id, reading);
            }
            Err(e) => {
                summary.dropped += 1;
                metrics::counter!("rtl_readings_dropped_total").increment(1);
                log::warn!("dropping malformed line ({}): {}", e, String::from_utf8_lossy(line));
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            agent_log!(Level::Debug, "supervisor", "{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
