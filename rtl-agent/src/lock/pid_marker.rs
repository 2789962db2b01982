//! PID marker files.
//!
//! A marker is a plain text file holding the decimal pid of the instance that
//! owns it. A marker whose pid is no longer running (or whose contents cannot
//! be read as a pid) is stale and may be taken over; a live one may not.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::Level;
use thiserror::Error;

use crate::agent_log;
use super::liveness::{Liveness, SystemLiveness};

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("already running: {path} belongs to live pid {pid}")]
    AlreadyRunning { path: PathBuf, pid: u32 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a successful `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    /// Pid recorded by a previous owner that is no longer running.
    pub stale: Option<u32>,
}

#[derive(Clone)]
pub struct PidMarker {
    path:     PathBuf,
    liveness: Arc<dyn Liveness>,
}

impl PidMarker {
    pub fn new(path: impl Into<PathBuf>, liveness: Arc<dyn Liveness>) -> Self {
        Self { path: path.into(), liveness }
    }

    /// Marker backed by the host's process table.
    pub fn system(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Arc::new(SystemLiveness))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid currently recorded in the marker, if the file exists and parses.
    pub fn recorded_pid(&self) -> Result<Option<u32>, MarkerError> {
        match fs::read_to_string(&self.path) {
            Ok(txt) => Ok(txt.trim().parse().ok()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Fail with `AlreadyRunning` if a live pid owns the marker; never writes.
    pub fn ensure_vacant(&self) -> Result<Option<u32>, MarkerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        match self.recorded_pid()? {
            Some(pid) if self.liveness.is_alive(pid) => Err(MarkerError::AlreadyRunning {
                path: self.path.clone(),
                pid,
            }),
            stale => Ok(stale),
        }
    }

    /// Record `pid`, taking over a stale marker if there is one.
    pub fn create(&self, pid: u32) -> Result<Acquired, MarkerError> {
        let stale = self.ensure_vacant()?;
        if let Some(old) = stale {
            agent_log!(Level::Warn, "lock", "Replacing stale marker {:?} (pid {} is gone)", self.path, old);
        }
        fs::write(&self.path, format!("{pid}\n")).map_err(|e| self.io_err(e))?;
        agent_log!(Level::Debug, "lock", "Marker {:?} -> pid {}", self.path, pid);
        Ok(Acquired { stale })
    }

    /// Remove the marker; an absent file counts as success.
    pub fn delete(&self) -> Result<(), MarkerError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// `create` and hand back a lease that deletes the marker when dropped.
    pub fn acquire(&self, pid: u32) -> Result<MarkerLease, MarkerError> {
        let acquired = self.create(pid)?;
        Ok(MarkerLease { marker: self.clone(), pid, acquired, released: false })
    }

    fn io_err(&self, source: io::Error) -> MarkerError {
        MarkerError::Io { path: self.path.clone(), source }
    }
}

/// Scoped ownership of a marker.
pub struct MarkerLease {
    marker:   PidMarker,
    pid:      u32,
    acquired: Acquired,
    released: bool,
}

impl MarkerLease {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        self.marker.path()
    }

    /// Pid of the crashed previous owner, if the marker was taken over.
    pub fn stale_pid(&self) -> Option<u32> {
        self.acquired.stale
    }

    /// Delete the marker now and report the outcome.
    pub fn release(mut self) -> Result<(), MarkerError> {
        self.released = true;
        self.marker.delete()
    }
}

impl Drop for MarkerLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.marker.delete() {
            agent_log!(Level::Error, "lock", "Could not remove marker: {}", e);
        }
    }
}
