//! Background line reader
//! ======================
//! Owns the subprocess's stdout and pumps it, one line at a time, into the
//! bounded queue drained by the supervisor. Reads block; the supervisor's
//! loop never does.
//!
//! * An **empty read** is end of stream (the pipe was closed). A blank
//!   application line (`"\n"`) is not: it is skipped and reading continues.
//! * Pushes block when the queue is full, so memory stays bounded when the
//!   database falls behind.
//! * Every pushed line can be mirrored to a raw log file, flushed per line.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::Sender;

/// Anything that yields raw lines; an empty `Vec` means end of stream.
pub trait LineSource {
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

/// Adapts a buffered pipe (e.g. `ChildStdout`) to `LineSource`.
pub struct PipeSource<R>(pub R);

impl<R: BufRead> LineSource for PipeSource<R> {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.0.read_until(b'\n', &mut buf)?;
        Ok(buf)
    }
}

/// Shared end-of-stream flag, cheap to clone and poll from any thread.
#[derive(Debug, Clone, Default)]
pub struct EofSignal(Arc<AtomicBool>);

impl EofSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Raises the flag when dropped, so a panicking reader still reports EOF.
struct RaiseOnDrop(EofSignal);

impl Drop for RaiseOnDrop {
    fn drop(&mut self) {
        self.0.set();
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    pub pushed:  u64,
    pub skipped: u64,
}

pub struct LineReader<S> {
    source:  S,
    queue:   Sender<Vec<u8>>,
    raw_log: Option<PathBuf>,
    eof:     EofSignal,
}

impl<S: LineSource> LineReader<S> {
    pub fn new(source: S, queue: Sender<Vec<u8>>, raw_log: Option<PathBuf>) -> Self {
        Self { source, queue, raw_log, eof: EofSignal::new() }
    }

    /// Handle on the end-of-stream flag; set once `run` returns.
    pub fn eof(&self) -> EofSignal {
        self.eof.clone()
    }

    /// Read until end of stream, a read error, or the queue's receiver going away.
    pub fn run(mut self) -> ReaderStats {
        let _raise = RaiseOnDrop(self.eof.clone());
        let mut raw_log = self.raw_log.as_deref().and_then(open_raw_log);
        let mut stats = ReaderStats::default();

        loop {
            let mut line = match self.source.read_line() {
                Ok(line) if line.is_empty() => {
                    log::debug!("subprocess stream closed");
                    break;
                }
                Ok(line) => line,
                Err(e) => {
                    log::error!("read from subprocess failed: {}", e);
                    break;
                }
            };

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            // The raw log gets the line as emitted, before any cleanup.
            if let Some(file) = raw_log.as_mut().filter(|_| !line.is_empty()) {
                if let Err(e) = mirror(file, &line) {
                    log::warn!("raw log write failed, mirroring disabled: {}", e);
                    raw_log = None;
                }
            }

            while line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.trim_ascii().is_empty() {
                stats.skipped += 1;
                continue;
            }

            if self.queue.send(line).is_err() {
                log::debug!("reading queue closed; reader stopping");
                break;
            }
            stats.pushed += 1;
        }

        stats
    }
}

impl<S: LineSource + Send + 'static> LineReader<S> {
    /// Start `run` on its own named thread.
    pub fn spawn(self) -> io::Result<ReaderHandle> {
        let eof = self.eof();
        let join = thread::Builder::new()
            .name("rtl-line-reader".into())
            .spawn(move || self.run())?;
        Ok(ReaderHandle { eof, join })
    }
}

pub struct ReaderHandle {
    eof:  EofSignal,
    join: JoinHandle<ReaderStats>,
}

impl ReaderHandle {
    pub fn eof(&self) -> &EofSignal {
        &self.eof
    }

    /// Wait for the reader thread; a panicked reader yields `None`.
    pub fn join(self) -> Option<ReaderStats> {
        self.join.join().ok()
    }
}

fn mirror(file: &mut File, line: &[u8]) -> io::Result<()> {
    file.write_all(line)?;
    file.write_all(b"\n")?;
    file.flush()
}

fn open_raw_log(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            log::info!("mirroring raw subprocess output to {}", path.display());
            Some(file)
        }
        Err(e) => {
            log::warn!("cannot open raw log {}: {}", path.display(), e);
            None
        }
    }
}
