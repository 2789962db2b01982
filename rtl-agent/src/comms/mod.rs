pub mod line_reader;
pub mod reading;

use crossbeam::channel::{self, Receiver, Sender};

pub use line_reader::{EofSignal, LineReader, LineSource, PipeSource, ReaderHandle, ReaderStats};
pub use reading::{Reading, ReadingError};

/// Raw, undecoded lines as read from the subprocess.
pub type RawLine = Vec<u8>;

/// Bounded queue between the reader thread and the supervisor.
pub fn line_queue(capacity: usize) -> (Sender<RawLine>, Receiver<RawLine>) {
    channel::bounded(capacity)
}
