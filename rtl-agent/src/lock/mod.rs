//! Single-instance enforcement through PID marker files.

pub mod liveness;
pub mod pid_marker;

pub use liveness::{Liveness, SystemLiveness};
pub use pid_marker::{Acquired, MarkerError, MarkerLease, PidMarker};
