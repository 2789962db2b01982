//! "Is this pid still running?" as an injectable dependency.

use sysinfo::{Pid, ProcessesToUpdate, System};

pub trait Liveness: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Looks the pid up in the host's process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLiveness;

impl Liveness for SystemLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        system.process(pid).is_some()
    }
}
