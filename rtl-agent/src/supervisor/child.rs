//! Handle on the capture subprocess that never outlives its owner.

use std::{
    io,
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, Stdio},
};

pub struct CaptureProcess {
    program: PathBuf,
    child:   Child,
    reaped:  bool,
}

impl CaptureProcess {
    /// Launch `program args…` with stdout piped back to us.
    ///
    /// On Unix the child leads its own process group, so anything it forks
    /// (and that may have inherited the stdout pipe) is torn down with it.
    pub fn spawn(program: &Path, args: &[String]) -> io::Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let child = cmd.spawn()?;
        log::info!("started {} (pid {})", program.display(), child.id());
        Ok(Self { program: program.to_path_buf(), child, reaped: false })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Kill the process (and its group) if still running, then reap it.
    pub fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        self.reaped = true;
        let exited = match self.child.try_wait() {
            Ok(Some(status)) => {
                log::info!("{} exited with {}", self.program.display(), status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("cannot poll {}: {}", self.program.display(), e);
                false
            }
        };
        // Descendants can outlive the leader and keep the pipe open.
        self.kill_group();
        if exited {
            return;
        }
        if let Err(e) = self.child.kill() {
            log::warn!("cannot kill {}: {}", self.program.display(), e);
        }
        match self.child.wait() {
            Ok(status) => log::info!("{} stopped ({})", self.program.display(), status),
            Err(e) => log::warn!("cannot reap {}: {}", self.program.display(), e),
        }
    }

    #[cfg(unix)]
    fn kill_group(&self) {
        let Ok(pgid) = libc::pid_t::try_from(self.child.id()) else {
            return;
        };
        // SAFETY: plain syscall; the group id is our own child's pid, which
        // cannot be recycled while that group still has members.
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                log::warn!("cannot kill process group {}: {}", pgid, err);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
