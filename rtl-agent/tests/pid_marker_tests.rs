// tests/pid_marker_tests.rs

use std::{
    collections::HashSet,
    fs,
    sync::{Arc, Mutex},
};
use tempfile::tempdir;

use rtl_agent::lock::{Liveness, MarkerError, PidMarker};

/// Liveness oracle driven by the test.
#[derive(Default)]
struct FakeLiveness {
    alive: Mutex<HashSet<u32>>,
}

impl FakeLiveness {
    fn with(pids: &[u32]) -> Arc<Self> {
        Arc::new(Self { alive: Mutex::new(pids.iter().copied().collect()) })
    }

    fn kill(&self, pid: u32) {
        self.alive.lock().unwrap().remove(&pid);
    }
}

impl Liveness for FakeLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}

#[test]
fn new_process_writes_its_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.pid");
    let marker = PidMarker::new(&path, FakeLiveness::with(&[]));

    let acquired = marker.create(77777).unwrap();

    assert_eq!(acquired.stale, None);
    assert_eq!(fs::read_to_string(&path).unwrap().trim().parse::<u32>().unwrap(), 77777);
    assert_eq!(marker.recorded_pid().unwrap(), Some(77777));
}

#[test]
fn second_create_while_alive_is_already_running() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.pid");
    let marker = PidMarker::new(&path, FakeLiveness::with(&[77777]));

    marker.create(77777).unwrap();
    let err = marker.create(77778).unwrap_err();

    match err {
        MarkerError::AlreadyRunning { pid, .. } => assert_eq!(pid, 77777),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }
    assert_eq!(marker.recorded_pid().unwrap(), Some(77777));
}

#[test]
fn stale_marker_is_taken_over() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.pid");
    let liveness = FakeLiveness::with(&[77777]);
    let marker = PidMarker::new(&path, liveness.clone());

    marker.create(77777).unwrap();
    liveness.kill(77777);
    let acquired = marker.create(77778).unwrap();

    assert_eq!(acquired.stale, Some(77777));
    assert_eq!(marker.recorded_pid().unwrap(), Some(77778));
}

#[test]
fn garbage_marker_counts_as_stale() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.pid");
    fs::write(&path, "not-a-pid").unwrap();
    let marker = PidMarker::new(&path, FakeLiveness::with(&[]));

    assert_eq!(marker.ensure_vacant().unwrap(), None);
    marker.create(42).unwrap();
    assert_eq!(marker.recorded_pid().unwrap(), Some(42));
}

#[test]
fn delete_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.pid");
    let marker = PidMarker::new(&path, FakeLiveness::with(&[]));

    marker.create(1).unwrap();
    marker.delete().unwrap();
    assert!(!path.exists());
    marker.delete().unwrap();
}

#[test]
fn ensure_vacant_never_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rtl_433.pid");
    let marker = PidMarker::new(&path, FakeLiveness::with(&[5]));

    assert_eq!(marker.ensure_vacant().unwrap(), None);
    assert!(!path.exists());

    fs::write(&path, "5\n").unwrap();
    assert!(matches!(marker.ensure_vacant(), Err(MarkerError::AlreadyRunning { pid: 5, .. })));
}

#[test]
fn lease_removes_marker_on_drop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("agent.pid");
    let marker = PidMarker::new(&path, FakeLiveness::with(&[9]));

    {
        let lease = marker.acquire(9).unwrap();
        assert_eq!(lease.pid(), 9);
        assert!(path.exists());
        assert!(marker.acquire(10).is_err());
    }
    assert!(!path.exists());

    let lease = marker.acquire(10).unwrap();
    lease.release().unwrap();
    assert!(!path.exists());
}

#[test]
fn system_liveness_sees_this_process() {
    let dir = tempdir().unwrap();
    let marker = PidMarker::system(dir.path().join("agent.pid"));

    marker.create(std::process::id()).unwrap();
    assert!(marker.create(std::process::id()).is_err());
}
