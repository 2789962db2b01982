// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads the agent's TOML file, deserializes it into `RawConfig`, and
//! converts it into the runtime `Config` (durations parsed, relative paths
//! anchored to the directory holding the file).

use crate::agent_log;
use crate::config::model::{AgentConfig, Config, ConfigError, RawConfig};
use log::Level;
use std::{fs, path::{Path, PathBuf}};

/// Load and parse the configuration from `path`.
/// Logs at DEBUG before reading and INFO on success.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    agent_log!(Level::Debug, "config", "Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let cfg = parse(&txt, base)?;
    agent_log!(Level::Info, "config", "Loaded config from {:?}", path);
    Ok(cfg)
}

/// Parse TOML text; relative paths are resolved against `base`.
pub fn parse(txt: &str, base: &Path) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(txt)?;

    let poll_interval = humantime::parse_duration(&raw.agent.poll_interval)
        .map_err(|e| ConfigError::InvalidDuration(raw.agent.poll_interval.clone(), e))?;
    if raw.agent.queue_capacity == 0 {
        return Err(ConfigError::InvalidCapacity);
    }

    let mut database = raw.database;
    database.path = anchor(base, &database.path);

    let mut subprocess = raw.subprocess;
    subprocess.pid_file = anchor(base, &subprocess.pid_file);

    let mut logging = raw.logging;
    logging.file = anchor(base, &logging.file);
    logging.raw_file = logging.raw_file.map(|p| anchor(base, &p));

    Ok(Config {
        agent: AgentConfig {
            pid_file:       anchor(base, Path::new(&raw.agent.pid_file)),
            queue_capacity: raw.agent.queue_capacity,
            poll_interval,
            debug:          raw.agent.debug,
        },
        subprocess,
        database,
        logging,
    })
}

// The subprocess binary is looked up on $PATH when relative, so it is left alone.
fn anchor(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() { p.to_path_buf() } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MINIMAL: &str = r#"
        [agent]
        pid_file = "/tmp/rtl_433_2sqlite.pid"

        [subprocess]
        path     = "rtl_433"
        pid_file = "/tmp/rtl_433.pid"

        [database]
        path = "sensors.sqlite"
    "#;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg = parse(MINIMAL, Path::new("/srv/rtl")).unwrap();
        assert_eq!(cfg.agent.queue_capacity, 1024);
        assert_eq!(cfg.agent.poll_interval, Duration::from_millis(100));
        assert!(!cfg.agent.debug);
        assert_eq!(cfg.subprocess.args, vec!["-F", "json"]);
        assert_eq!(cfg.database.synchronous, "NORMAL");
        assert_eq!(cfg.database.busy_timeout_ms, 1_000);
        assert_eq!(cfg.logging.level, "INFO");
        assert!(cfg.logging.raw_file.is_none());
    }

    #[test]
    fn default_log_file_sits_beside_config() {
        let cfg = parse(MINIMAL, Path::new("/srv/rtl")).unwrap();
        assert_eq!(cfg.logging.file, PathBuf::from("/srv/rtl/rtl-agent.log"));
    }

    #[test]
    fn relative_paths_anchor_to_config_dir() {
        let cfg = parse(MINIMAL, Path::new("/srv/rtl")).unwrap();
        assert_eq!(cfg.database.path, PathBuf::from("/srv/rtl/sensors.sqlite"));
        assert_eq!(cfg.agent.pid_file, PathBuf::from("/tmp/rtl_433_2sqlite.pid"));
        assert_eq!(cfg.subprocess.path, PathBuf::from("rtl_433"));
    }

    #[test]
    fn humantime_poll_interval() {
        let txt = MINIMAL.replace(
            "pid_file = \"/tmp/rtl_433_2sqlite.pid\"",
            "pid_file = \"/tmp/rtl_433_2sqlite.pid\"\npoll_interval = \"2s 500ms\"",
        );
        let cfg = parse(&txt, Path::new(".")).unwrap();
        assert_eq!(cfg.agent.poll_interval, Duration::from_millis(2_500));
    }

    #[test]
    fn rejects_bad_duration_and_zero_capacity() {
        let bad = MINIMAL.replace(
            "pid_file = \"/tmp/rtl_433_2sqlite.pid\"",
            "pid_file = \"/tmp/x.pid\"\npoll_interval = \"soon\"",
        );
        assert!(matches!(parse(&bad, Path::new(".")), Err(ConfigError::InvalidDuration(..))));

        let zero = MINIMAL.replace(
            "pid_file = \"/tmp/rtl_433_2sqlite.pid\"",
            "pid_file = \"/tmp/x.pid\"\nqueue_capacity = 0",
        );
        assert!(matches!(parse(&zero, Path::new(".")), Err(ConfigError::InvalidCapacity)));
    }

    #[test]
    fn missing_section_is_a_toml_error() {
        let err = parse("[agent]\npid_file = \"a.pid\"\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
