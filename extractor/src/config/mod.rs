//! TOML configuration and hot reload for the extraction pipeline.

mod errors;

pub use errors::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, RwLock};
use std::thread;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;

use shared::constants::{DEFAULT_QUEUE_HARD_CAP, DEFAULT_QUEUE_SOFT_CAP, DEFAULT_RING_CAPACITY};

/// Tuning for the ring/queue/extractor, loaded from TOML and hot-reloadable.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
    #[serde(default = "default_queue_soft_cap")]
    pub queue_soft_cap: usize,
    #[serde(default = "default_queue_hard_cap")]
    pub queue_hard_cap: usize,
    /// `None` means unbounded emits per `extract_messages`/`extract_batch` call.
    #[serde(default)]
    pub extract_budget: Option<usize>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_sink")]
    pub log_sink: String,
}

fn default_ring_capacity() -> usize {
    DEFAULT_RING_CAPACITY
}
fn default_queue_soft_cap() -> usize {
    DEFAULT_QUEUE_SOFT_CAP
}
fn default_queue_hard_cap() -> usize {
    DEFAULT_QUEUE_HARD_CAP
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_sink() -> String {
    "logs".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_capacity: default_ring_capacity(),
            queue_soft_cap: default_queue_soft_cap(),
            queue_hard_cap: default_queue_hard_cap(),
            extract_budget: None,
            log_level: default_log_level(),
            log_sink: default_log_sink(),
        }
    }
}

impl Config {
    /// Loads, parses, and validates a `Config` from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let cfg = Self::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_str(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(ConfigError::Parse)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_capacity == 0 {
            return Err(ConfigError::Validation("ring_capacity must be > 0".into()));
        }
        if self.queue_hard_cap == 0 {
            return Err(ConfigError::Validation("queue_hard_cap must be > 0".into()));
        }
        if self.queue_soft_cap > self.queue_hard_cap {
            return Err(ConfigError::Validation(format!(
                "queue_soft_cap ({}) must be <= queue_hard_cap ({})",
                self.queue_soft_cap, self.queue_hard_cap
            )));
        }
        Ok(())
    }
}

/// Manages a live-updating `Config` via a background file watcher.
pub struct ConfigManager {
    inner: Arc<RwLock<Config>>,
    _watcher: RecommendedWatcher,
}

impl ConfigManager {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Config::load(path)?;
        let shared = Arc::new(RwLock::new(cfg));
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            tx,
            notify::Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| ConfigError::Validation(format!("watcher error: {e}")))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Validation(format!("watch error: {e}")))?;

        let cfg_path: PathBuf = path.to_path_buf();
        let shared_clone = Arc::clone(&shared);
        thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || {
                for evt in rx {
                    let Ok(event) = evt else { continue };
                    if let EventKind::Modify(_) = event.kind {
                        match Config::load(&cfg_path) {
                            Ok(new_cfg) => {
                                *shared_clone.write().expect("config lock poisoned") = new_cfg;
                                log::info!("config reloaded from {}", cfg_path.display());
                            }
                            Err(e) => log::error!("failed to reload config: {e}"),
                        }
                    }
                }
            })
            .expect("failed to spawn config watcher thread");

        Ok(Self {
            inner: shared,
            _watcher: watcher,
        })
    }

    /// Lock-free-for-the-caller snapshot of the current config.
    pub fn get(&self) -> Config {
        self.inner.read().expect("config lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        ring_capacity = 2048
        queue_soft_cap = 10
        queue_hard_cap = 20
        extract_budget = 64
        log_level = "debug"
        log_sink = "logs/extractor"
    "#;

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = Config::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.ring_capacity, 2048);
        assert_eq!(cfg.queue_soft_cap, 10);
        assert_eq!(cfg.queue_hard_cap, 20);
        assert_eq!(cfg.extract_budget, Some(64));
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.log_sink, "logs/extractor");
        cfg.validate().unwrap();
    }

    #[test]
    fn soft_cap_above_hard_cap_is_rejected() {
        let cfg = Config::from_str(
            r#"
            queue_soft_cap = 50
            queue_hard_cap = 10
        "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let cfg = Config::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn zero_ring_capacity_is_rejected() {
        let cfg = Config::from_str("ring_capacity = 0").unwrap();
        assert!(matches!(cfg.validate().unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_str("ring_capacity = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn manager_reloads_on_file_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ring_capacity = 1000\nqueue_hard_cap = 10\n").unwrap();

        let mgr = ConfigManager::new(&path).unwrap();
        assert_eq!(mgr.get().ring_capacity, 1000);

        fs::write(&path, "ring_capacity = 2000\nqueue_hard_cap = 10\n").unwrap();
        // notify's poll watcher ticks at 1s; give the background thread a
        // couple of ticks to notice and reload before asserting.
        std::thread::sleep(Duration::from_millis(2200));
        assert_eq!(mgr.get().ring_capacity, 2000);
    }
}
