//! Process configuration: defaults, on-disk location, load/save.
//!
//! Generalizes `internal/config/config.go` from the original implementation:
//! same three fields, same defaults, same "write defaults on first run"
//! behavior, but resolved via the `directories` crate instead of
//! `os.UserConfigDir()` + a hand-joined path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "";
const APPLICATION: &str = "queuectl";
const CONFIG_FILE_NAME: &str = "config.json";

/// Process-wide configuration, persisted as pretty-printed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: String,
    pub max_retries: i64,
    pub backoff_base: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: "./db".to_string(),
            max_retries: 3,
            backoff_base: 2.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a config directory for this platform")]
    NoConfigDir,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Resolves (and creates) the per-user config directory, returning the path
/// to `config.json` within it.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .ok_or(ConfigError::NoConfigDir)?;
    let dir = dirs.config_dir();
    std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Loads the config from disk, writing out defaults on first run.
pub fn load() -> Result<Config, ConfigError> {
    let path = config_path()?;
    load_from(&path)
}

fn load_from(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            let cfg = Config::default();
            save_to(path, &cfg)?;
            Ok(cfg)
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists the config as pretty-printed JSON.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path()?;
    save_to(&path, cfg)
}

fn save_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    let data = serde_json::to_string_pretty(cfg).expect("Config serialization is infallible");
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Recognised keys for `config set`.
pub fn set_key(cfg: &mut Config, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "max-retries" => {
            let parsed: i64 = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            cfg.max_retries = parsed;
        }
        "backoff-base" => {
            let parsed: f64 = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            cfg.backoff_base = parsed;
        }
        other => return Err(ConfigError::UnknownKey(other.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.data_dir, "./db");
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.backoff_base, 2.0);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile_dir();
        let path = dir.join("config.json");
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_existing_file_round_trips() {
        let dir = tempfile_dir();
        let path = dir.join("config.json");
        let cfg = Config {
            data_dir: "/tmp/queuectl".to_string(),
            max_retries: 7,
            backoff_base: 1.5,
        };
        save_to(&path, &cfg).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn set_key_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = set_key(&mut cfg, "nope", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(k) if k == "nope"));
    }

    #[test]
    fn set_key_rejects_non_numeric_value() {
        let mut cfg = Config::default();
        let err = set_key(&mut cfg, "max-retries", "not-a-number").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn set_key_updates_recognised_keys() {
        let mut cfg = Config::default();
        set_key(&mut cfg, "max-retries", "9").unwrap();
        set_key(&mut cfg, "backoff-base", "3.5").unwrap();
        assert_eq!(cfg.max_retries, 9);
        assert_eq!(cfg.backoff_base, 3.5);
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "queuectl-config-test-{}-{}",
            std::process::id(),
            ADDR_COUNTER.next()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    struct Counter(std::sync::atomic::AtomicU64);
    impl Counter {
        fn next(&self) -> u64 {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        }
    }
    static ADDR_COUNTER: Counter = Counter(std::sync::atomic::AtomicU64::new(0));
}
