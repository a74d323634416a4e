//! Daemon configuration.
//!
//! Resolution order: built-in defaults, then `primerd.json` in the data
//! directory (or the file named by `PRIMER_CONFIG`), then individual
//! `PRIMER_*` environment overrides. Timing knobs are clamped to sane ranges.

use crate::error::DaemonError;
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ENV_CONFIG: &str = "PRIMER_CONFIG";
pub const ENV_LISTEN_ADDR: &str = "PRIMER_LISTEN_ADDR";
pub const ENV_REVEAL_DELAY_MS: &str = "PRIMER_REVEAL_DELAY_MS";
pub const ENV_TYPEWRITER_TICK_MS: &str = "PRIMER_TYPEWRITER_TICK_MS";

fn default_listen_addr() -> String {
    "127.0.0.1:9877".to_string()
}

fn default_reveal_delay_ms() -> u64 {
    800
}

fn default_typewriter_tick_ms() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Delay between two revealed self-consistency paths.
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
    /// Typewriter cadence, one character per tick.
    #[serde(default = "default_typewriter_tick_ms")]
    pub typewriter_tick_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            reveal_delay_ms: default_reveal_delay_ms(),
            typewriter_tick_ms: default_typewriter_tick_ms(),
        }
    }
}

/// Timer periods handed to every widget session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub reveal_delay: Duration,
    pub typewriter_tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        DaemonConfig::default().timing()
    }
}

impl DaemonConfig {
    pub fn load(paths: &AppPaths) -> Result<Self, DaemonError> {
        let file = std::env::var_os(ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.config_file());

        let mut cfg = if file.exists() {
            let cfg = Self::from_file(&file)?;
            info!("Loaded config from {:?}", file);
            cfg
        } else {
            debug!("No config file at {:?}; using defaults", file);
            Self::default()
        };

        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.clamp();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, DaemonError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| DaemonError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PRIMER_*` overrides. Unparseable values are logged and skipped.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get(ENV_LISTEN_ADDR) {
            let v = v.trim();
            if v.is_empty() {
                warn!("Ignoring empty {}", ENV_LISTEN_ADDR);
            } else {
                self.listen_addr = v.to_string();
            }
        }
        if let Some(ms) = parse_ms(&get, ENV_REVEAL_DELAY_MS) {
            self.reveal_delay_ms = ms;
        }
        if let Some(ms) = parse_ms(&get, ENV_TYPEWRITER_TICK_MS) {
            self.typewriter_tick_ms = ms;
        }
    }

    pub fn clamp(&mut self) {
        self.reveal_delay_ms = self.reveal_delay_ms.clamp(10, 60_000);
        self.typewriter_tick_ms = self.typewriter_tick_ms.clamp(1, 1_000);
    }

    pub fn timing(&self) -> Timing {
        Timing {
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
            typewriter_tick: Duration::from_millis(self.typewriter_tick_ms),
        }
    }
}

fn parse_ms<F>(get: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!("Unknown {} value: {}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_widget_cadence() {
        let t = Timing::default();
        assert_eq!(t.reveal_delay, Duration::from_millis(800));
        assert_eq!(t.typewriter_tick, Duration::from_millis(30));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: DaemonConfig = serde_json::from_str(r#"{ "reveal_delay_ms": 400 }"#).unwrap();
        assert_eq!(cfg.reveal_delay_ms, 400);
        assert_eq!(cfg.typewriter_tick_ms, 30);
        assert_eq!(cfg.listen_addr, "127.0.0.1:9877");
    }

    #[test]
    fn env_overrides_and_bad_values_are_skipped() {
        let mut cfg = DaemonConfig::default();
        cfg.apply_env(env(&[
            (ENV_LISTEN_ADDR, "0.0.0.0:7000"),
            (ENV_REVEAL_DELAY_MS, "soon"),
            (ENV_TYPEWRITER_TICK_MS, " 15 "),
        ]));
        assert_eq!(cfg.listen_addr, "0.0.0.0:7000");
        assert_eq!(cfg.reveal_delay_ms, 800);
        assert_eq!(cfg.typewriter_tick_ms, 15);
    }

    #[test]
    fn timing_is_clamped() {
        let mut cfg = DaemonConfig {
            reveal_delay_ms: 0,
            typewriter_tick_ms: 90_000,
            ..DaemonConfig::default()
        };
        cfg.clamp();
        assert_eq!(cfg.reveal_delay_ms, 10);
        assert_eq!(cfg.typewriter_tick_ms, 1_000);
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = std::env::temp_dir().join(format!("primerd-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("primerd.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = DaemonConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, DaemonError::Config { .. }));
        assert!(err.to_string().contains("primerd.json"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
