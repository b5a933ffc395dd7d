//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PruneError, Result};

/// Full pipeline configuration model.
///
/// Covers exactly the knobs the engine actually has: worker count, the two
/// group/plan policy flags, the noise-pattern regex, and the comparator's
/// fast-path size threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker count for the parallel relation producer. `0` means fully
    /// synchronous (serial) execution with no thread pool.
    pub max_workers: usize,
    /// `delete_dominated`: fold `DOMINATES` into `SAME` for grouping purposes.
    pub delete_dominated: bool,
    /// `keep_both`: preserve both endpoints of each equivalence run in the plan.
    pub keep_both: bool,
    /// Line-anchored regex whose matches are dropped from diff output before
    /// classification. Default matches classic-diff addition markers (`> `).
    pub noise_pattern: String,
    /// Size (in bytes) of the changed region above which the comparator
    /// short-circuits to `DIFFERENT` without further analysis.
    pub fast_track_threshold_bytes: u64,
    /// Where this config was loaded from, if anywhere (not serialized).
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_worker_count(),
            delete_dominated: false,
            keep_both: false,
            noise_pattern: "^> ".to_string(),
            fast_track_threshold_bytes: 10_000,
            loaded_from: None,
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

impl PipelineConfig {
    /// Default configuration file path: `~/.config/snprune/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[PRN-CONFIG] WARNING: HOME not set, falling back to /etc/snprune");
                PathBuf::from("/etc/snprune")
            },
            PathBuf::from,
        );
        if home_dir == Path::new("/etc/snprune") {
            home_dir.join("config.toml")
        } else {
            home_dir.join(".config").join("snprune").join("config.toml")
        }
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Resolution order for the config file path:
    /// 1. Explicit `path` argument (from `--config` CLI flag)
    /// 2. `PRUNE_CONFIG` environment variable
    /// 3. Default path (`~/.config/snprune/config.toml`)
    ///
    /// A missing config file is not an error when loading from the default
    /// path; built-in defaults are used instead. An explicitly named path
    /// that doesn't exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_config = if path.is_none() {
            env::var_os("PRUNE_CONFIG").map(PathBuf::from)
        } else {
            None
        };

        let effective_path = path.map_or_else(
            || env_config.clone().unwrap_or_else(Self::default_path),
            Path::to_path_buf,
        );
        let is_explicit = path.is_some() || env_config.is_some();

        let mut cfg = if effective_path.exists() {
            let raw = fs::read_to_string(&effective_path)
                .map_err(|source| PruneError::io(effective_path.clone(), source))?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit {
            return Err(PruneError::MissingConfig {
                path: effective_path,
            });
        } else {
            Self::default()
        };

        cfg.loaded_from = Some(effective_path);
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_usize("PRUNE_MAX_WORKERS", &mut self.max_workers)?;
        set_env_bool("PRUNE_DELETE_DOMINATED", &mut self.delete_dominated)?;
        set_env_bool("PRUNE_KEEP_BOTH", &mut self.keep_both)?;
        set_env_u64(
            "PRUNE_FAST_TRACK_THRESHOLD_BYTES",
            &mut self.fast_track_threshold_bytes,
        )?;
        if let Some(raw) = env_var("PRUNE_NOISE_PATTERN") {
            self.noise_pattern = raw;
        }
        Ok(())
    }

    /// Validate invariants the engine relies on (non-empty, compilable
    /// regex; a threshold of zero would make `DOMINATES` unreachable).
    pub fn validate(&self) -> Result<()> {
        if self.fast_track_threshold_bytes == 0 {
            return Err(PruneError::InvalidConfig {
                details: "fast_track_threshold_bytes must be > 0".to_string(),
            });
        }
        regex::Regex::new(&self.noise_pattern).map_err(|error| PruneError::InvalidConfig {
            details: format!("noise_pattern {:?} is not a valid regex: {error}", self.noise_pattern),
        })?;
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_usize(name: &str, slot: &mut usize) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<usize>().map_err(|error| PruneError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_u64(name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u64>().map_err(|error| PruneError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_bool(name: &str, slot: &mut bool) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = match raw.as_str() {
            "1" | "true" | "TRUE" | "yes" => true,
            "0" | "false" | "FALSE" | "no" => false,
            _ => {
                return Err(PruneError::ConfigParse {
                    context: "env",
                    details: format!("{name}={raw:?}: expected a boolean"),
                });
            }
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.max_workers >= 1);
        assert!(!cfg.delete_dominated);
        assert!(!cfg.keep_both);
    }

    #[test]
    fn rejects_zero_threshold() {
        let mut cfg = PipelineConfig::default();
        cfg.fast_track_threshold_bytes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_invalid_regex() {
        let mut cfg = PipelineConfig::default();
        cfg.noise_pattern = "(unclosed".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/snprune/config.toml")));
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            PruneError::MissingConfig { .. }
        ));
    }

    #[test]
    #[allow(unsafe_code)]
    fn load_falls_back_to_defaults_when_default_path_missing() {
        // SAFETY (test-only): scoped to this process; no other test reads PRUNE_CONFIG concurrently in this crate.
        unsafe {
            env::remove_var("PRUNE_CONFIG");
        }
        let cfg = PipelineConfig::load(None).unwrap();
        assert_eq!(cfg.noise_pattern, "^> ");
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "max_workers = 4\nkeep_both = true\ndelete_dominated = true\n",
        )
        .unwrap();

        let cfg = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.max_workers, 4);
        assert!(cfg.keep_both);
        assert!(cfg.delete_dominated);
    }

    #[test]
    #[allow(unsafe_code)]
    fn env_overrides_apply_after_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_workers = 2\n").unwrap();

        // SAFETY (test-only): single-threaded section of this test.
        unsafe {
            env::set_var("PRUNE_MAX_WORKERS", "9");
        }
        let cfg = PipelineConfig::load(Some(&path)).unwrap();
        unsafe {
            env::remove_var("PRUNE_MAX_WORKERS");
        }
        assert_eq!(cfg.max_workers, 9);
    }
}
