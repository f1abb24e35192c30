use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine-wide tunables, loaded from TOML the way the teacher's own
/// `Config` loads `cap.toml`. Not part of the wire protocol and not
/// required for a single ad-hoc extraction, but every long-running use
/// of the engine wants these externalized rather than hardcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pool: PoolConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum concurrent oracle probes per `solve_tasks` batch.
    pub concurrency_limit: usize,
    /// Open Question (3): abort a batch on the first worker failure
    /// instead of degrading that slot to a sentinel.
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Upper bound on bisected lengths/integers (`limit_count_max`).
    pub limit_count_max: i64,
    /// Open Question (2): treat `size >= limit_count_max - 1` as
    /// outbound instead of the original's exact `==` comparison.
    pub strict_outbound: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pool: PoolConfig {
                concurrency_limit: 5,
                fail_fast: false,
            },
            extraction: ExtractionConfig {
                limit_count_max: 500,
                strict_outbound: false,
            },
        }
    }
}

impl EngineConfig {
    /// Load config from file, or use defaults if the file doesn't exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load config from file (fails if the file doesn't exist).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&contents).context("failed to parse config file")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pool.concurrency_limit, 5);
        assert_eq!(config.extraction.limit_count_max, 500);
        assert!(!config.pool.fail_fast);
        assert!(!config.extraction.strict_outbound);
    }

    #[test]
    fn load_or_default_falls_back_when_file_is_absent() {
        let config = EngineConfig::load_or_default("/nonexistent/path/engine.toml").unwrap();
        assert_eq!(config.pool.concurrency_limit, 5);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.pool.concurrency_limit = 12;
        config.extraction.strict_outbound = true;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.pool.concurrency_limit, 12);
        assert!(loaded.extraction.strict_outbound);
    }
}
