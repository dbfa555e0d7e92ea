//! Typed configuration for the pipeline's tunables (§4.12 of SPEC_FULL.md).
//!
//! The teacher has no dedicated config module — its tunables are inline constants
//! scattered through `commands/*.rs`. Here they are centralized into one struct with
//! the spec's documented defaults, loadable from a TOML file when an operator needs to
//! override them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::model::SchedulingFlags;

/// Minutes in the spec's default minimum inter-order gap (§4.6).
const DEFAULT_MIN_GAP_MINUTES: i64 = 15;

/// Days in the spec's default calendar horizon (§4.2).
const DEFAULT_HORIZON_DAYS: i64 = 60;

/// Seconds in the spec's default task timeout (§5).
const DEFAULT_TASK_TIMEOUT_SECS: u64 = 600;

/// Base delay, in milliseconds, for the Writer's retry-with-jitter loop (§7).
const DEFAULT_RETRY_BASE_MS: u64 = 50;

/// Maximum persistence-retry attempts before the Writer gives up (§7).
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Horizon, in days, that `Calendar::advance` will search before failing with
    /// `NO_CAPACITY`.
    pub calendar_horizon_days: i64,
    /// Minimum gap, in minutes, enforced between consecutive orders on the same packer.
    pub min_packer_gap_minutes: i64,
    /// Whole-task timeout, in seconds, modelled as an internal cancellation.
    pub task_timeout_secs: u64,
    /// Base delay for the Writer's retry-with-jitter backoff.
    pub retry_base_delay_ms: u64,
    /// Maximum retry attempts for a single persistence operation.
    pub max_persistence_retries: u32,
    /// Default flags applied to a task when the caller does not override them.
    pub default_flags: SchedulingFlags,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            calendar_horizon_days: DEFAULT_HORIZON_DAYS,
            min_packer_gap_minutes: DEFAULT_MIN_GAP_MINUTES,
            task_timeout_secs: DEFAULT_TASK_TIMEOUT_SECS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_MS,
            max_persistence_retries: DEFAULT_MAX_RETRIES,
            default_flags: SchedulingFlags::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file, falling back to `Default` for any field the
    /// file omits.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;
        toml::from_str(&text).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {e}", path.as_ref().display()))
        })
    }

    pub fn min_gap(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_packer_gap_minutes)
    }

    pub fn horizon(&self) -> chrono::Duration {
        chrono::Duration::days(self.calendar_horizon_days)
    }

    pub fn task_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.task_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.calendar_horizon_days, 60);
        assert_eq!(cfg.min_packer_gap_minutes, 15);
        assert_eq!(cfg.task_timeout_secs, 600);
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aps.toml");
        std::fs::write(&path, "min_packer_gap_minutes = 30\n").unwrap();

        let cfg = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(cfg.min_packer_gap_minutes, 30);
        assert_eq!(cfg.calendar_horizon_days, 60);
    }
}
