use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration as StdDuration;

/// Days an acknowledged pending change survives before retention cleanup.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
/// Characters of the customer name used as the list-number prefix.
pub const DEFAULT_PREFIX_LEN: usize = 4;
/// Milliseconds an advisory-lock acquire polls before giving up.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub numbering: NumberingConfig,
    #[serde(default)]
    pub locking: LockingConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            retention: RetentionConfig::default(),
            numbering: NumberingConfig::default(),
            locking: LockingConfig::default(),
        }
    }
}

impl TrackingConfig {
    /// The retention window as a [`chrono::Duration`].
    #[must_use]
    pub fn retention_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention.acknowledged_days))
    }

    #[must_use]
    pub const fn lock_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.locking.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.retention.acknowledged_days == 0 {
            bail!("retention.acknowledged_days must be at least 1");
        }
        if self.numbering.prefix_len == 0 {
            bail!("numbering.prefix_len must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub acknowledged_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            acknowledged_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberingConfig {
    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            prefix_len: default_prefix_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockingConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Load the tracking config from `path`, falling back to defaults when the
/// file does not exist.
///
/// # Errors
///
/// Returns an error when the file cannot be read, fails to parse as TOML,
/// or carries out-of-range values.
pub fn load_config(path: &Path) -> Result<TrackingConfig> {
    if !path.exists() {
        return Ok(TrackingConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<TrackingConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

const fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

const fn default_prefix_len() -> usize {
    DEFAULT_PREFIX_LEN
}

const fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}
