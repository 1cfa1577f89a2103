//! Environment loading and structured settings (§6 "Environment contract",
//! §9 Open Question #2, §10 "Configuration"). `.env` is loaded lazily and
//! exactly once via a `once_cell::sync::Lazy`-guarded pattern; every raw
//! value is then run through `clipforge_validation` before it is accepted
//! into `Settings` — nothing reads an env var and uses it unchecked (§4.J,
//! §9).

use std::path::PathBuf;

use clipforge_validation::{safe_bool, safe_float, safe_int, safe_text, ValidationError};
use once_cell::sync::Lazy;
use thiserror::Error;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

/// Forces `.env` to load if it hasn't already. Called once at the top of
/// `Settings::from_env`; exposed separately so the CLI can force it before
/// parsing its own arguments (some of which may reference env-sourced
/// defaults).
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
    #[error("missing required environment variable: {0}")]
    MissingRequired(String),
}

/// §9 Open Question #2: the publishing adapter's `made_for_kids` flag and
/// category id are surfaced as configuration rather than literals baked into
/// the adapter.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub privacy: String,
    pub made_for_kids: bool,
    pub category_id: String,
}

/// §6 "worker-pool sizing overrides": when set, overrides the Stage
/// Registry's default pool size for the named stage (`SCRIPTING_WORKERS`,
/// `NARRATION_WORKERS`, etc). `None` leaves the registry default in place.
#[derive(Debug, Clone, Default)]
pub struct WorkerPoolOverrides {
    pub scripting: Option<usize>,
    pub narration: Option<usize>,
    pub clip_sourcing: Option<usize>,
    pub assembly: Option<usize>,
    pub captioning: Option<usize>,
    pub metadata_synthesis: Option<usize>,
    pub publishing: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the persistent state layout (§6): `<root>/state`,
    /// `<root>/artifacts`, `<root>/logs`, `<root>/credentials`.
    pub data_root: PathBuf,
    /// §9 Open Question #3: retention grace period for terminal items'
    /// artifacts, configurable with a safe default of 7 days.
    pub retention_days: u32,
    pub discovery_interval_secs: u64,
    pub shutdown_drain_timeout_secs: u64,
    pub gc_interval_secs: u64,
    pub ideas_per_ideation_run: usize,
    pub trend_min_score: f64,
    pub clips_needed: usize,
    pub publish: PublishSettings,
    pub worker_pools: WorkerPoolOverrides,
    pub metrics_port: u16,
}

impl Settings {
    pub fn artifact_root(&self) -> PathBuf {
        self.data_root.join("artifacts")
    }

    pub fn items_db_path(&self) -> PathBuf {
        self.data_root.join("state").join("items.db")
    }

    pub fn circuit_breaker_snapshot_path(&self) -> PathBuf {
        self.data_root.join("state").join("circuit-breakers.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_root.join("logs")
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.data_root.join("credentials")
    }

    /// Loads and validates every setting from the process environment (after
    /// forcing `.env` to load). Unset variables fall back to the documented
    /// defaults; set-but-invalid variables are a hard `ConfigError` rather
    /// than a silently-ignored default, since a typo'd override should not
    /// quietly behave as if unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();

        let data_root = env_str("CLIPFORGE_DATA_ROOT").unwrap_or_else(|| "./clipforge-data".to_string());
        let data_root = safe_text("CLIPFORGE_DATA_ROOT", &data_root, 4096)?;

        let retention_days =
            safe_int("ARTIFACT_RETENTION_DAYS", &env_str("ARTIFACT_RETENTION_DAYS").unwrap_or_default(), 1, 365, 7)?
                as u32;
        let discovery_interval_secs = safe_int(
            "DISCOVERY_INTERVAL_SECS",
            &env_str("DISCOVERY_INTERVAL_SECS").unwrap_or_default(),
            1,
            3600,
            5,
        )? as u64;
        let shutdown_drain_timeout_secs = safe_int(
            "SHUTDOWN_DRAIN_TIMEOUT_SECS",
            &env_str("SHUTDOWN_DRAIN_TIMEOUT_SECS").unwrap_or_default(),
            1,
            3600,
            120,
        )? as u64;
        let gc_interval_secs =
            safe_int("GC_INTERVAL_SECS", &env_str("GC_INTERVAL_SECS").unwrap_or_default(), 60, 86_400, 3600)? as u64;
        let ideas_per_ideation_run =
            safe_int("IDEAS_PER_RUN", &env_str("IDEAS_PER_RUN").unwrap_or_default(), 1, 100, 3)? as usize;
        let trend_min_score =
            safe_float("TREND_MIN_SCORE", &env_str("TREND_MIN_SCORE").unwrap_or_default(), 0.0, 1_000_000.0, 50.0)?;
        let clips_needed = safe_int("CLIPS_NEEDED", &env_str("CLIPS_NEEDED").unwrap_or_default(), 1, 20, 3)? as usize;
        let metrics_port =
            safe_int("METRICS_PORT", &env_str("METRICS_PORT").unwrap_or_default(), 1, 65535, 9898)? as u16;

        let publish_privacy = safe_text(
            "PUBLISH_PRIVACY",
            &env_str("PUBLISH_PRIVACY").unwrap_or_else(|| "private".to_string()),
            64,
        )?;
        let made_for_kids =
            safe_bool("PUBLISH_MADE_FOR_KIDS", &env_str("PUBLISH_MADE_FOR_KIDS").unwrap_or_default(), false)?;
        let category_id = safe_text(
            "PUBLISH_CATEGORY_ID",
            &env_str("PUBLISH_CATEGORY_ID").unwrap_or_else(|| "22".to_string()),
            32,
        )?;

        let worker_pools = WorkerPoolOverrides {
            scripting: optional_pool_size("SCRIPTING_WORKERS")?,
            narration: optional_pool_size("NARRATION_WORKERS")?,
            clip_sourcing: optional_pool_size("CLIP_SOURCING_WORKERS")?,
            assembly: optional_pool_size("ASSEMBLY_WORKERS")?,
            captioning: optional_pool_size("CAPTIONING_WORKERS")?,
            metadata_synthesis: optional_pool_size("METADATA_WORKERS")?,
            publishing: optional_pool_size("PUBLISHING_WORKERS")?,
        };

        Ok(Self {
            data_root: PathBuf::from(data_root),
            retention_days,
            discovery_interval_secs,
            shutdown_drain_timeout_secs,
            gc_interval_secs,
            ideas_per_ideation_run,
            trend_min_score,
            clips_needed,
            publish: PublishSettings { privacy: publish_privacy, made_for_kids, category_id },
            worker_pools,
            metrics_port,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn optional_pool_size(key: &str) -> Result<Option<usize>, ConfigError> {
    match env_str(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => Ok(Some(safe_int(key, &raw, 1, 64, 1)? as usize)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_pool_size_is_none_when_unset() {
        std::env::remove_var("CLIPFORGE_TEST_POOL_SIZE_UNSET");
        assert_eq!(optional_pool_size("CLIPFORGE_TEST_POOL_SIZE_UNSET").unwrap(), None);
    }

    #[test]
    fn optional_pool_size_rejects_out_of_range() {
        std::env::set_var("CLIPFORGE_TEST_POOL_SIZE_BAD", "9999");
        assert!(optional_pool_size("CLIPFORGE_TEST_POOL_SIZE_BAD").is_err());
        std::env::remove_var("CLIPFORGE_TEST_POOL_SIZE_BAD");
    }
}
