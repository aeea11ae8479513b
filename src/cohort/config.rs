use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::CohortError;

pub const DEFAULT_SENTINEL_PATH: &str = "RESERVED_TOTAL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_sentinel_path")]
    pub sentinel_path: String,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,
}

fn default_sentinel_path() -> String {
    DEFAULT_SENTINEL_PATH.to_string()
}

fn default_max_input_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sentinel_path: default_sentinel_path(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_revenue_per_purchase")]
    pub revenue_per_purchase: f64,
    #[serde(default = "default_root_label")]
    pub root_label: String,
    #[serde(default = "default_site_wide_label")]
    pub site_wide_label: String,
}

fn default_revenue_per_purchase() -> f64 {
    85.0
}

fn default_root_label() -> String {
    "Home Page".to_string()
}

fn default_site_wide_label() -> String {
    "All Traffic (Total)".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            revenue_per_purchase: default_revenue_per_purchase(),
            root_label: default_root_label(),
            site_wide_label: default_site_wide_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CohortConfig {
    pub ingest: IngestConfig,
    pub report: ReportConfig,
    pub watch: WatchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialCohortConfig {
    ingest: Option<IngestConfig>,
    report: Option<ReportConfig>,
    watch: Option<WatchConfig>,
    log: Option<LogConfig>,
}

fn env_or_f64(var: &str, fallback: f64) -> f64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<f64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &CohortConfig) -> Result<()> {
    if cfg.ingest.sentinel_path.trim().is_empty() {
        return Err(anyhow!("invalid sentinel path: cannot be empty"));
    }
    let revenue = cfg.report.revenue_per_purchase;
    if !revenue.is_finite() || revenue < 0.0 {
        return Err(anyhow!(
            "invalid revenue per purchase: require a finite value >= 0"
        ));
    }
    if cfg.watch.poll_interval_secs == 0 {
        return Err(anyhow!("invalid watch poll interval: must be >= 1 second"));
    }
    if cfg.log.format != "pretty" && cfg.log.format != "json" {
        return Err(anyhow!("invalid log format: use `pretty` or `json`"));
    }
    Ok(())
}

/// Config path named by `COHORT_CONFIG_PATH`, if any.
pub fn explicit_config_path() -> Option<PathBuf> {
    let custom = env::var("COHORT_CONFIG_PATH").ok()?;
    let trimmed = custom.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(path) = explicit_config_path() {
        return Some(path);
    }

    let home = dirs::home_dir()?;
    Some(home.join(".cohort-lens").join("config.toml"))
}

fn merge_file_config(base: &mut CohortConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialCohortConfig = toml::from_str(&raw).map_err(|err| {
        CohortError::InvalidConfig(format!("failed to parse {}: {err}", path.display()))
    })?;
    if let Some(ingest) = parsed.ingest {
        base.ingest = ingest;
    }
    if let Some(report) = parsed.report {
        base.report = report;
    }
    if let Some(watch) = parsed.watch {
        base.watch = watch;
    }
    if let Some(log) = parsed.log {
        base.log = log;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut CohortConfig) {
    cfg.ingest.sentinel_path = env_or_string("COHORT_SENTINEL_PATH", &cfg.ingest.sentinel_path);
    cfg.ingest.max_input_bytes = env_or_u64("COHORT_MAX_INPUT_BYTES", cfg.ingest.max_input_bytes);
    cfg.report.revenue_per_purchase = env_or_f64(
        "COHORT_REVENUE_PER_PURCHASE",
        cfg.report.revenue_per_purchase,
    );
    cfg.report.root_label = env_or_string("COHORT_ROOT_LABEL", &cfg.report.root_label);
    cfg.watch.poll_interval_secs =
        env_or_u64("COHORT_WATCH_POLL_SECS", cfg.watch.poll_interval_secs);
    cfg.log.level = env_or_string("COHORT_LOG_LEVEL", &cfg.log.level);
    cfg.log.format = env_or_string("COHORT_LOG_FORMAT", &cfg.log.format).to_ascii_lowercase();
}

pub fn load_config() -> Result<CohortConfig> {
    let mut cfg = CohortConfig::default();
    merge_file_config(&mut cfg)?;
    apply_env_overrides(&mut cfg);

    validate(&cfg).map_err(|err| CohortError::InvalidConfig(err.to_string()))?;
    Ok(cfg)
}
