use anyhow::Result;
use std::env;

use crate::cohort::config::{CohortConfig, explicit_config_path, resolve_config_path};
use crate::commands::CommandReport;

include!(concat!(env!("OUT_DIR"), "/cohort_env_keys.rs"));

pub fn run(cfg: &CohortConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("config");

    report.detail(format!(
        "config_path={}",
        resolve_config_path().map_or_else(|| "none".to_string(), |p| p.display().to_string())
    ));
    if let Some(path) = explicit_config_path()
        && !path.exists()
    {
        report.issue(format!(
            "config file {} does not exist; built-in defaults are in use",
            path.display()
        ));
    }
    report.detail(format!("ingest.sentinel_path={}", cfg.ingest.sentinel_path));
    report.detail(format!("ingest.max_input_bytes={}", cfg.ingest.max_input_bytes));
    report.detail(format!(
        "report.revenue_per_purchase={}",
        cfg.report.revenue_per_purchase
    ));
    report.detail(format!("report.root_label={}", cfg.report.root_label));
    report.detail(format!("report.site_wide_label={}", cfg.report.site_wide_label));
    report.detail(format!("watch.poll_interval_secs={}", cfg.watch.poll_interval_secs));
    report.detail(format!("log.level={}", cfg.log.level));
    report.detail(format!("log.format={}", cfg.log.format));

    for key in GENERATED_COHORT_ENV_KEYS {
        let state = if env::var_os(key).is_some() { "set" } else { "unset" };
        report.detail(format!("env.{key}={state}"));
    }

    report.data(cfg)?;
    Ok(report)
}
