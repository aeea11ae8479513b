use anyhow::Result;
use std::path::PathBuf;

use crate::cohort::config::CohortConfig;
use crate::commands::{CommandReport, load_analysis};

#[derive(Debug, Clone)]
pub struct VelocityCommandOptions {
    pub input: PathBuf,
    pub top: Option<usize>,
}

pub fn run(opts: &VelocityCommandOptions, cfg: &CohortConfig) -> Result<CommandReport> {
    let analysis = load_analysis(&opts.input, cfg)?;
    let mut report = CommandReport::new("velocity");
    let velocity = &analysis.velocity;
    let overview = &velocity.overview;

    if velocity.global.is_empty() {
        report.detail(format!(
            "no {} rows; global monthly stats are empty",
            cfg.ingest.sentinel_path
        ));
    }
    for bucket in &velocity.global {
        report.detail(format!(
            "month={} visitors={} purchases={} conversion={}% velocity={}/day",
            bucket.month, bucket.visitors, bucket.purchases, bucket.conversion, bucket.velocity
        ));
    }
    report.detail(format!("overview.total_visitors={}", overview.total_visitors));
    report.detail(format!(
        "overview.peak_velocity={} month={}",
        overview.peak_velocity,
        overview
            .peak_month
            .map_or_else(|| "none".to_string(), |m| m.to_string())
    ));
    report.detail(format!(
        "overview.average_conversion={}%",
        overview.average_conversion
    ));
    report.detail(format!(
        "overview.visitor_trend={}%",
        overview.visitor_trend_pct
    ));
    if velocity.unmapped_rows > 0 {
        report.detail(format!(
            "rows.without_calendar_month={}",
            velocity.unmapped_rows
        ));
    }

    let limit = opts.top.unwrap_or(velocity.paths.len());
    for summary in velocity.paths.iter().take(limit) {
        report.detail(format!(
            "path={} label={} visitors={} purchases={} conversion={}% revenue={:.2}",
            summary.path,
            summary.label,
            summary.visitors,
            summary.purchases,
            summary.conversion,
            summary.revenue_estimate
        ));
    }

    let mut data = velocity.clone();
    data.paths.truncate(limit);
    report.data(&data)?;
    Ok(report)
}
