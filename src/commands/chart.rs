use anyhow::Result;
use std::path::PathBuf;

use crate::cohort::config::CohortConfig;
use crate::commands::{CommandReport, load_analysis};

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub input: PathBuf,
    pub path: Option<String>,
}

pub fn run(opts: &ChartOptions, cfg: &CohortConfig) -> Result<CommandReport> {
    let analysis = load_analysis(&opts.input, cfg)?;
    let mut report = CommandReport::new("chart");

    let path = analysis.resolve_path(opts.path.as_deref());
    let chart = analysis.chart(path);
    report.detail(format!("path={path}"));
    report.detail(format!("max_month_index={}", chart.max_month_index));
    report.detail(format!("points={}", chart.cumulative.len()));

    report.artifact = Some(serde_json::to_string_pretty(&chart)?);
    report.data(&chart)?;
    Ok(report)
}
