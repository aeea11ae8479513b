use anyhow::Result;
use std::path::PathBuf;

use crate::cohort::config::CohortConfig;
use crate::commands::{CommandReport, load_analysis};

#[derive(Debug, Clone)]
pub struct PathsOptions {
    pub input: PathBuf,
}

pub fn run(opts: &PathsOptions, cfg: &CohortConfig) -> Result<CommandReport> {
    let analysis = load_analysis(&opts.input, cfg)?;
    let mut report = CommandReport::new("paths");
    let catalogue = &analysis.catalogue;

    report.detail(format!("paths={}", catalogue.options.len()));
    report.detail(format!("default={}", catalogue.default_selection));
    for option in &catalogue.options {
        report.detail(format!(
            "path={} name={} rows={}",
            option.path, option.display_name, option.rows
        ));
    }

    report.data(catalogue)?;
    Ok(report)
}
