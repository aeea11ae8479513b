use anyhow::Result;
use std::path::PathBuf;

use crate::cohort::config::CohortConfig;
use crate::cohort::grid::{GridMode, render_grid};
use crate::commands::{CommandReport, load_analysis};

#[derive(Debug, Clone)]
pub struct GridOptions {
    pub input: PathBuf,
    pub path: Option<String>,
    pub mode: GridMode,
}

pub fn run(opts: &GridOptions, cfg: &CohortConfig) -> Result<CommandReport> {
    let analysis = load_analysis(&opts.input, cfg)?;
    let mut report = CommandReport::new("grid");

    let path = analysis.resolve_path(opts.path.as_deref());
    let grid = analysis.grid(path);
    report.detail(format!("path={path}"));
    report.detail(format!("cohorts={}", grid.len()));
    if !analysis.catalogue.contains(path) {
        report.detail(format!("path {path} does not appear in the export"));
    }
    if grid.is_empty() {
        report.detail(format!("no cohort rows for path {path}"));
    } else {
        report.artifact = Some(render_grid(&grid, opts.mode));
    }

    report.data(&grid)?;
    Ok(report)
}
