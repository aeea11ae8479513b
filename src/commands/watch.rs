use anyhow::Result;
use std::path::PathBuf;

use crate::cohort::config::CohortConfig;
use crate::cohort::session::AnalysisSession;
use crate::cohort::watcher;
use crate::commands::CommandReport;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub once: bool,
}

pub fn run(opts: &WatchOptions, cfg: &CohortConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("watch");

    if !opts.once {
        watcher::run_daemon(&opts.input, &opts.out_dir, cfg)?;
        return Ok(report);
    }

    let session = AnalysisSession::new();
    let cycle = watcher::run_once(&session, &opts.input, &opts.out_dir, cfg)?;
    report.detail("watch cycle completed");
    report.detail(format!("input={}", cycle.input.display()));
    report.detail(format!("digest={}", cycle.digest));
    report.detail(format!("refreshed={}", cycle.refreshed));
    report.detail(format!("lines.valid={}", cycle.valid_rows));
    report.detail(format!("lines.skipped={}", cycle.skipped_rows));
    report.detail(format!("analysis_path={}", cycle.analysis_path.display()));
    report.detail(format!("canonical_path={}", cycle.canonical_path.display()));

    Ok(report)
}
