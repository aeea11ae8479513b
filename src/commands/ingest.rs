use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::cohort::config::CohortConfig;
use crate::cohort::session::parser_for;
use crate::commands::{CommandReport, emit_ingest_warnings, read_input, report_ingest};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

pub fn run(opts: &IngestOptions, cfg: &CohortConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("ingest");
    report.detail(format!("input={}", opts.input.display()));

    let bytes = read_input(&opts.input)?;
    let outcome = parser_for(cfg)
        .ingest_bytes(&bytes)
        .with_context(|| format!("failed to ingest {}", opts.input.display()))?;
    emit_ingest_warnings(&outcome, &opts.input);
    report_ingest(&mut report, &outcome);

    if outcome.stats.valid == 0 {
        report.detail("no valid cohort rows found; nothing to analyse");
    }

    match &opts.output {
        Some(path) => {
            fs::write(path, &outcome.canonical_csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            report.detail(format!("output={}", path.display()));
        }
        None => report.artifact = Some(outcome.canonical_csv.clone()),
    }

    report.data(serde_json::json!({
        "stats": outcome.stats,
        "diagnostics": outcome.diagnostics,
    }))?;
    Ok(report)
}
