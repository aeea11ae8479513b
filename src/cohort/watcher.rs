use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::cohort::catalogue::PathCatalogue;
use crate::cohort::chart::ChartSeries;
use crate::cohort::config::CohortConfig;
use crate::cohort::grid::CohortSeries;
use crate::cohort::parser::{IngestDiagnostics, IngestStats};
use crate::cohort::session::{Analysis, AnalysisSession, content_digest};
use crate::cohort::velocity::VelocityReport;

pub const ANALYSIS_FILE: &str = "analysis.json";
pub const CANONICAL_FILE: &str = "canonical.csv";

#[derive(Debug, Clone)]
pub struct WatchCycleOutcome {
    pub input: PathBuf,
    pub digest: String,
    pub refreshed: bool,
    pub valid_rows: usize,
    pub skipped_rows: usize,
    pub analysis_path: PathBuf,
    pub canonical_path: PathBuf,
}

/// What a downstream dashboard reads from the output directory.
#[derive(Debug, Serialize)]
struct AnalysisSnapshot<'a> {
    source_digest: &'a str,
    stats: &'a IngestStats,
    diagnostics: &'a IngestDiagnostics,
    catalogue: &'a PathCatalogue,
    selected_path: &'a str,
    grid: Vec<CohortSeries>,
    chart: ChartSeries,
    velocity: &'a VelocityReport,
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

fn write_outputs(analysis: &Analysis, out_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let selected_path = analysis.resolve_path(None);
    let grid = analysis.grid(selected_path);
    let chart = analysis.chart(selected_path);
    let snapshot = AnalysisSnapshot {
        source_digest: &analysis.source_digest,
        stats: &analysis.ingest.stats,
        diagnostics: &analysis.ingest.diagnostics,
        catalogue: &analysis.catalogue,
        selected_path,
        grid,
        chart,
        velocity: &analysis.velocity,
    };

    let canonical_path = out_dir.join(CANONICAL_FILE);
    write_atomically(&canonical_path, analysis.ingest.canonical_csv.as_bytes())?;
    let analysis_path = out_dir.join(ANALYSIS_FILE);
    let data = serde_json::to_string_pretty(&snapshot)?;
    write_atomically(&analysis_path, format!("{data}\n").as_bytes())?;
    Ok((analysis_path, canonical_path))
}

/// Re-run the pipeline if the input's content changed since the last publish.
pub fn run_once(
    session: &AnalysisSession,
    input: &Path,
    out_dir: &Path,
    cfg: &CohortConfig,
) -> Result<WatchCycleOutcome> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let digest = content_digest(&bytes);

    let refreshed = !session.is_current(&digest);
    if refreshed {
        let analysis = Analysis::from_bytes(&bytes, cfg)?;
        write_outputs(&analysis, out_dir)?;
        info!(
            input = %input.display(),
            digest = %digest,
            valid = analysis.ingest.stats.valid,
            "export refreshed"
        );
        session.publish(analysis);
    }
    let analysis = session
        .current()
        .context("no analysis published after watch cycle")?;

    Ok(WatchCycleOutcome {
        input: input.to_path_buf(),
        digest,
        refreshed,
        valid_rows: analysis.ingest.stats.valid,
        skipped_rows: analysis.ingest.stats.skipped,
        analysis_path: out_dir.join(ANALYSIS_FILE),
        canonical_path: out_dir.join(CANONICAL_FILE),
    })
}

pub fn run_daemon(input: &Path, out_dir: &Path, cfg: &CohortConfig) -> Result<()> {
    info!(
        input = %input.display(),
        out_dir = %out_dir.display(),
        poll_interval_secs = cfg.watch.poll_interval_secs,
        "watching export"
    );
    let session = AnalysisSession::new();
    loop {
        run_once(&session, input, out_dir, cfg)?;
        thread::sleep(Duration::from_secs(cfg.watch.poll_interval_secs));
    }
}
