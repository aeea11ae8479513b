pub mod chart;
pub mod config;
pub mod grid;
pub mod ingest;
pub mod paths;
pub mod velocity;
pub mod watch;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::cohort::config::CohortConfig;
use crate::cohort::parser::IngestOutcome;
use crate::cohort::session::Analysis;
use crate::cohort::warn;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Raw text for stdout (canonical CSV, grid table). Never part of JSON.
    #[serde(skip)]
    pub artifact: Option<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            data: None,
            artifact: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn data(&mut self, value: impl Serialize) -> Result<()> {
        self.data = Some(serde_json::to_value(value)?);
        Ok(())
    }
}

pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn load_analysis(path: &Path, cfg: &CohortConfig) -> Result<Analysis> {
    let bytes = read_input(path)?;
    let analysis = Analysis::from_bytes(&bytes, cfg)
        .with_context(|| format!("failed to ingest {}", path.display()))?;
    emit_ingest_warnings(&analysis.ingest, path);
    Ok(analysis)
}

pub fn emit_ingest_warnings(outcome: &IngestOutcome, source: &Path) {
    let source = source.display().to_string();
    for event in warn::ingest_warnings(&outcome.diagnostics, &source) {
        warn::emit(event);
    }
}

pub fn report_ingest(report: &mut CommandReport, outcome: &IngestOutcome) {
    let stats = &outcome.stats;
    report.detail(format!("lines.total={}", stats.total));
    report.detail(format!("lines.valid={}", stats.valid));
    report.detail(format!("lines.skipped={}", stats.skipped));
    report.detail(format!(
        "cohort_start.first={}",
        stats.first_cohort_start.as_deref().unwrap_or("none")
    ));
    report.detail(format!(
        "cohort_start.last={}",
        stats.last_cohort_start.as_deref().unwrap_or("none")
    ));
    let diagnostics = &outcome.diagnostics;
    if diagnostics.malformed_skips() > 0 {
        report.detail(format!(
            "skipped.malformed={} (too_few_fields={} missing_date_range={})",
            diagnostics.malformed_skips(),
            diagnostics.too_few_fields,
            diagnostics.missing_date_range
        ));
    }
    if diagnostics.defaulted_total() > 0 {
        report.detail(format!("fields.defaulted={}", diagnostics.defaulted_total()));
    }
}
