use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::cohort::catalogue::{PathCatalogue, path_catalogue};
use crate::cohort::chart::{ChartSeries, build_chart_series};
use crate::cohort::config::CohortConfig;
use crate::cohort::grid::{CohortSeries, build_cohort_grid};
use crate::cohort::parser::{IngestOutcome, RowParser};
use crate::cohort::velocity::{VelocityOptions, VelocityReport, aggregate_velocity};
use crate::error::CohortError;

/// Everything derived from one uploaded export. Built in full, never patched.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub source_digest: String,
    pub ingest: IngestOutcome,
    pub catalogue: PathCatalogue,
    pub velocity: VelocityReport,
}

pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn parser_for(cfg: &CohortConfig) -> RowParser {
    let limit = match cfg.ingest.max_input_bytes {
        0 => None,
        n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
    };
    RowParser::new(cfg.ingest.sentinel_path.clone()).with_max_input_bytes(limit)
}

impl Analysis {
    pub fn from_bytes(bytes: &[u8], cfg: &CohortConfig) -> Result<Self, CohortError> {
        let ingest = parser_for(cfg).ingest_bytes(bytes)?;
        let catalogue = path_catalogue(&ingest.rows, &cfg.report.site_wide_label);
        let velocity = aggregate_velocity(&ingest.rows, &VelocityOptions::from(&cfg.report));
        let source_digest = content_digest(bytes);
        debug!(digest = %source_digest, rows = ingest.rows.len(), "analysis built");

        Ok(Self {
            source_digest,
            ingest,
            catalogue,
            velocity,
        })
    }

    /// `path`, or the catalogue's default selection.
    pub fn resolve_path<'a>(&'a self, path: Option<&'a str>) -> &'a str {
        path.unwrap_or(self.catalogue.default_selection.as_str())
    }

    pub fn grid(&self, path: &str) -> Vec<CohortSeries> {
        build_cohort_grid(&self.ingest.rows, path)
    }

    pub fn chart(&self, path: &str) -> ChartSeries {
        build_chart_series(&self.grid(path))
    }
}

/// Holder for the current analysis. A new upload is analysed off to the side
/// and published with one pointer swap, so readers see the old state or the
/// new one and nothing in between.
#[derive(Debug, Default)]
pub struct AnalysisSession {
    current: RwLock<Option<Arc<Analysis>>>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Analysis>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish(&self, analysis: Analysis) -> Arc<Analysis> {
        let next = Arc::new(analysis);
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&next));
        next
    }

    pub fn is_current(&self, digest: &str) -> bool {
        self.current()
            .is_some_and(|analysis| analysis.source_digest == digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "Monthly cohort,Cohort Start,Cohort End,Page path and screen class,Visitors,Purchases,Percentage\n\
        0,20240101-20240101,x,/,100,10,0.1\n\
        1,20240101-20240201,x,/,100,15,0.15\n\
        0,20240101-20240101,x,RESERVED_TOTAL,400,20,0.05\n\
        1,20240101-20240201,x,RESERVED_TOTAL,400,26,0.065";

    #[test]
    fn end_to_end_export() {
        let analysis = Analysis::from_bytes(EXPORT.as_bytes(), &CohortConfig::default())
            .expect("analysis");
        assert_eq!(analysis.ingest.stats.valid, 4);
        assert_eq!(analysis.ingest.stats.skipped, 1);
        assert_eq!(analysis.resolve_path(None), "RESERVED_TOTAL");

        let grid = analysis.grid("/");
        assert_eq!(grid.len(), 1);
        let p1 = &grid[0].points[&1];
        assert_eq!((p1.cumulative, p1.diff, p1.growth_pct), (15, 5, 50.0));

        let global = &analysis.velocity.global;
        assert_eq!(global.len(), 2);
        assert_eq!(global[0].month.to_string(), "2024-01");
        assert_eq!((global[0].visitors, global[0].purchases), (400, 20));
        assert_eq!(global[1].month.to_string(), "2024-02");
        assert_eq!((global[1].visitors, global[1].purchases), (0, 6));

        let chart = analysis.chart("/");
        assert_eq!(chart.max_month_index, 1);
    }

    #[test]
    fn publish_swaps_whole_analysis() {
        let session = AnalysisSession::new();
        assert!(session.current().is_none());

        let cfg = CohortConfig::default();
        let first = Analysis::from_bytes(EXPORT.as_bytes(), &cfg).expect("first");
        let first_digest = first.source_digest.clone();
        session.publish(first);
        let held = session.current().expect("published");
        assert!(session.is_current(&first_digest));

        let second = Analysis::from_bytes(b"0,20240301-20240331,x,/new,5,1,0.2", &cfg)
            .expect("second");
        session.publish(second);
        assert!(!session.is_current(&first_digest));
        // Earlier readers keep their snapshot intact.
        assert_eq!(held.ingest.stats.valid, 4);
        assert_eq!(session.current().map(|a| a.ingest.stats.valid), Some(1));
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
