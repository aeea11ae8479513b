use serde::Serialize;
use tracing::debug;

use crate::cohort::canonical;
use crate::cohort::config::DEFAULT_SENTINEL_PATH;
use crate::cohort::row::{
    CanonicalRow, HEADER_PREFIX, MonthIndex, PathKind, leading_digits, leading_float,
};
use crate::error::CohortError;

const MIN_FIELDS: usize = 6;
const CANONICAL_FIELDS: usize = 7;
const COL_MONTH_INDEX: usize = 0;
const COL_DATE_RANGE: usize = 1;
const COL_COHORT_END: usize = 2;
const COL_PATH: usize = 3;
const COL_VISITORS: usize = 4;
const COL_PURCHASES: usize = 5;
const COL_RATE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Blank,
    Comment,
    Header,
    TooFewFields,
    MissingDateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub total: usize,
    pub valid: usize,
    pub skipped: usize,
    pub first_cohort_start: Option<String>,
    pub last_cohort_start: Option<String>,
}

/// Everything the parser swallowed instead of failing on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestDiagnostics {
    pub blank_lines: usize,
    pub comment_lines: usize,
    pub header_lines: usize,
    pub too_few_fields: usize,
    pub missing_date_range: usize,
    pub unparsed_month_index: usize,
    pub defaulted_visitors: usize,
    pub defaulted_purchases: usize,
    pub defaulted_rate: usize,
    pub unformatted_dates: usize,
}

impl IngestDiagnostics {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Blank => self.blank_lines += 1,
            SkipReason::Comment => self.comment_lines += 1,
            SkipReason::Header => self.header_lines += 1,
            SkipReason::TooFewFields => self.too_few_fields += 1,
            SkipReason::MissingDateRange => self.missing_date_range += 1,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.blank_lines
            + self.comment_lines
            + self.header_lines
            + self.too_few_fields
            + self.missing_date_range
    }

    /// Skips that point at bad data rather than layout (blank, comment, header).
    pub fn malformed_skips(&self) -> usize {
        self.too_few_fields + self.missing_date_range
    }

    pub fn defaulted_total(&self) -> usize {
        self.unparsed_month_index
            + self.defaulted_visitors
            + self.defaulted_purchases
            + self.defaulted_rate
            + self.unformatted_dates
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub rows: Vec<CanonicalRow>,
    pub stats: IngestStats,
    #[serde(skip)]
    pub canonical_csv: String,
    pub diagnostics: IngestDiagnostics,
}

#[derive(Debug, Clone)]
pub struct RowParser {
    sentinel_path: String,
    max_input_bytes: Option<usize>,
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL_PATH)
    }
}

enum LineVerdict {
    Row(CanonicalRow),
    Skip(SkipReason),
}

impl RowParser {
    pub fn new(sentinel_path: impl Into<String>) -> Self {
        Self {
            sentinel_path: sentinel_path.into(),
            max_input_bytes: None,
        }
    }

    pub fn with_max_input_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Decode and parse a whole uploaded document. This is the only fallible
    /// entry point: an oversized or non-UTF-8 document yields no partial result.
    pub fn ingest_bytes(&self, bytes: &[u8]) -> Result<IngestOutcome, CohortError> {
        if let Some(limit) = self.max_input_bytes
            && bytes.len() > limit
        {
            return Err(CohortError::InputTooLarge {
                bytes: bytes.len(),
                limit,
            });
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|err| CohortError::DocumentUnreadable(format!("not valid UTF-8: {err}")))?;
        Ok(self.ingest_text(text))
    }

    pub fn ingest_text(&self, text: &str) -> IngestOutcome {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut rows = Vec::new();
        let mut diagnostics = IngestDiagnostics::default();
        let mut total = 0usize;

        for raw_line in text.split('\n') {
            total += 1;
            match self.parse_line(raw_line.trim(), &mut diagnostics) {
                LineVerdict::Row(row) => rows.push(row),
                LineVerdict::Skip(reason) => diagnostics.record_skip(reason),
            }
        }

        canonical::sort_rows(&mut rows);
        let canonical_csv = canonical::serialize(&rows);

        let stats = IngestStats {
            total,
            valid: rows.len(),
            skipped: diagnostics.skipped_total(),
            first_cohort_start: rows.iter().map(|r| r.cohort_start.clone()).min(),
            last_cohort_start: rows.iter().map(|r| r.cohort_start.clone()).max(),
        };
        debug!(
            total = stats.total,
            valid = stats.valid,
            skipped = stats.skipped,
            "export ingested"
        );

        IngestOutcome {
            rows,
            stats,
            canonical_csv,
            diagnostics,
        }
    }

    fn parse_line(&self, line: &str, diagnostics: &mut IngestDiagnostics) -> LineVerdict {
        if line.is_empty() {
            return LineVerdict::Skip(SkipReason::Blank);
        }
        if line.starts_with('#') {
            return LineVerdict::Skip(SkipReason::Comment);
        }
        if line.starts_with(HEADER_PREFIX) {
            return LineVerdict::Skip(SkipReason::Header);
        }

        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() < MIN_FIELDS {
            return LineVerdict::Skip(SkipReason::TooFewFields);
        }

        let date_field = cols[COL_DATE_RANGE];
        let (cohort_start, cohort_end) = if is_canonical_line(&cols) {
            // Start and end already sit in their own columns.
            (
                date_field.to_string(),
                cols[COL_COHORT_END].to_string(),
            )
        } else {
            if !date_field.contains('-') {
                return LineVerdict::Skip(SkipReason::MissingDateRange);
            }
            let mut parts = date_field.split('-');
            let start_raw = parts.next().unwrap_or_default();
            let end_raw = parts.next().unwrap_or_default();
            for raw in [start_raw, end_raw] {
                if !is_compact_date(raw) {
                    diagnostics.unformatted_dates += 1;
                }
            }
            (format_date(start_raw), format_date(end_raw))
        };

        let month_index = MonthIndex::parse(cols[COL_MONTH_INDEX]);
        if month_index == MonthIndex::Unparsed {
            diagnostics.unparsed_month_index += 1;
        }

        let visitors = leading_digits(cols[COL_VISITORS]).unwrap_or_else(|| {
            diagnostics.defaulted_visitors += 1;
            0
        });
        let purchases = leading_digits(cols[COL_PURCHASES]).unwrap_or_else(|| {
            diagnostics.defaulted_purchases += 1;
            0
        });

        let percentage = match cols.get(COL_RATE).map(|raw| raw.trim()) {
            None | Some("") => "0%".to_string(),
            Some(raw) => format_rate(raw).unwrap_or_else(|| {
                diagnostics.defaulted_rate += 1;
                "0%".to_string()
            }),
        };

        let path = cols[COL_PATH].to_string();
        let kind = PathKind::classify(&path, &self.sentinel_path);

        LineVerdict::Row(CanonicalRow {
            month_index,
            cohort_start,
            cohort_end,
            path,
            kind,
            visitors,
            purchases,
            percentage,
        })
    }
}

fn is_compact_date(raw: &str) -> bool {
    raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYYMMDD` becomes `YYYY-MM-DD`; anything else passes through untouched.
/// A passed-through value never gains a `-`, so it reads back as a start.
pub fn format_date(raw: &str) -> String {
    if !is_compact_date(raw) {
        return raw.to_string();
    }
    format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
}

/// Lines written by the serializer: an ISO start, or an unformatted start
/// (no `-`) on a full-width line whose rate already carries `%`.
fn is_canonical_line(cols: &[&str]) -> bool {
    let start = cols[COL_DATE_RANGE];
    if is_iso_date(start) {
        return true;
    }
    !start.contains('-')
        && cols.len() == CANONICAL_FIELDS
        && cols[COL_RATE].trim().ends_with('%')
}

fn is_iso_date(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// A fractional ratio (`0.1534`, or `0.1534abc` read up to the junk) renders
/// as `15.34%`. A value already carrying
/// `%` is canonical output and is kept verbatim.
fn format_rate(raw: &str) -> Option<String> {
    if let Some(number) = raw.strip_suffix('%') {
        let parsed = number.trim().parse::<f64>().ok()?;
        return parsed.is_finite().then(|| raw.to_string());
    }
    let ratio = leading_float(raw).filter(|v| v.is_finite())?;
    Some(format!("{:.2}%", ratio * 100.0))
}
