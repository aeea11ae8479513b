use serde::{Serialize, Serializer};
use std::fmt;

/// Logical header of a cohort export, and of the canonical artifact.
pub const EXPORT_HEADER: &str =
    "Monthly cohort,Cohort Start,Cohort End,Page path and screen class,Visitors,Purchases,Percentage";

/// Any line starting with this is treated as a header and skipped.
pub const HEADER_PREFIX: &str = "Monthly cohort";

pub const ROOT_PATH: &str = "/";

/// Months elapsed since the cohort's first month.
///
/// Exports occasionally carry garbage in the index column; such rows are kept
/// (the canonical artifact still lists them) but never feed a grid or rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MonthIndex {
    Parsed(u32),
    Unparsed,
}

impl MonthIndex {
    pub fn parse(raw: &str) -> Self {
        leading_digits(raw)
            .and_then(|n| u32::try_from(n).ok())
            .map_or(Self::Unparsed, Self::Parsed)
    }

    pub fn value(self) -> Option<u32> {
        match self {
            Self::Parsed(n) => Some(n),
            Self::Unparsed => None,
        }
    }
}

impl fmt::Display for MonthIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(n) => write!(f, "{n}"),
            Self::Unparsed => f.write_str("NaN"),
        }
    }
}

impl Serialize for MonthIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Parsed(n) => serializer.serialize_some(n),
            Self::Unparsed => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    SiteWide,
    PerPath,
}

impl PathKind {
    pub fn classify(path: &str, sentinel: &str) -> Self {
        if path == sentinel {
            Self::SiteWide
        } else {
            Self::PerPath
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRow {
    pub month_index: MonthIndex,
    pub cohort_start: String,
    pub cohort_end: String,
    pub path: String,
    pub kind: PathKind,
    pub visitors: u64,
    /// Cumulative through `month_index`, not incremental.
    pub purchases: u64,
    pub percentage: String,
}

impl CanonicalRow {
    pub fn is_site_wide(&self) -> bool {
        self.kind == PathKind::SiteWide
    }
}

/// Leading base-10 digits of `raw` after trimming and an optional `+`.
/// `"12abc"` yields 12, `"abc"` and `"-3"` yield `None`.
pub fn leading_digits(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(unsigned.len(), |(idx, _)| idx);
    unsigned[..end].parse::<u64>().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Longest decimal prefix of `raw` (sign, digits, fraction, exponent) as a
/// float. `"0.25abc"` yields 0.25, `"1e2%"` yields 100, `"abc"` yields `None`.
pub fn leading_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes.get(exp_end..).map_or(0, count_digits);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    trimmed[..end].parse::<f64>().ok()
}
