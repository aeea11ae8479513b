use std::cmp::Ordering;

use crate::cohort::row::{CanonicalRow, EXPORT_HEADER};

/// Canonical order: path, then cohort start, then month index. Both string
/// keys compare bytewise; ISO dates make that chronological.
pub fn canonical_order(a: &CanonicalRow, b: &CanonicalRow) -> Ordering {
    a.path
        .cmp(&b.path)
        .then_with(|| a.cohort_start.cmp(&b.cohort_start))
        .then_with(|| a.month_index.cmp(&b.month_index))
}

pub fn sort_rows(rows: &mut [CanonicalRow]) {
    rows.sort_by(canonical_order);
}

pub fn to_csv_line(row: &CanonicalRow) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        row.month_index,
        row.cohort_start,
        row.cohort_end,
        row.path,
        row.visitors,
        row.purchases,
        row.percentage
    )
}

/// Header plus one line per row, newline-joined without a trailing newline.
pub fn serialize(rows: &[CanonicalRow]) -> String {
    let mut out = String::with_capacity(EXPORT_HEADER.len() + rows.len() * 64);
    out.push_str(EXPORT_HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(&to_csv_line(row));
    }
    out
}
