use serde::Serialize;
use std::collections::BTreeMap;

use crate::cohort::calendar::cohort_label;
use crate::cohort::metrics::{count_diff, fixed, growth_pct};
use crate::cohort::row::CanonicalRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub cumulative: u64,
    pub percentage: String,
    /// Change from the previous observed index; 0 for the first.
    pub diff: i64,
    pub growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSeries {
    pub cohort_start: String,
    pub label: String,
    pub visitors: u64,
    pub points: BTreeMap<u32, DataPoint>,
}

impl CohortSeries {
    pub fn max_month_index(&self) -> Option<u32> {
        self.points.keys().next_back().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    #[default]
    Cumulative,
    Percentage,
}

/// Per-cohort retention series for one path, ordered by cohort start.
///
/// Rows without a usable month index are left out. When the export repeats a
/// (cohort, month) pair the later row wins.
pub fn build_cohort_grid(rows: &[CanonicalRow], selected_path: &str) -> Vec<CohortSeries> {
    let mut grouped: BTreeMap<&str, CohortSeries> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.path == selected_path) {
        let Some(month) = row.month_index.value() else {
            continue;
        };
        let series = grouped
            .entry(row.cohort_start.as_str())
            .or_insert_with(|| CohortSeries {
                cohort_start: row.cohort_start.clone(),
                label: cohort_label(&row.cohort_start),
                visitors: row.visitors,
                points: BTreeMap::new(),
            });
        series.points.insert(
            month,
            DataPoint {
                cumulative: row.purchases,
                percentage: row.percentage.clone(),
                diff: 0,
                growth_pct: 0.0,
            },
        );
    }

    let mut out: Vec<CohortSeries> = grouped.into_values().collect();
    for series in &mut out {
        fill_increments(&mut series.points);
    }
    out
}

fn fill_increments(points: &mut BTreeMap<u32, DataPoint>) {
    let mut previous: Option<u64> = None;
    for point in points.values_mut() {
        match previous {
            Some(prev) => {
                point.diff = count_diff(point.cumulative, prev);
                point.growth_pct = growth_pct(point.diff, prev);
            }
            None => {
                point.diff = 0;
                point.growth_pct = 0.0;
            }
        }
        previous = Some(point.cumulative);
    }
}

pub fn max_month_index(grid: &[CohortSeries]) -> u32 {
    grid.iter()
        .filter_map(CohortSeries::max_month_index)
        .max()
        .unwrap_or(0)
}

/// Text for one grid cell; `-` marks no data (and a zero count).
pub fn cell_display(series: &CohortSeries, month: u32, mode: GridMode) -> String {
    let Some(point) = series.points.get(&month) else {
        return "-".to_string();
    };
    if point.cumulative == 0 {
        return "-".to_string();
    }
    match mode {
        GridMode::Cumulative => point.cumulative.to_string(),
        GridMode::Percentage if series.visitors == 0 => "-".to_string(),
        GridMode::Percentage => {
            let pct = point.cumulative as f64 / series.visitors as f64 * 100.0;
            format!("{}%", fixed(pct, 2))
        }
    }
}

/// Fixed-width table: one line per cohort, one column per month index.
pub fn render_grid(grid: &[CohortSeries], mode: GridMode) -> String {
    let max_index = max_month_index(grid);
    let mut header = vec!["cohort".to_string(), "visitors".to_string()];
    header.extend((0..=max_index).map(|i| format!("m{i}")));

    let mut lines = vec![header];
    for series in grid {
        let mut line = vec![series.label.clone(), series.visitors.to_string()];
        line.extend((0..=max_index).map(|i| cell_display(series, i, mode)));
        lines.push(line);
    }

    let columns = lines.first().map_or(0, Vec::len);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            lines
                .iter()
                .map(|line| line[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:>width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
