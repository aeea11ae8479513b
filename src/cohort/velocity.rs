//! Calendar-month purchase velocity and path ranking.
//!
//! Cohort rows are regrouped by (path, cohort start) across every path, their
//! cumulative purchases turned into per-month increments, and each increment
//! placed in the absolute calendar month it happened in. Global monthly stats
//! come only from site-wide rows; per-path rows would double count against
//! them.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::cohort::calendar::{CalendarMonth, calendar_month};
use crate::cohort::config::ReportConfig;
use crate::cohort::metrics::{conversion_pct, fixed, round_to, velocity};
use crate::cohort::row::{CanonicalRow, ROOT_PATH};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: CalendarMonth,
    pub visitors: u64,
    pub purchases: u64,
    pub conversion: String,
    pub velocity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub month: CalendarMonth,
    pub purchases: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSummary {
    pub path: String,
    pub label: String,
    pub visitors: u64,
    pub purchases: u64,
    pub conversion: String,
    pub revenue_estimate: f64,
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OverviewSummary {
    pub total_visitors: u64,
    pub peak_velocity: String,
    pub peak_month: Option<CalendarMonth>,
    pub average_conversion: String,
    pub visitor_trend_pct: String,
    pub latest: Option<MonthBucket>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VelocityReport {
    pub global: Vec<MonthBucket>,
    pub overview: OverviewSummary,
    pub paths: Vec<PathSummary>,
    pub max_path_visitors: u64,
    /// Rows whose cohort start is not a date and so have no calendar month.
    pub unmapped_rows: usize,
}

#[derive(Debug, Clone)]
pub struct VelocityOptions {
    pub root_label: String,
    pub revenue_per_purchase: f64,
}

impl Default for VelocityOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for VelocityOptions {
    fn from(cfg: &ReportConfig) -> Self {
        Self {
            root_label: cfg.root_label.clone(),
            revenue_per_purchase: cfg.revenue_per_purchase,
        }
    }
}

#[derive(Debug, Default)]
struct MonthTotals {
    visitors: u64,
    purchases: u64,
}

#[derive(Debug, Default)]
struct PathTotals {
    site_wide: bool,
    visitors: u64,
    purchases: u64,
    trend: BTreeMap<CalendarMonth, u64>,
}

/// Purchases newly attributed at each row of one cohort, in row order.
/// A cumulative value that goes backwards contributes 0, and the next row is
/// measured against the raw (regressed) value.
pub fn clamped_increments(cumulative: &[u64]) -> Vec<u64> {
    let mut prev = 0u64;
    cumulative
        .iter()
        .map(|&current| {
            let incremental = current.saturating_sub(prev);
            prev = current;
            incremental
        })
        .collect()
}

pub fn aggregate_velocity(rows: &[CanonicalRow], opts: &VelocityOptions) -> VelocityReport {
    let mut cohorts: BTreeMap<(&str, &str), Vec<(u32, &CanonicalRow)>> = BTreeMap::new();
    for row in rows {
        let Some(month) = row.month_index.value() else {
            continue;
        };
        cohorts
            .entry((row.path.as_str(), row.cohort_start.as_str()))
            .or_default()
            .push((month, row));
    }

    let mut global: BTreeMap<CalendarMonth, MonthTotals> = BTreeMap::new();
    let mut per_path: BTreeMap<&str, PathTotals> = BTreeMap::new();
    let mut unmapped_rows = 0usize;

    for ((path, cohort_start), mut members) in cohorts {
        members.sort_by_key(|(month, _)| *month);
        let site_wide = members.iter().any(|(_, row)| row.is_site_wide());

        let cohort_visitors = members
            .iter()
            .find(|(month, _)| *month == 0)
            .or_else(|| members.first())
            .map_or(0, |(_, row)| row.visitors);

        let totals = per_path.entry(path).or_default();
        totals.site_wide |= site_wide;
        totals.visitors = totals.visitors.saturating_add(cohort_visitors);

        if site_wide && let Some(start_month) = CalendarMonth::of_cohort_start(cohort_start) {
            let bucket = global.entry(start_month).or_default();
            bucket.visitors = bucket.visitors.saturating_add(cohort_visitors);
        }

        let cumulative: Vec<u64> = members.iter().map(|(_, row)| row.purchases).collect();
        for ((month, _), incremental) in members.iter().zip(clamped_increments(&cumulative)) {
            totals.purchases = totals.purchases.saturating_add(incremental);

            let Some(cal_month) = calendar_month(cohort_start, *month) else {
                unmapped_rows += 1;
                continue;
            };
            if site_wide {
                let bucket = global.entry(cal_month).or_default();
                bucket.purchases = bucket.purchases.saturating_add(incremental);
            }
            let month_total = totals.trend.entry(cal_month).or_default();
            *month_total = month_total.saturating_add(incremental);
        }
    }

    let global: Vec<MonthBucket> = global
        .into_iter()
        .map(|(month, totals)| MonthBucket {
            month,
            visitors: totals.visitors,
            purchases: totals.purchases,
            conversion: conversion_pct(totals.purchases, totals.visitors),
            velocity: velocity(totals.purchases, month.days()),
        })
        .collect();

    let mut paths: Vec<PathSummary> = per_path
        .into_iter()
        .filter(|(_, totals)| !totals.site_wide)
        .map(|(path, totals)| PathSummary {
            path: path.to_string(),
            label: path_label(path, &opts.root_label),
            visitors: totals.visitors,
            purchases: totals.purchases,
            conversion: conversion_pct(totals.purchases, totals.visitors),
            revenue_estimate: totals.purchases as f64 * opts.revenue_per_purchase,
            trend: totals
                .trend
                .into_iter()
                .map(|(month, purchases)| TrendPoint { month, purchases })
                .collect(),
        })
        .collect();
    // Stable: equal traffic keeps path order.
    paths.sort_by(|a, b| b.visitors.cmp(&a.visitors));

    debug!(
        months = global.len(),
        paths = paths.len(),
        unmapped_rows,
        "velocity aggregated"
    );

    VelocityReport {
        overview: summarize(&global),
        max_path_visitors: paths.iter().map(|p| p.visitors).max().unwrap_or(0),
        global,
        paths,
        unmapped_rows,
    }
}

pub fn summarize(global: &[MonthBucket]) -> OverviewSummary {
    let total_visitors = global
        .iter()
        .fold(0u64, |sum, b| sum.saturating_add(b.visitors));

    let velocities: Vec<f64> = global
        .iter()
        .map(|b| b.velocity.parse::<f64>().unwrap_or(0.0))
        .collect();
    let peak = velocities.iter().copied().fold(None, |best: Option<f64>, v| {
        Some(best.map_or(v, |b| b.max(v)))
    });
    let peak_month = peak.and_then(|max| {
        global
            .iter()
            .zip(&velocities)
            .find(|(_, v)| **v == max)
            .map(|(b, _)| b.month)
    });

    let conversion_sum: f64 = global
        .iter()
        .map(|b| b.conversion.parse::<f64>().unwrap_or(0.0))
        .sum();
    let average_conversion = fixed(conversion_sum / global.len().max(1) as f64, 2);

    let visitor_trend_pct = match global {
        [.., previous, latest] if previous.visitors > 0 => {
            let change = latest.visitors as f64 - previous.visitors as f64;
            fixed(round_to(change / previous.visitors as f64 * 100.0, 1), 1)
        }
        _ => fixed(0.0, 1),
    };

    OverviewSummary {
        total_visitors,
        peak_velocity: fixed(peak.unwrap_or(0.0), 1),
        peak_month,
        average_conversion,
        visitor_trend_pct,
        latest: global.last().cloned(),
    }
}

/// Human label for a page path: the root maps to `root_label`, anything else
/// to its last non-empty segment with hyphens as spaces and words capitalised.
pub fn path_label(path: &str, root_label: &str) -> String {
    if path == ROOT_PATH {
        return root_label.to_string();
    }
    let Some(last) = path.split('/').filter(|s| !s.is_empty()).next_back() else {
        return path.to_string();
    };
    capitalize_words(&last.replace('-', " "))
}

fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_boundary = true;
    for ch in text.chars() {
        let is_word = ch.is_ascii_alphanumeric() || ch == '_';
        if is_word && at_boundary {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_boundary = !is_word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::parser::RowParser;

    fn report(text: &str) -> VelocityReport {
        let rows = RowParser::default().ingest_text(text).rows;
        aggregate_velocity(&rows, &VelocityOptions::default())
    }

    #[test]
    fn huge_counts_saturate_totals() {
        let out = report(
            "0,20240101-20240131,x,RESERVED_TOTAL,18446744073709551615,18446744073709551615,0\n\
             0,20240201-20240229,x,RESERVED_TOTAL,18446744073709551615,18446744073709551615,0\n\
             0,20240101-20240131,x,/big,18446744073709551615,18446744073709551615,0\n\
             0,20240201-20240229,x,/big,18446744073709551615,18446744073709551615,0",
        );
        assert_eq!(out.paths.len(), 1);
        assert_eq!(out.paths[0].visitors, u64::MAX);
        assert_eq!(out.paths[0].purchases, u64::MAX);
        assert_eq!(out.global.len(), 2);
        assert_eq!(out.overview.total_visitors, u64::MAX);
    }

    #[test]
    fn regressions_clamp_to_zero() {
        assert_eq!(clamped_increments(&[5, 3, 10]), vec![5, 0, 7]);
        assert_eq!(clamped_increments(&[]), Vec::<u64>::new());
        assert_eq!(clamped_increments(&[0, 0, 4]), vec![0, 0, 4]);
    }

    #[test]
    fn global_buckets_follow_site_wide_rows() {
        let out = report(
            "0,20240101-20240131,x,/,100,10,0.1\n\
             1,20240101-20240229,x,/,100,15,0.15\n\
             0,20240101-20240131,x,RESERVED_TOTAL,1000,50,0.05\n\
             1,20240101-20240229,x,RESERVED_TOTAL,1000,112,0.112",
        );
        assert_eq!(out.global.len(), 2);
        let jan = &out.global[0];
        assert_eq!(jan.month.to_string(), "2024-01");
        assert_eq!((jan.visitors, jan.purchases), (1000, 50));
        assert_eq!(jan.conversion, "5.00");
        assert_eq!(jan.velocity, "1.6");
        let feb = &out.global[1];
        assert_eq!(feb.month.to_string(), "2024-02");
        assert_eq!((feb.visitors, feb.purchases), (0, 62));
        assert_eq!(feb.conversion, "0.00");
        assert_eq!(feb.velocity, "2.1");

        assert_eq!(out.paths.len(), 1);
        assert_eq!(out.paths[0].path, "/");
        assert_eq!(out.paths[0].label, "Home Page");
    }

    #[test]
    fn per_path_only_exports_have_no_global_stats() {
        let out = report(
            "0,20240101-20240131,x,/a,10,1,0.1\n\
             0,20240101-20240131,x,/b,20,2,0.1",
        );
        assert!(out.global.is_empty());
        assert_eq!(out.overview.total_visitors, 0);
        assert_eq!(out.overview.peak_month, None);
        assert_eq!(out.paths.len(), 2);
    }

    #[test]
    fn path_totals_count_visitors_once_per_cohort() {
        let out = report(
            "0,20240101-20240131,x,/shop,100,5,0.05\n\
             1,20240101-20240229,x,/shop,100,3,0.03\n\
             2,20240101-20240331,x,/shop,100,10,0.1\n\
             0,20240201-20240229,x,/shop,40,2,0.05",
        );
        let shop = &out.paths[0];
        assert_eq!(shop.visitors, 140);
        assert_eq!(shop.purchases, 14);
        assert_eq!(shop.conversion, "10.00");
        assert_eq!(shop.revenue_estimate, 14.0 * 85.0);
        let trend: Vec<(String, u64)> = shop
            .trend
            .iter()
            .map(|t| (t.month.to_string(), t.purchases))
            .collect();
        assert_eq!(
            trend,
            vec![
                ("2024-01".to_string(), 5),
                ("2024-02".to_string(), 2),
                ("2024-03".to_string(), 7),
            ]
        );
    }

    #[test]
    fn cohort_visitors_prefer_month_zero_row() {
        let out = report(
            "1,20240101-20240229,x,/a,90,3,0.03\n\
             0,20240101-20240131,x,/a,100,1,0.01",
        );
        assert_eq!(out.paths[0].visitors, 100);

        let out = report("2,20240101-20240331,x,/b,70,3,0.03");
        assert_eq!(out.paths[0].visitors, 70);
    }

    #[test]
    fn paths_rank_by_visitors_descending() {
        let out = report(
            "0,20240101-20240131,x,/a,10,1,0.1\n\
             0,20240101-20240131,x,/b,30,1,0.1\n\
             0,20240101-20240131,x,/c,30,1,0.1",
        );
        let order: Vec<&str> = out.paths.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(order, vec!["/b", "/c", "/a"]);
        assert_eq!(out.max_path_visitors, 30);
    }

    #[test]
    fn undated_cohorts_still_count_toward_totals() {
        let out = report("0,2024011-20240131,x,/a,10,4,0.4");
        assert_eq!(out.unmapped_rows, 1);
        assert_eq!(out.paths[0].purchases, 4);
        assert!(out.paths[0].trend.is_empty());
    }

    #[test]
    fn overview_tracks_peak_and_trend() {
        let out = report(
            "0,20240101-20240131,x,RESERVED_TOTAL,1000,31,0.031\n\
             1,20240101-20240229,x,RESERVED_TOTAL,1000,89,0.089\n\
             0,20240201-20240229,x,RESERVED_TOTAL,1500,29,0.019",
        );
        let overview = &out.overview;
        assert_eq!(overview.total_visitors, 2500);
        // Feb: (58 + 29) / 29 days.
        assert_eq!(overview.peak_velocity, "3.0");
        assert_eq!(overview.peak_month.map(|m| m.to_string()).as_deref(), Some("2024-02"));
        assert_eq!(overview.visitor_trend_pct, "50.0");
        assert_eq!(overview.average_conversion, "4.45");
        assert_eq!(
            overview.latest.as_ref().map(|b| b.month.to_string()).as_deref(),
            Some("2024-02")
        );
    }

    #[test]
    fn labels_derive_from_last_segment() {
        assert_eq!(path_label("/blog/my-great-post", "Home Page"), "My Great Post");
        assert_eq!(path_label("/", "Home Page"), "Home Page");
        assert_eq!(path_label("/shop/", "Home Page"), "Shop");
        assert_eq!(path_label("///", "Home Page"), "///");
        assert_eq!(path_label("/a/sale_2024-x", "Home Page"), "Sale_2024 X");
    }
}
