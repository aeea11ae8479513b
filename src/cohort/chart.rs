use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::cohort::grid::{CohortSeries, max_month_index};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CumulativePoint {
    pub index: u32,
    pub values: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalValue {
    pub value: i64,
    pub growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncrementalPoint {
    pub index: u32,
    pub values: BTreeMap<String, IncrementalValue>,
}

/// Month-index keyed series for every cohort of one path. Points are sparse:
/// a cohort without data at an index has no key there, which is not a zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartSeries {
    pub max_month_index: u32,
    pub cumulative: Vec<CumulativePoint>,
    pub incremental: Vec<IncrementalPoint>,
}

pub fn build_chart_series(grid: &[CohortSeries]) -> ChartSeries {
    if grid.is_empty() {
        return ChartSeries::default();
    }

    let max_index = max_month_index(grid);
    let mut cumulative = Vec::with_capacity(max_index as usize + 1);
    let mut incremental = Vec::with_capacity(max_index as usize + 1);

    for index in 0..=max_index {
        let mut c_point = CumulativePoint {
            index,
            values: BTreeMap::new(),
        };
        let mut i_point = IncrementalPoint {
            index,
            values: BTreeMap::new(),
        };

        for cohort in grid {
            let Some(point) = cohort.points.get(&index) else {
                continue;
            };
            c_point
                .values
                .insert(cohort.label.clone(), point.cumulative);
            // Month zero has no prior value; its increment is the whole count.
            let value = if index == 0 {
                i64::try_from(point.cumulative).unwrap_or(i64::MAX)
            } else {
                point.diff
            };
            i_point.values.insert(
                cohort.label.clone(),
                IncrementalValue {
                    value,
                    growth_pct: point.growth_pct,
                },
            );
        }

        cumulative.push(c_point);
        incremental.push(i_point);
    }

    ChartSeries {
        max_month_index: max_index,
        cumulative,
        incremental,
    }
}

impl Serialize for CumulativePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("index", &self.index)?;
        for (label, value) in &self.values {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl Serialize for IncrementalPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() * 2 + 1))?;
        map.serialize_entry("index", &self.index)?;
        for (label, value) in &self.values {
            map.serialize_entry(label, &value.value)?;
            map.serialize_entry(&format!("{label}_growth"), &value.growth_pct)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::grid::build_cohort_grid;
    use crate::cohort::parser::RowParser;
    use serde_json::json;

    fn chart(text: &str, path: &str) -> ChartSeries {
        let rows = RowParser::default().ingest_text(text).rows;
        build_chart_series(&build_cohort_grid(&rows, path))
    }

    #[test]
    fn first_month_increment_caps_at_i64_max() {
        let series = chart("0,20240101-20240131,x,/,10,18446744073709551615,0", "/");
        assert_eq!(series.cumulative[0].values["Jan '24"], u64::MAX);
        assert_eq!(series.incremental[0].values["Jan '24"].value, i64::MAX);
    }

    #[test]
    fn series_are_index_aligned_and_sparse() {
        let series = chart(
            "0,20240101-20240131,x,/,100,10,0.1\n\
             1,20240101-20240229,x,/,100,15,0.15\n\
             2,20240101-20240331,x,/,100,16,0.16\n\
             0,20240201-20240229,x,/,80,4,0.05",
            "/",
        );
        assert_eq!(series.max_month_index, 2);
        assert_eq!(series.cumulative.len(), 3);
        assert_eq!(series.incremental.len(), 3);

        assert_eq!(series.cumulative[0].values["Jan '24"], 10);
        assert_eq!(series.cumulative[0].values["Feb '24"], 4);
        assert!(!series.cumulative[1].values.contains_key("Feb '24"));

        assert_eq!(series.incremental[0].values["Jan '24"].value, 10);
        assert_eq!(series.incremental[1].values["Jan '24"].value, 5);
        assert_eq!(series.incremental[1].values["Jan '24"].growth_pct, 50.0);
        assert_eq!(series.incremental[2].values["Jan '24"].value, 1);
    }

    #[test]
    fn empty_grid_yields_empty_series() {
        let series = chart("0,20240101-20240131,x,/,100,10,0.1", "/other");
        assert_eq!(series, ChartSeries::default());
    }

    #[test]
    fn serializes_flat_label_keys() {
        let series = chart(
            "0,20240101-20240131,x,/,100,10,0.1\n1,20240101-20240229,x,/,100,15,0.15",
            "/",
        );
        let value = serde_json::to_value(&series).expect("serialize");
        assert_eq!(value["cumulative"][1], json!({"index": 1, "Jan '24": 15}));
        assert_eq!(
            value["incremental"][1],
            json!({"index": 1, "Jan '24": 5, "Jan '24_growth": 50.0})
        );
    }
}
