use serde::Serialize;
use std::collections::BTreeMap;

use crate::cohort::row::{CanonicalRow, PathKind, ROOT_PATH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathOption {
    pub path: String,
    pub kind: PathKind,
    pub display_name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCatalogue {
    pub options: Vec<PathOption>,
    pub default_selection: String,
}

impl PathCatalogue {
    pub fn contains(&self, path: &str) -> bool {
        self.options.iter().any(|o| o.path == path)
    }
}

/// Distinct paths in byte order. The site-wide path is the default selection
/// when present, then the first path, then `/`.
pub fn path_catalogue(rows: &[CanonicalRow], site_wide_label: &str) -> PathCatalogue {
    let mut counts: BTreeMap<&str, (PathKind, usize)> = BTreeMap::new();
    for row in rows {
        counts.entry(row.path.as_str()).or_insert((row.kind, 0)).1 += 1;
    }

    let options: Vec<PathOption> = counts
        .into_iter()
        .map(|(path, (kind, rows))| PathOption {
            path: path.to_string(),
            kind,
            display_name: match kind {
                PathKind::SiteWide => site_wide_label.to_string(),
                PathKind::PerPath => path.to_string(),
            },
            rows,
        })
        .collect();

    let default_selection = options
        .iter()
        .find(|o| o.kind == PathKind::SiteWide)
        .or_else(|| options.first())
        .map_or_else(|| ROOT_PATH.to_string(), |o| o.path.clone());

    PathCatalogue {
        options,
        default_selection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::parser::RowParser;

    fn catalogue(text: &str) -> PathCatalogue {
        let rows = RowParser::default().ingest_text(text).rows;
        path_catalogue(&rows, "All Traffic (Total)")
    }

    #[test]
    fn site_wide_path_is_default() {
        let cat = catalogue(
            "0,20240101-20240131,x,/b,1,0,0\n\
             0,20240101-20240131,x,RESERVED_TOTAL,1,0,0\n\
             1,20240101-20240229,x,/b,1,0,0",
        );
        assert_eq!(cat.default_selection, "RESERVED_TOTAL");
        let paths: Vec<&str> = cat.options.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec!["/b", "RESERVED_TOTAL"]);
        assert_eq!(cat.options[0].rows, 2);
        assert_eq!(cat.options[1].display_name, "All Traffic (Total)");
    }

    #[test]
    fn falls_back_to_first_path_then_root() {
        let cat = catalogue("0,20240101-20240131,x,/z,1,0,0\n0,20240101-20240131,x,/m,1,0,0");
        assert_eq!(cat.default_selection, "/m");
        assert!(cat.contains("/z"));

        let empty = catalogue("");
        assert!(empty.options.is_empty());
        assert_eq!(empty.default_selection, "/");
    }
}
