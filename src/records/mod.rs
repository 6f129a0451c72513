//! Field records: GDD lookup, the wide detection matrix and its long form.

mod gdd;
mod observed;
mod reshape;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

pub use gdd::{GddTable, day_key};
pub use observed::{ObservedPoint, observed_summary};
pub use reshape::{MissingCovariatePolicy, ReshapeOutcome, reshape, split_column};

/// Sampling side of the trunk, encoded by the last character of a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Direction(pub char);

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wide per-tree matrix of positive qPCR replicate counts. `None` = not sampled.
#[derive(Debug, Clone)]
pub struct RawDetectionMatrix {
    pub columns: Vec<String>,
    pub trees: Vec<String>,
    pub counts: Vec<Vec<Option<u32>>>,
}

impl RawDetectionMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<(String, Vec<Option<u32>>)>) -> AnalysisResult<Self> {
        let mut trees = Vec::with_capacity(rows.len());
        let mut counts = Vec::with_capacity(rows.len());
        for (tree, row) in rows {
            if row.len() != columns.len() {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "tree '{}' has {} cells, header has {} sampling columns",
                    tree,
                    row.len(),
                    columns.len()
                )));
            }
            trees.push(tree);
            counts.push(row);
        }
        Ok(Self {
            columns,
            trees,
            counts,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_sampled(&self) -> usize {
        self.counts
            .iter()
            .map(|row| row.iter().filter(|c| c.is_some()).count())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub tree: String,
    pub day: String,
    pub gdd: f64,
    pub direction: Direction,
    pub count: u32,
    pub pos: u8,
    pub pos2: u8,
}

impl DetectionRecord {
    pub fn new(tree: String, day: String, gdd: f64, direction: Direction, count: u32) -> Self {
        Self {
            tree,
            day,
            gdd,
            direction,
            count,
            pos: u8::from(count > 0),
            pos2: u8::from(count > 1),
        }
    }
}

/// Observed GDD range over a record set, `None` when empty.
pub fn gdd_range(records: &[DetectionRecord]) -> Option<(f64, f64)> {
    records.iter().fold(None, |acc, r| match acc {
        None => Some((r.gdd, r.gdd)),
        Some((lo, hi)) => Some((lo.min(r.gdd), hi.max(r.gdd))),
    })
}
