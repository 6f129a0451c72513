use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::records::{DetectionRecord, Direction, GddTable, RawDetectionMatrix, day_key};

/// What to do with a sampled cell whose day has no GDD entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCovariatePolicy {
    /// Drop the cell and report it.
    #[default]
    Exclude,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct ReshapeOutcome {
    pub records: Vec<DetectionRecord>,
    /// (tree, day) pairs dropped under `MissingCovariatePolicy::Exclude`.
    pub excluded: Vec<(String, String)>,
    /// Distinct directions present in the matrix header, sorted.
    pub directions: Vec<Direction>,
}

/// Splits `<day><direction>` into the day prefix and the trailing direction.
pub fn split_column(name: &str) -> AnalysisResult<(String, Direction)> {
    let name = name.trim();
    let last = name.chars().last().ok_or_else(|| {
        AnalysisError::ShapeMismatch("empty sampling column name".to_string())
    })?;
    let day = &name[..name.len() - last.len_utf8()];
    if day.is_empty() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "sampling column '{}' has no day prefix",
            name
        )));
    }
    Ok((day.to_string(), Direction(last)))
}

pub fn reshape(
    raw: &RawDetectionMatrix,
    gdd: &GddTable,
    policy: MissingCovariatePolicy,
) -> AnalysisResult<ReshapeOutcome> {
    let columns = raw
        .columns
        .iter()
        .map(|c| split_column(c))
        .collect::<AnalysisResult<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for ((day, direction), name) in columns.iter().zip(&raw.columns) {
        if !seen.insert((day_key(day), *direction)) {
            return Err(AnalysisError::ShapeMismatch(format!(
                "duplicate sampling column '{}'",
                name
            )));
        }
    }

    let directions: BTreeSet<Direction> = columns.iter().map(|(_, d)| *d).collect();
    if directions.len() > 2 {
        let found = directions
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");
        return Err(AnalysisError::InvalidDirection(format!(
            "expected at most two sampling directions, found {}",
            found
        )));
    }

    let mut out = ReshapeOutcome {
        records: Vec::with_capacity(raw.n_sampled()),
        excluded: Vec::new(),
        directions: directions.into_iter().collect(),
    };

    for (tree, row) in raw.trees.iter().zip(&raw.counts) {
        for ((day, direction), cell) in columns.iter().zip(row) {
            let Some(count) = *cell else {
                continue;
            };
            match gdd.lookup(day) {
                Some(value) => out.records.push(DetectionRecord::new(
                    tree.clone(),
                    day.clone(),
                    value,
                    *direction,
                    count,
                )),
                None => match policy {
                    MissingCovariatePolicy::Exclude => {
                        out.excluded.push((tree.clone(), day.clone()));
                    }
                    MissingCovariatePolicy::Fail => {
                        return Err(AnalysisError::MissingCovariate {
                            tree: tree.clone(),
                            day: day.clone(),
                        });
                    }
                },
            }
        }
    }

    debug!(
        records = out.records.len(),
        excluded = out.excluded.len(),
        "reshape_done"
    );
    Ok(out)
}
