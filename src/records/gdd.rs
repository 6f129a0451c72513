use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{AnalysisError, AnalysisResult};

/// Join key for a day identifier: integer-valued numbers compare by value
/// (`01`, `1.0` and `1` are the same day), anything else by its trimmed text.
pub fn day_key(day: &str) -> Cow<'_, str> {
    let day = day.trim();
    match day.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Cow::Owned(format!("{}", v + 0.0)),
        _ => Cow::Borrowed(day),
    }
}

/// Day identifier -> cumulative growing degree days.
#[derive(Debug, Clone, Default)]
pub struct GddTable {
    days: Vec<String>,
    values: Vec<f64>,
    index: HashMap<String, usize>,
}

impl GddTable {
    /// Entries must be in sampling order with non-decreasing, non-negative GDD.
    pub fn new(entries: Vec<(String, f64)>) -> AnalysisResult<Self> {
        let mut table = Self::default();
        for (day, gdd) in entries {
            if !gdd.is_finite() || gdd < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "GDD for day '{}' must be a non-negative number, got {}",
                    day, gdd
                )));
            }
            if let Some(&prev) = table.values.last() {
                if gdd < prev {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "GDD decreases at day '{}' ({} < {})",
                        day, gdd, prev
                    )));
                }
            }
            let key = day_key(&day).into_owned();
            if table.index.contains_key(&key) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "duplicate GDD entry for day '{}'",
                    day
                )));
            }
            table.index.insert(key, table.days.len());
            table.days.push(day);
            table.values.push(gdd);
        }
        Ok(table)
    }

    pub fn lookup(&self, day: &str) -> Option<f64> {
        let key = day_key(day);
        self.index.get(&*key).map(|&i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.days
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
