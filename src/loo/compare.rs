use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::loo::LooEstimate;
use crate::math::stats::variance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub model: String,
    pub elpd_loo: f64,
    pub se_elpd_loo: f64,
    /// Difference from the best model (0 for the best, negative otherwise).
    pub elpd_diff: f64,
    pub se_diff: f64,
    pub p_loo: f64,
    pub looic: f64,
}

/// Models ranked by `elpd_loo`, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooComparison {
    pub rows: Vec<ComparisonRow>,
}

impl LooComparison {
    pub fn best(&self) -> Option<&ComparisonRow> {
        self.rows.first()
    }
}

/// `elpd(a) - elpd(b)` and its standard error from paired pointwise values.
pub fn pairwise_difference(a: &LooEstimate, b: &LooEstimate) -> AnalysisResult<(f64, f64)> {
    if a.pointwise.len() != b.pointwise.len() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "models scored on different observations ({} vs {})",
            a.pointwise.len(),
            b.pointwise.len()
        )));
    }
    let diffs: Vec<f64> = a
        .pointwise
        .iter()
        .zip(&b.pointwise)
        .map(|(x, y)| x.elpd_loo - y.elpd_loo)
        .collect();
    let n = diffs.len() as f64;
    Ok((diffs.iter().sum(), (n * variance(&diffs)).sqrt()))
}

pub fn compare(models: &[(String, LooEstimate)]) -> AnalysisResult<LooComparison> {
    let mut order: Vec<usize> = (0..models.len()).collect();
    order.sort_by(|&a, &b| models[b].1.elpd_loo.total_cmp(&models[a].1.elpd_loo));

    let Some(&best_idx) = order.first() else {
        return Ok(LooComparison { rows: Vec::new() });
    };
    let best = &models[best_idx].1;

    let mut rows = Vec::with_capacity(models.len());
    for idx in order {
        let (name, est) = &models[idx];
        let (elpd_diff, se_diff) = if idx == best_idx {
            (0.0, 0.0)
        } else {
            pairwise_difference(est, best)?
        };
        rows.push(ComparisonRow {
            model: name.clone(),
            elpd_loo: est.elpd_loo,
            se_elpd_loo: est.se_elpd_loo,
            elpd_diff,
            se_diff,
            p_loo: est.p_loo,
            looic: est.looic,
        });
    }
    Ok(LooComparison { rows })
}
