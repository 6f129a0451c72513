use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::math::stats::{mean, variance};
use crate::model::DrawSet;

/// Split R-hat above this marks a parameter as not converged.
pub const RHAT_THRESHOLD: f64 = 1.05;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Mean acceptance probability per chain over the sampling phase.
    pub acceptance: Vec<f64>,
    /// Final adapted step size per chain.
    pub step_size: Vec<f64>,
    pub max_rhat: Option<f64>,
    pub worst_parameter: Option<String>,
    /// Non-fatal convergence warnings.
    pub convergence_warnings: Vec<String>,
}

impl FitDiagnostics {
    pub fn mean_acceptance(&self) -> f64 {
        mean(&self.acceptance)
    }
}

/// Gelman-Rubin potential scale reduction over half-chains.
pub fn split_rhat(chains: &[Vec<f64>]) -> Option<f64> {
    let n = chains.iter().map(Vec::len).min()?;
    let half = n / 2;
    if half < 2 {
        return None;
    }
    let mut means = Vec::with_capacity(chains.len() * 2);
    let mut vars = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        for seq in [&chain[..half], &chain[half..2 * half]] {
            means.push(mean(seq));
            vars.push(variance(seq));
        }
    }
    let w = mean(&vars);
    if !(w > 0.0) {
        return None;
    }
    let n = half as f64;
    let b = n * variance(&means);
    let var_plus = (n - 1.0) / n * w + b / n;
    Some((var_plus / w).sqrt())
}

pub(crate) fn summarize(
    model: &str,
    draws: &DrawSet,
    acceptance: Vec<f64>,
    step_size: Vec<f64>,
    adapt_delta: f64,
) -> FitDiagnostics {
    let mut diag = FitDiagnostics {
        acceptance,
        step_size,
        ..FitDiagnostics::default()
    };

    for idx in 0..draws.dim() {
        let Some(rhat) = split_rhat(&draws.parameter_by_chain(idx)) else {
            continue;
        };
        if diag.max_rhat.is_none_or(|m| rhat > m) {
            diag.max_rhat = Some(rhat);
            diag.worst_parameter = Some(
                draws
                    .structure
                    .layout
                    .parameter_name(idx, &draws.structure.trees),
            );
        }
    }

    if let (Some(rhat), Some(param)) = (diag.max_rhat, &diag.worst_parameter) {
        if rhat > RHAT_THRESHOLD {
            diag.convergence_warnings.push(format!(
                "model {}: split R-hat {:.3} for {} exceeds {}",
                model, rhat, param, RHAT_THRESHOLD
            ));
        }
    }
    let accept = diag.mean_acceptance();
    if accept < adapt_delta - 0.2 {
        diag.convergence_warnings.push(format!(
            "model {}: mean acceptance {:.3} far below target {:.2}",
            model, accept, adapt_delta
        ));
    }
    for w in &diag.convergence_warnings {
        warn!(model, "{}", w);
    }
    diag
}
