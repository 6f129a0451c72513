//! Approximate leave-one-out cross-validation from posterior draws.

mod compare;
mod psis;
mod reloo;

#[cfg(feature = "mt")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::pool;
use crate::math::stats::{log_mean_exp, log_sum_exp, variance};

pub use compare::{ComparisonRow, LooComparison, compare, pairwise_difference};
pub use psis::{PsisResult, gpd_fit, psis, tail_len};
pub use reloo::{RelooSummary, refit_unreliable};

/// Pareto k above which the PSIS estimate is unreliable.
pub const K_THRESHOLD: f64 = 0.7;

/// Per-draw log-likelihood of every observation.
pub trait PointwiseLogLik: Sync {
    fn n_obs(&self) -> usize;
    fn n_draws(&self) -> usize;
    /// Log-likelihood of one observation across all draws.
    fn log_lik_column(&self, obs: usize) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointwiseLoo {
    pub elpd_loo: f64,
    /// Log posterior mean likelihood, the in-sample counterpart of `elpd_loo`.
    pub lpd: f64,
    pub pareto_k: f64,
    /// Replaced by an exact refit without this observation.
    pub refit: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParetoKCounts {
    /// k <= 0.5
    pub good: usize,
    /// 0.5 < k <= 0.7
    pub ok: usize,
    /// 0.7 < k <= 1
    pub bad: usize,
    /// k > 1
    pub very_bad: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooEstimate {
    pub elpd_loo: f64,
    pub se_elpd_loo: f64,
    pub p_loo: f64,
    pub se_p_loo: f64,
    pub looic: f64,
    pub se_looic: f64,
    pub k_counts: ParetoKCounts,
    pub pointwise: Vec<PointwiseLoo>,
}

impl LooEstimate {
    pub fn from_pointwise(pointwise: Vec<PointwiseLoo>) -> Self {
        let n = pointwise.len() as f64;
        let elpd: Vec<f64> = pointwise.iter().map(|p| p.elpd_loo).collect();
        let p_eff: Vec<f64> = pointwise.iter().map(|p| p.lpd - p.elpd_loo).collect();
        let elpd_loo: f64 = elpd.iter().sum();
        let se_elpd_loo = (n * variance(&elpd)).sqrt();

        let mut k_counts = ParetoKCounts::default();
        for p in &pointwise {
            match p.pareto_k {
                k if k <= 0.5 => k_counts.good += 1,
                k if k <= K_THRESHOLD => k_counts.ok += 1,
                k if k <= 1.0 => k_counts.bad += 1,
                _ => k_counts.very_bad += 1,
            }
        }

        Self {
            elpd_loo,
            se_elpd_loo,
            p_loo: p_eff.iter().sum(),
            se_p_loo: (n * variance(&p_eff)).sqrt(),
            looic: -2.0 * elpd_loo,
            se_looic: 2.0 * se_elpd_loo,
            k_counts,
            pointwise,
        }
    }

    /// Observations whose Pareto k exceeds `threshold`.
    pub fn unreliable(&self, threshold: f64) -> Vec<usize> {
        self.pointwise
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.refit && !(p.pareto_k <= threshold))
            .map(|(i, _)| i)
            .collect()
    }
}

pub fn loo(log_lik: &dyn PointwiseLogLik, threads: usize) -> AnalysisResult<LooEstimate> {
    let n_obs = log_lik.n_obs();
    let n_draws = log_lik.n_draws();
    if n_obs == 0 || n_draws == 0 {
        return Err(AnalysisError::ShapeMismatch(format!(
            "LOO needs observations and draws, got {} x {}",
            n_obs, n_draws
        )));
    }

    #[cfg(feature = "mt")]
    let pointwise = pool::install(threads, || {
        (0..n_obs)
            .into_par_iter()
            .map(|i| pointwise_loo(&log_lik.log_lik_column(i)))
            .collect::<Vec<_>>()
    })?;
    #[cfg(not(feature = "mt"))]
    let pointwise = pool::install(threads, || {
        (0..n_obs)
            .map(|i| pointwise_loo(&log_lik.log_lik_column(i)))
            .collect::<Vec<_>>()
    })?;

    Ok(LooEstimate::from_pointwise(pointwise))
}

fn pointwise_loo(log_lik: &[f64]) -> PointwiseLoo {
    let log_ratios: Vec<f64> = log_lik.iter().map(|l| -l).collect();
    let smoothed = psis(&log_ratios);
    let weighted: Vec<f64> = smoothed
        .log_weights
        .iter()
        .zip(log_lik)
        .map(|(w, l)| w + l)
        .collect();
    PointwiseLoo {
        elpd_loo: log_sum_exp(&weighted) - log_sum_exp(&smoothed.log_weights),
        lpd: log_mean_exp(log_lik),
        pareto_k: smoothed.pareto_k,
        refit: false,
    }
}
