//! Samples required for a target cumulative detection probability, projected
//! over a GDD grid from posterior draws.

mod inversion;

#[cfg(feature = "mt")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::pool;
use crate::math::stats::quantiles;

pub use inversion::{cumulative_detection, samples_required};

/// Default target: at most 1 in 20 infested trees missed.
pub const DEFAULT_TARGET: f64 = 0.95;
pub const DEFAULT_GRID_POINTS: usize = 100;
/// 2.5, 10, 50, 90 and 97.5 percentiles.
pub const BAND_PROBS: [f64; 5] = [0.025, 0.10, 0.50, 0.90, 0.975];

/// Per-draw, population-level detection probability as a function of GDD.
pub trait ProbabilityModel: Sync {
    fn n_draws(&self) -> usize;

    fn predict_population(&self, draw: usize, gdd: f64) -> f64;

    /// Predictions of every draw at one GDD value.
    fn population_column(&self, gdd: f64) -> Vec<f64> {
        (0..self.n_draws())
            .map(|d| self.predict_population(d, gdd))
            .collect()
    }
}

/// Quantiles of samples required at one GDD value. `INFINITY` = unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplesRequiredRow {
    pub gdd: f64,
    pub q025: f64,
    pub q10: f64,
    pub q50: f64,
    pub q90: f64,
    pub q975: f64,
}

impl SamplesRequiredRow {
    pub fn estimate(&self) -> f64 {
        self.q50
    }

    pub fn band80(&self) -> (f64, f64) {
        (self.q10, self.q90)
    }

    pub fn band95(&self) -> (f64, f64) {
        (self.q025, self.q975)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplesRequiredDistribution {
    pub target: f64,
    pub n_draws: usize,
    pub rows: Vec<SamplesRequiredRow>,
}

/// `points` evenly spaced values over `[lower, upper]`.
pub fn gdd_grid(lower: f64, upper: f64, points: usize) -> AnalysisResult<Vec<f64>> {
    if points == 0 {
        return Err(AnalysisError::InvalidConfig(
            "grid needs at least one point".to_string(),
        ));
    }
    if !(lower.is_finite() && upper.is_finite()) || upper < lower {
        return Err(AnalysisError::InvalidConfig(format!(
            "invalid GDD grid range [{}, {}]",
            lower, upper
        )));
    }
    if points == 1 {
        return Ok(vec![lower]);
    }
    let step = (upper - lower) / (points - 1) as f64;
    Ok((0..points)
        .map(|i| if i + 1 == points { upper } else { lower + step * i as f64 })
        .collect())
}

pub fn project(
    model: &dyn ProbabilityModel,
    grid: &[f64],
    target: f64,
    threads: usize,
) -> AnalysisResult<SamplesRequiredDistribution> {
    if !(target > 0.0 && target < 1.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "target detection probability must be in (0, 1), got {}",
            target
        )));
    }
    let n_draws = model.n_draws();
    if n_draws == 0 || grid.is_empty() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "projection needs draws and grid points, got {} x {}",
            n_draws,
            grid.len()
        )));
    }
    if let Some(bad) = grid.iter().find(|g| !g.is_finite()) {
        return Err(AnalysisError::ShapeMismatch(format!(
            "grid contains non-finite GDD {}",
            bad
        )));
    }

    #[cfg(feature = "mt")]
    let rows = pool::install(threads, || {
        grid.par_iter()
            .map(|&g| project_point(model, g, target))
            .collect::<AnalysisResult<Vec<_>>>()
    })??;
    #[cfg(not(feature = "mt"))]
    let rows = pool::install(threads, || {
        grid.iter()
            .map(|&g| project_point(model, g, target))
            .collect::<AnalysisResult<Vec<_>>>()
    })??;

    info!(grid_points = rows.len(), draws = n_draws, target, "projection_ready");
    Ok(SamplesRequiredDistribution {
        target,
        n_draws,
        rows,
    })
}

fn project_point(model: &dyn ProbabilityModel, gdd: f64, target: f64) -> AnalysisResult<SamplesRequiredRow> {
    let probs = model.population_column(gdd);
    if probs.len() != model.n_draws() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "model returned {} predictions for {} draws",
            probs.len(),
            model.n_draws()
        )));
    }
    let mut n: Vec<f64> = probs
        .into_iter()
        .map(|p| samples_required(p, target))
        .collect();
    let q = quantiles(&mut n, &BAND_PROBS);
    Ok(SamplesRequiredRow {
        gdd,
        q025: q[0],
        q10: q[1],
        q50: q[2],
        q90: q[3],
        q975: q[4],
    })
}

/// Fixed probability per draw, independent of GDD.
#[derive(Debug, Clone)]
pub struct ConstantProbability {
    pub probs: Vec<f64>,
}

impl ProbabilityModel for ConstantProbability {
    fn n_draws(&self) -> usize {
        self.probs.len()
    }

    fn predict_population(&self, draw: usize, _gdd: f64) -> f64 {
        self.probs[draw]
    }
}
