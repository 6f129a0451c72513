//! Bayesian hierarchical logistic models of detection against GDD.
//!
//! Fitting sits behind [`ModelFitter`]; the crate's own implementation is
//! [`LangevinFitter`]. A fit produces a [`DrawSet`] that can be evaluated at
//! arbitrary covariates, with or without the tree-level random effects.

mod basis;
mod diagnostics;
mod draws;
mod langevin;
mod structure;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::records::DetectionRecord;

pub use basis::SmoothBasis;
pub use diagnostics::{FitDiagnostics, RHAT_THRESHOLD, split_rhat};
pub use draws::{Covariates, DrawSet, PointwiseDraws, PopulationView};
pub use langevin::LangevinFitter;
pub use structure::{CovariateRow, DesignMatrix, INTERCEPT, ModelStructure, ParamLayout, RowRef};

/// The four candidate specifications compared in the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    /// `y ~ 1 + (1 | tree)`
    TreeIntercept,
    /// `y ~ s(gdd) + (1 | tree)`
    SmoothGdd,
    /// `y ~ s(gdd) + direction + (1 | tree)`
    SmoothGddDirection,
    /// `y ~ direction + (1 | tree)`
    Direction,
}

impl ModelSpec {
    pub const ALL: [ModelSpec; 4] = [
        ModelSpec::TreeIntercept,
        ModelSpec::SmoothGdd,
        ModelSpec::SmoothGddDirection,
        ModelSpec::Direction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelSpec::TreeIntercept => "tree",
            ModelSpec::SmoothGdd => "gdd",
            ModelSpec::SmoothGddDirection => "gdd_direction",
            ModelSpec::Direction => "direction",
        }
    }

    pub fn has_smooth(&self) -> bool {
        matches!(self, ModelSpec::SmoothGdd | ModelSpec::SmoothGddDirection)
    }

    pub fn has_direction(&self) -> bool {
        matches!(self, ModelSpec::SmoothGddDirection | ModelSpec::Direction)
    }

    pub fn formula(&self, response: Response) -> String {
        let rhs = match self {
            ModelSpec::TreeIntercept => "1 + (1 | tree)",
            ModelSpec::SmoothGdd => "s(gdd) + (1 | tree)",
            ModelSpec::SmoothGddDirection => "s(gdd) + direction + (1 | tree)",
            ModelSpec::Direction => "direction + (1 | tree)",
        };
        format!("{} ~ {}", response.name(), rhs)
    }
}

/// Which detection indicator is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Any positive replicate.
    #[default]
    Pos,
    /// More than one positive replicate; singletons treated as noise.
    Pos2,
}

impl Response {
    pub fn name(&self) -> &'static str {
        match self {
            Response::Pos => "pos",
            Response::Pos2 => "pos2",
        }
    }

    pub fn value(&self, record: &DetectionRecord) -> f64 {
        match self {
            Response::Pos => record.pos as f64,
            Response::Pos2 => record.pos2 as f64,
        }
    }
}

/// Cache key for a fitted model.
pub fn model_name(spec: ModelSpec, response: Response) -> String {
    format!("{}_{}", spec.name(), response.name())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub iterations: usize,
    pub warmup: usize,
    pub chains: usize,
    /// Target mean acceptance probability for step size adaptation.
    pub adapt_delta: f64,
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            iterations: 4000,
            warmup: 2000,
            chains: 4,
            adapt_delta: 0.95,
            seed: 20190601,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.chains == 0 {
            return Err(AnalysisError::InvalidConfig(
                "chains must be at least 1".to_string(),
            ));
        }
        if self.warmup >= self.iterations {
            return Err(AnalysisError::InvalidConfig(format!(
                "warmup ({}) must be smaller than iterations ({})",
                self.warmup, self.iterations
            )));
        }
        if !(self.adapt_delta > 0.0 && self.adapt_delta < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "adapt_delta must be in (0, 1), got {}",
                self.adapt_delta
            )));
        }
        Ok(())
    }

    pub fn draws_per_chain(&self) -> usize {
        self.iterations.saturating_sub(self.warmup)
    }

    pub fn total_draws(&self) -> usize {
        self.draws_per_chain() * self.chains
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOutcome {
    pub draws: DrawSet,
    pub diagnostics: FitDiagnostics,
}

/// Bayesian inference backend producing posterior draws for a specification.
pub trait ModelFitter: Sync {
    /// Identifies the backend and its settings; part of the draw cache key.
    fn tag(&self) -> String;

    fn fit(
        &self,
        spec: ModelSpec,
        response: Response,
        records: &[DetectionRecord],
        config: &SamplerConfig,
    ) -> AnalysisResult<FitOutcome>;
}
