use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::loo::PointwiseLogLik;
use crate::model::structure::{CovariateRow, DesignMatrix, ModelStructure, log_bernoulli, sigmoid};
use crate::projection::ProbabilityModel;
use crate::records::{DetectionRecord, Direction};

/// Posterior draws of one fitted model, chains concatenated in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawSet {
    pub structure: ModelStructure,
    chains: usize,
    draws_per_chain: usize,
    values: Vec<f64>,
}

/// Covariates for a single prediction. `tree` is ignored for
/// population-level predictions.
#[derive(Debug, Clone, Copy)]
pub struct Covariates<'a> {
    pub gdd: f64,
    pub direction: Direction,
    pub tree: Option<&'a str>,
}

impl DrawSet {
    pub fn new(
        structure: ModelStructure,
        chains: usize,
        draws_per_chain: usize,
        values: Vec<f64>,
    ) -> AnalysisResult<Self> {
        let expected = chains * draws_per_chain * structure.layout.dim;
        if values.len() != expected || expected == 0 {
            return Err(AnalysisError::ShapeMismatch(format!(
                "draw buffer has {} values, expected {} ({} chains x {} draws x {} parameters)",
                values.len(),
                expected,
                chains,
                draws_per_chain,
                structure.layout.dim
            )));
        }
        Ok(Self {
            structure,
            chains,
            draws_per_chain,
            values,
        })
    }

    pub fn n_draws(&self) -> usize {
        self.chains * self.draws_per_chain
    }

    pub fn chains(&self) -> usize {
        self.chains
    }

    pub fn draws_per_chain(&self) -> usize {
        self.draws_per_chain
    }

    pub fn dim(&self) -> usize {
        self.structure.layout.dim
    }

    pub fn draw(&self, d: usize) -> &[f64] {
        let dim = self.dim();
        &self.values[d * dim..(d + 1) * dim]
    }

    /// One parameter's trace, split per chain.
    pub fn parameter_by_chain(&self, idx: usize) -> Vec<Vec<f64>> {
        (0..self.chains)
            .map(|c| {
                (0..self.draws_per_chain)
                    .map(|i| self.draw(c * self.draws_per_chain + i)[idx])
                    .collect()
            })
            .collect()
    }

    pub fn predict(&self, draw: usize, covariates: &Covariates<'_>, include_random_effects: bool) -> f64 {
        let mut row = self
            .structure
            .row(covariates.gdd, covariates.direction, covariates.tree);
        if !include_random_effects {
            row = row.without_tree();
        }
        sigmoid(self.structure.eta(self.draw(draw), &row.view()))
    }

    /// Bernoulli log-likelihood of `record` under every draw, random effects included.
    pub fn log_lik_record(&self, record: &DetectionRecord) -> Vec<f64> {
        let row = self
            .structure
            .row(record.gdd, record.direction, Some(record.tree.as_str()));
        let view = row.view();
        let y = self.structure.response.value(record);
        (0..self.n_draws())
            .map(|d| log_bernoulli(y, self.structure.eta(self.draw(d), &view)))
            .collect()
    }

    /// Population-level view for projection. Direction defaults to the
    /// reference level when the model has a direction term.
    pub fn population(&self, direction: Option<Direction>) -> AnalysisResult<PopulationView<'_>> {
        let levels = &self.structure.directions;
        let level = match direction {
            Some(d) if self.structure.spec.has_direction() && !levels.contains(&d) => {
                return Err(AnalysisError::InvalidDirection(format!(
                    "direction '{}' not among fitted levels {:?}",
                    d, levels
                )));
            }
            Some(d) => d,
            None => levels.first().copied().unwrap_or(Direction('?')),
        };
        Ok(PopulationView { draws: self, level })
    }

    pub fn pointwise(&self, records: &[DetectionRecord]) -> PointwiseDraws<'_> {
        PointwiseDraws {
            draws: self,
            design: DesignMatrix::build(&self.structure, records),
        }
    }
}

/// Draws evaluated without tree effects at a fixed direction.
#[derive(Debug, Clone, Copy)]
pub struct PopulationView<'a> {
    draws: &'a DrawSet,
    level: Direction,
}

impl PopulationView<'_> {
    /// Direction used for predictions, `None` when the model ignores direction.
    pub fn direction(&self) -> Option<Direction> {
        self.draws
            .structure
            .spec
            .has_direction()
            .then_some(self.level)
    }

    fn row(&self, gdd: f64) -> CovariateRow {
        self.draws.structure.row(gdd, self.level, None)
    }
}

impl ProbabilityModel for PopulationView<'_> {
    fn n_draws(&self) -> usize {
        self.draws.n_draws()
    }

    fn predict_population(&self, draw: usize, gdd: f64) -> f64 {
        let row = self.row(gdd);
        sigmoid(self.draws.structure.eta(self.draws.draw(draw), &row.view()))
    }

    fn population_column(&self, gdd: f64) -> Vec<f64> {
        let row = self.row(gdd);
        let view = row.view();
        (0..self.draws.n_draws())
            .map(|d| sigmoid(self.draws.structure.eta(self.draws.draw(d), &view)))
            .collect()
    }
}

/// Draw set paired with the observations it is scored against.
pub struct PointwiseDraws<'a> {
    draws: &'a DrawSet,
    design: DesignMatrix,
}

impl PointwiseLogLik for PointwiseDraws<'_> {
    fn n_obs(&self) -> usize {
        self.design.len()
    }

    fn n_draws(&self) -> usize {
        self.draws.n_draws()
    }

    fn log_lik_column(&self, obs: usize) -> Vec<f64> {
        let row = self.design.row(obs);
        let y = self.design.y[obs];
        (0..self.draws.n_draws())
            .map(|d| log_bernoulli(y, self.draws.structure.eta(self.draws.draw(d), &row)))
            .collect()
    }
}
