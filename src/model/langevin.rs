//! Preconditioned Metropolis-adjusted Langevin sampler for the candidate
//! detection models.
//!
//! Parameters use a non-centered form: smooth and tree coefficients are
//! standard normal `z` scaled by a standard deviation sampled on the log
//! scale. Priors:
//!
//! ```text
//! intercept ~ student_t(3, 0, 2.5)
//! slopes    ~ normal(0, 5)
//! z         ~ normal(0, 1)
//! sd        ~ half student_t(3, 0, 2.5)
//! ```
//!
//! Warmup adapts the step size towards `adapt_delta` and, over its first
//! half, estimates a diagonal metric from the chain.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
#[cfg(feature = "mt")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::pool;
use crate::model::diagnostics::summarize;
use crate::model::structure::{DesignMatrix, INTERCEPT, ModelStructure, log_bernoulli, sigmoid};
use crate::model::{DrawSet, FitOutcome, ModelFitter, ModelSpec, Response, SamplerConfig, model_name};
use crate::records::DetectionRecord;

const PRIOR_DF: f64 = 3.0;
const PRIOR_SCALE: f64 = 2.5;
const SLOPE_SD: f64 = 5.0;

const INITIAL_STEP: f64 = 0.1;
const MIN_LOG_STEP: f64 = -12.0;
const MAX_LOG_STEP: f64 = 1.0;
const INIT_RADIUS: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct LangevinFitter {
    basis_dim: usize,
    threads: usize,
}

impl Default for LangevinFitter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl LangevinFitter {
    pub fn new(basis_dim: usize) -> Self {
        Self {
            basis_dim,
            threads: 0,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

impl ModelFitter for LangevinFitter {
    fn tag(&self) -> String {
        format!("langevin:k={}", self.basis_dim)
    }

    fn fit(
        &self,
        spec: ModelSpec,
        response: Response,
        records: &[DetectionRecord],
        config: &SamplerConfig,
    ) -> AnalysisResult<FitOutcome> {
        config.validate()?;
        if records.is_empty() {
            return Err(AnalysisError::ShapeMismatch(
                "cannot fit a model without detection records".to_string(),
            ));
        }
        let name = model_name(spec, response);
        let structure = ModelStructure::from_records(spec, response, records, self.basis_dim)?;
        let design = DesignMatrix::build(&structure, records);
        let target = Posterior {
            structure: &structure,
            design: &design,
        };
        info!(
            model = %name,
            parameters = structure.layout.dim,
            observations = design.len(),
            chains = config.chains,
            iterations = config.iterations,
            "fit_started"
        );

        let chains = run_chains(&target, config, self.threads)?;
        let mut values = Vec::with_capacity(config.total_draws() * structure.layout.dim);
        let mut acceptance = Vec::with_capacity(chains.len());
        let mut step_size = Vec::with_capacity(chains.len());
        for chain in chains {
            values.extend_from_slice(&chain.draws);
            acceptance.push(chain.accept_rate);
            step_size.push(chain.step_size);
        }

        let draws = DrawSet::new(structure, config.chains, config.draws_per_chain(), values)?;
        let diagnostics = summarize(&name, &draws, acceptance, step_size, config.adapt_delta);
        info!(
            model = %name,
            draws = draws.n_draws(),
            max_rhat = diagnostics.max_rhat.unwrap_or(f64::NAN),
            acceptance = diagnostics.mean_acceptance(),
            "fit_finished"
        );
        Ok(FitOutcome { draws, diagnostics })
    }
}

struct ChainOutput {
    draws: Vec<f64>,
    accept_rate: f64,
    step_size: f64,
}

#[cfg(feature = "mt")]
fn run_chains(
    target: &Posterior<'_>,
    config: &SamplerConfig,
    threads: usize,
) -> AnalysisResult<Vec<ChainOutput>> {
    pool::install(threads, || {
        (0..config.chains)
            .into_par_iter()
            .map(|chain| run_chain(target, config, chain))
            .collect()
    })
}

#[cfg(not(feature = "mt"))]
fn run_chains(
    target: &Posterior<'_>,
    config: &SamplerConfig,
    threads: usize,
) -> AnalysisResult<Vec<ChainOutput>> {
    pool::install(threads, || {
        (0..config.chains)
            .map(|chain| run_chain(target, config, chain))
            .collect()
    })
}

fn run_chain(target: &Posterior<'_>, config: &SamplerConfig, chain: usize) -> ChainOutput {
    let dim = target.dim();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(chain as u64));

    let mut theta: Vec<f64> = (0..dim)
        .map(|_| rng.gen_range(-INIT_RADIUS..INIT_RADIUS))
        .collect();
    let mut grad = vec![0.0; dim];
    let mut lp = target.log_density(&theta, &mut grad);
    let mut proposal = vec![0.0; dim];
    let mut grad_prop = vec![0.0; dim];

    let mut metric = vec![1.0; dim];
    let mut log_step = INITIAL_STEP.ln();
    let mut adapt_iter = 0usize;
    let metric_window = config.warmup / 2;
    let mut window = Welford::new(dim);

    let kept = config.draws_per_chain();
    let mut draws = Vec::with_capacity(kept * dim);
    let mut accept_sum = 0.0;

    for iter in 0..config.iterations {
        let step = log_step.exp();
        let half_sq = 0.5 * step * step;

        let mut log_q_forward = 0.0;
        for i in 0..dim {
            let noise: f64 = StandardNormal.sample(&mut rng);
            proposal[i] = theta[i] + half_sq * metric[i] * grad[i] + step * metric[i].sqrt() * noise;
            log_q_forward -= 0.5 * noise * noise;
        }
        let lp_prop = target.log_density(&proposal, &mut grad_prop);
        let mut log_q_reverse = 0.0;
        for i in 0..dim {
            let d = theta[i] - proposal[i] - half_sq * metric[i] * grad_prop[i];
            log_q_reverse -= d * d / (2.0 * step * step * metric[i]);
        }

        let log_alpha = lp_prop - lp + log_q_reverse - log_q_forward;
        let alpha = if log_alpha.is_nan() {
            0.0
        } else {
            log_alpha.min(0.0).exp()
        };
        if rng.gen_range(0.0..1.0) < alpha {
            std::mem::swap(&mut theta, &mut proposal);
            std::mem::swap(&mut grad, &mut grad_prop);
            lp = lp_prop;
        }

        if iter < config.warmup {
            adapt_iter += 1;
            let gain = 1.0 / (adapt_iter as f64 + 10.0).powf(0.6);
            log_step = (log_step + gain * (alpha - config.adapt_delta)).clamp(MIN_LOG_STEP, MAX_LOG_STEP);
            if iter < metric_window {
                window.push(&theta);
                if iter + 1 == metric_window && window.count >= 10 {
                    metric = window.regularized_variance();
                    adapt_iter = 0;
                    debug!(chain, iter, "metric_updated");
                }
            }
        } else {
            accept_sum += alpha;
            draws.extend_from_slice(&theta);
        }
    }

    ChainOutput {
        draws,
        accept_rate: if kept > 0 { accept_sum / kept as f64 } else { 0.0 },
        step_size: log_step.exp(),
    }
}

/// Unnormalized log posterior of the logistic model.
struct Posterior<'a> {
    structure: &'a ModelStructure,
    design: &'a DesignMatrix,
}

impl Posterior<'_> {
    fn dim(&self) -> usize {
        self.structure.layout.dim
    }

    /// Returns the log density and writes its gradient into `grad`.
    fn log_density(&self, theta: &[f64], grad: &mut [f64]) -> f64 {
        let layout = &self.structure.layout;
        grad.iter_mut().for_each(|g| *g = 0.0);

        let mut smooth_acc = vec![0.0; layout.n_smooth];
        let mut tree_acc = vec![0.0; layout.n_trees];
        let mut lp = 0.0;

        for i in 0..self.design.len() {
            let row = self.design.row(i);
            let eta = self.structure.eta(theta, &row);
            let y = self.design.y[i];
            lp += log_bernoulli(y, eta);
            let r = y - sigmoid(eta);
            grad[INTERCEPT] += r;
            if let Some(d) = layout.direction {
                grad[d] += r * row.direction;
            }
            if let Some(l) = layout.linear {
                grad[l] += r * row.linear;
            }
            for (acc, z) in smooth_acc.iter_mut().zip(row.smooth) {
                *acc += r * z;
            }
            if let Some(t) = row.tree {
                tree_acc[t] += r;
            }
        }

        lp += student_t_lp(theta[INTERCEPT]);
        grad[INTERCEPT] += student_t_grad(theta[INTERCEPT]);
        for idx in [layout.direction, layout.linear].into_iter().flatten() {
            lp -= 0.5 * (theta[idx] / SLOPE_SD).powi(2);
            grad[idx] -= theta[idx] / (SLOPE_SD * SLOPE_SD);
        }
        if let Some(log_sd) = layout.log_sd_smooth {
            lp += scaled_block(theta, grad, log_sd, layout.smooth_start, &smooth_acc);
        }
        lp += scaled_block(theta, grad, layout.log_sd_tree, layout.tree_start, &tree_acc);
        lp
    }
}

/// Prior and likelihood-chain terms of a `sd * z` block. `acc[k]` holds the
/// likelihood gradient with respect to the block's k-th column effect.
fn scaled_block(theta: &[f64], grad: &mut [f64], log_sd: usize, start: usize, acc: &[f64]) -> f64 {
    let tau = theta[log_sd];
    let sd = tau.exp();
    let mut lp = student_t_lp(sd) + tau;
    grad[log_sd] += student_t_grad(sd) * sd + 1.0;
    for (k, &a) in acc.iter().enumerate() {
        let z = theta[start + k];
        lp -= 0.5 * z * z;
        grad[start + k] += sd * a - z;
        grad[log_sd] += sd * z * a;
    }
    lp
}

fn student_t_lp(x: f64) -> f64 {
    -0.5 * (PRIOR_DF + 1.0) * (x * x / (PRIOR_DF * PRIOR_SCALE * PRIOR_SCALE)).ln_1p()
}

fn student_t_grad(x: f64) -> f64 {
    -(PRIOR_DF + 1.0) * x / (PRIOR_DF * PRIOR_SCALE * PRIOR_SCALE + x * x)
}

/// Running per-coordinate mean and variance.
struct Welford {
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl Welford {
    fn new(dim: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
        }
    }

    fn push(&mut self, x: &[f64]) {
        self.count += 1;
        let n = self.count as f64;
        for ((m, s), &v) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(x) {
            let delta = v - *m;
            *m += delta / n;
            *s += delta * (v - *m);
        }
    }

    /// Variance shrunk towards 1e-3, as in Stan's windowed adaptation.
    fn regularized_variance(&self) -> Vec<f64> {
        let n = self.count as f64;
        self.m2
            .iter()
            .map(|s| {
                let var = s / (n - 1.0);
                (n / (n + 5.0)) * var + 1e-3 * (5.0 / (n + 5.0))
            })
            .collect()
    }
}
