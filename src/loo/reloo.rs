use tracing::{info, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::loo::LooEstimate;
use crate::math::stats::log_mean_exp;
use crate::model::{ModelFitter, ModelSpec, Response, SamplerConfig, model_name};
use crate::records::DetectionRecord;

/// Outcome of [`refit_unreliable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelooSummary {
    pub refitted: usize,
    /// Observations whose removal leaves an unfittable training set; their
    /// PSIS estimate is kept.
    pub skipped: usize,
}

/// Replaces PSIS estimates with `k > threshold` by exact leave-one-out refits.
pub fn refit_unreliable(
    estimate: &mut LooEstimate,
    fitter: &dyn ModelFitter,
    spec: ModelSpec,
    response: Response,
    records: &[DetectionRecord],
    config: &SamplerConfig,
    threshold: f64,
) -> AnalysisResult<RelooSummary> {
    if records.len() != estimate.pointwise.len() {
        return Err(AnalysisError::ShapeMismatch(format!(
            "LOO estimate covers {} observations, {} records given",
            estimate.pointwise.len(),
            records.len()
        )));
    }
    let targets = estimate.unreliable(threshold);
    if targets.is_empty() {
        return Ok(RelooSummary::default());
    }
    let name = model_name(spec, response);
    info!(model = %name, refits = targets.len(), "reloo_started");

    let mut summary = RelooSummary::default();
    for &i in &targets {
        let training: Vec<DetectionRecord> = records
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, r)| r.clone())
            .collect();
        let outcome = match fitter.fit(spec, response, &training, config) {
            Ok(outcome) => outcome,
            Err(AnalysisError::InvalidDirection(reason)) => {
                warn!(
                    model = %name,
                    observation = i,
                    reason = %reason,
                    "reloo_skipped"
                );
                summary.skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        let log_lik = outcome.draws.log_lik_record(&records[i]);
        let point = &mut estimate.pointwise[i];
        point.elpd_loo = log_mean_exp(&log_lik);
        point.pareto_k = 0.0;
        point.refit = true;
        summary.refitted += 1;
    }

    *estimate = LooEstimate::from_pointwise(std::mem::take(&mut estimate.pointwise));
    Ok(summary)
}
