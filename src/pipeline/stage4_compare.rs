use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ctx::{Ctx, ModelLoo};
use crate::loo::{K_THRESHOLD, compare, loo, refit_unreliable};
use crate::pipeline::Stage;

pub struct Stage4Compare;

impl Stage4Compare {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Compare {
    fn name(&self) -> &'static str {
        "stage4_compare"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let config = &ctx.config;
        if !config.compare || config.models.is_empty() {
            info!("model comparison skipped");
            return Ok(());
        }

        let mut results = Vec::new();
        let mut warnings = Vec::new();
        for spec in &config.models {
            let fit = ctx
                .fit(*spec)
                .with_context(|| format!("model {} was not fitted", spec.name()))?;
            let pointwise = fit.outcome.draws.pointwise(&ctx.records);
            let mut estimate = loo(&pointwise, config.threads)
                .with_context(|| format!("LOO failed for {}", fit.name))?;

            let mut refits = 0;
            if config.reloo {
                let summary = refit_unreliable(
                    &mut estimate,
                    ctx.fitter.as_ref(),
                    fit.spec,
                    config.response,
                    &ctx.records,
                    &config.sampler,
                    K_THRESHOLD,
                )?;
                refits = summary.refitted;
                if summary.skipped > 0 {
                    warnings.push(format!(
                        "{}: {} observations could not be refit without them (PSIS estimate kept)",
                        fit.name, summary.skipped
                    ));
                }
            }
            let unreliable = estimate.unreliable(K_THRESHOLD).len();
            if unreliable > 0 && !config.reloo {
                warn!(model = %fit.name, unreliable, "pareto k above threshold");
                warnings.push(format!(
                    "{}: {} observations with Pareto k > {} (consider --reloo)",
                    fit.name, unreliable, K_THRESHOLD
                ));
            }
            info!(
                model = %fit.name,
                elpd_loo = estimate.elpd_loo,
                se = estimate.se_elpd_loo,
                p_loo = estimate.p_loo,
                refits,
                "loo_ready"
            );
            results.push(ModelLoo {
                name: fit.name.clone(),
                estimate,
                refits,
            });
        }

        let named: Vec<(String, _)> = results
            .iter()
            .map(|m| (m.name.clone(), m.estimate.clone()))
            .collect();
        let comparison = compare(&named)?;
        if let Some(best) = comparison.best() {
            info!(best = %best.model, elpd_loo = best.elpd_loo, "comparison_ready");
        }

        ctx.loo = results;
        ctx.comparison = Some(comparison);
        ctx.warnings.extend(warnings);
        Ok(())
    }
}
