use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ctx::{Ctx, FittedModel};
use crate::io::draw_cache::{DrawCache, fingerprint};
use crate::model::model_name;
use crate::pipeline::Stage;

pub struct Stage3Fit;

impl Stage3Fit {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3Fit {
    fn name(&self) -> &'static str {
        "stage3_fit"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let config = &ctx.config;
        config.sampler.validate()?;
        let cache = DrawCache::new(&ctx.output.cache_dir);
        let tag = ctx.fitter.tag();

        let mut fits = Vec::new();
        let mut warnings = Vec::new();
        for spec in config.fitted_models() {
            let name = model_name(spec, config.response);
            let key = fingerprint(spec, config.response, &config.sampler, &tag, &ctx.records)?;

            let cached = if config.cache.reads() {
                cache
                    .load(&name, key)
                    .with_context(|| format!("failed to load cached draws for {}", name))?
            } else {
                None
            };
            let from_cache = cached.is_some();
            let outcome = match cached {
                Some(outcome) => outcome,
                None => {
                    info!(
                        model = %name,
                        formula = %spec.formula(config.response),
                        draws = config.sampler.total_draws(),
                        "fitting"
                    );
                    let outcome = ctx
                        .fitter
                        .fit(spec, config.response, &ctx.records, &config.sampler)
                        .with_context(|| format!("failed to fit {}", name))?;
                    if config.cache.writes() {
                        cache.store(&name, key, &outcome)?;
                    }
                    outcome
                }
            };

            if from_cache {
                for w in &outcome.diagnostics.convergence_warnings {
                    warn!(model = %name, "{}", w);
                }
            }
            warnings.extend(outcome.diagnostics.convergence_warnings.iter().cloned());
            info!(
                model = %name,
                from_cache,
                draws = outcome.draws.n_draws(),
                acceptance = outcome.diagnostics.mean_acceptance(),
                "model_ready"
            );
            fits.push(FittedModel {
                spec,
                name,
                outcome,
                from_cache,
            });
        }

        ctx.fits = fits;
        ctx.warnings.extend(warnings);
        Ok(())
    }
}
