use anyhow::Result;

use crate::ctx::Ctx;
use crate::records::gdd_range;
use crate::schema::v1::{
    ComparisonEntry, EabGddV1, InputMeta, ModelFit, ParetoK, Projection, ProjectionRow, RunConfig,
    SCHEMA_VERSION, SamplerSettings, ToolInfo,
};

pub fn build_report(ctx: &Ctx) -> Result<EabGddV1> {
    let config = &ctx.config;
    let sampler = &config.sampler;

    let run_config = RunConfig {
        models: config
            .fitted_models()
            .iter()
            .map(|s| s.name().to_string())
            .collect(),
        response: config.response.name().to_string(),
        missing_gdd: format!("{:?}", config.missing_gdd).to_lowercase(),
        cache: format!("{:?}", config.cache).to_lowercase(),
        fitter: ctx.fitter.tag(),
        basis_dim: config.basis_dim,
        sampler: SamplerSettings {
            iterations: sampler.iterations,
            warmup: sampler.warmup,
            chains: sampler.chains,
            adapt_delta: sampler.adapt_delta,
            seed: sampler.seed,
        },
        target: config.target,
        grid_points: config.grid_points,
        reloo: config.reloo,
    };

    let range = gdd_range(&ctx.records);
    let input = InputMeta {
        detections: ctx.detections_path.display().to_string(),
        gdd_table: ctx.gdd_path.display().to_string(),
        trees: ctx.raw.as_ref().map(|r| r.n_trees()).unwrap_or(0),
        sampling_columns: ctx.raw.as_ref().map(|r| r.columns.len()).unwrap_or(0),
        gdd_days: ctx.gdd.as_ref().map(|g| g.len()).unwrap_or(0),
        records: ctx.records.len(),
        excluded_records: ctx.excluded.len(),
        directions: ctx.directions.iter().map(|d| d.to_string()).collect(),
        gdd_min: range.map(|r| r.0),
        gdd_max: range.map(|r| r.1),
        positives: ctx.records.iter().filter(|r| r.pos == 1).count(),
        positives2: ctx.records.iter().filter(|r| r.pos2 == 1).count(),
    };

    let fits = ctx
        .fits
        .iter()
        .map(|f| {
            let d = &f.outcome.diagnostics;
            ModelFit {
                name: f.name.clone(),
                formula: f.spec.formula(config.response),
                draws: f.outcome.draws.n_draws(),
                chains: f.outcome.draws.chains(),
                from_cache: f.from_cache,
                mean_acceptance: d.mean_acceptance(),
                step_size: d.step_size.clone(),
                max_rhat: d.max_rhat,
                worst_parameter: d.worst_parameter.clone(),
                convergence_warnings: d.convergence_warnings.clone(),
            }
        })
        .collect();

    let comparison = ctx.comparison.as_ref().map(|cmp| {
        cmp.rows
            .iter()
            .map(|row| {
                let model = ctx.loo.iter().find(|m| m.name == row.model);
                let k = model.map(|m| m.estimate.k_counts).unwrap_or_default();
                ComparisonEntry {
                    model: row.model.clone(),
                    elpd_loo: row.elpd_loo,
                    se_elpd_loo: row.se_elpd_loo,
                    elpd_diff: row.elpd_diff,
                    se_diff: row.se_diff,
                    p_loo: row.p_loo,
                    looic: row.looic,
                    pareto_k: ParetoK {
                        good: k.good,
                        ok: k.ok,
                        bad: k.bad,
                        very_bad: k.very_bad,
                    },
                    refits: model.map(|m| m.refits).unwrap_or(0),
                }
            })
            .collect()
    });

    let projection = ctx.projection.as_ref().map(|p| Projection {
        model: p.model.clone(),
        direction: p.direction.map(|d| d.to_string()),
        target: p.distribution.target,
        draws: p.distribution.n_draws,
        rows: p
            .distribution
            .rows
            .iter()
            .map(|r| ProjectionRow {
                gdd: r.gdd,
                q2_5: bounded(r.q025),
                q10: bounded(r.q10),
                q50: bounded(r.q50),
                q90: bounded(r.q90),
                q97_5: bounded(r.q975),
            })
            .collect(),
    });

    Ok(EabGddV1 {
        schema_version: SCHEMA_VERSION.to_string(),
        tool: ToolInfo {
            name: "eab-gdd".to_string(),
            version: ctx.tool_version.clone(),
        },
        config: run_config,
        input,
        fits,
        comparison,
        projection,
        warnings: ctx.warnings.clone(),
    })
}

/// `None` for an unbounded (infinite) number of samples.
fn bounded(n: f64) -> Option<f64> {
    n.is_finite().then_some(n)
}
