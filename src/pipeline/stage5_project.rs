use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::{Ctx, ProjectionResult};
use crate::pipeline::Stage;
use crate::projection::{gdd_grid, project};
use crate::records::gdd_range;

pub struct Stage5Project;

impl Stage5Project {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage5Project {
    fn name(&self) -> &'static str {
        "stage5_project"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let Some(spec) = ctx.config.project_model else {
            info!("projection skipped");
            return Ok(());
        };
        let fit = ctx
            .fit(spec)
            .with_context(|| format!("projection model {} was not fitted", spec.name()))?;
        let (lower, upper) = gdd_range(&ctx.records).context("no records to project over")?;
        let grid = gdd_grid(lower, upper, ctx.config.grid_points)?;

        let view = fit.outcome.draws.population(ctx.config.direction)?;
        let direction = view.direction();
        let distribution = project(&view, &grid, ctx.config.target, ctx.config.threads)?;

        if let Some(first) = distribution.rows.first() {
            info!(
                model = %fit.name,
                gdd = first.gdd,
                median = first.q50,
                "samples_required_at_first_grid_point"
            );
        }

        ctx.projection = Some(ProjectionResult {
            model: fit.name.clone(),
            direction,
            distribution,
        });
        Ok(())
    }
}
