use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::io::detections::read_detection_matrix;
use crate::io::gdd::read_gdd_table;
use crate::pipeline::Stage;

pub struct Stage1Input;

impl Stage1Input {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Input {
    fn name(&self) -> &'static str {
        "stage1_input"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let gdd = read_gdd_table(&ctx.gdd_path)
            .with_context(|| format!("failed to load GDD table {}", ctx.gdd_path.display()))?;
        if gdd.is_empty() {
            ctx.warnings
                .push(format!("GDD table {} has no entries", ctx.gdd_path.display()));
        }
        info!(days = gdd.len(), path = %ctx.gdd_path.display(), "gdd_table_loaded");

        let raw = read_detection_matrix(&ctx.detections_path).with_context(|| {
            format!(
                "failed to load detection matrix {}",
                ctx.detections_path.display()
            )
        })?;
        info!(
            trees = raw.n_trees(),
            columns = raw.columns.len(),
            sampled = raw.n_sampled(),
            path = %ctx.detections_path.display(),
            "detection_matrix_loaded"
        );

        ctx.gdd = Some(gdd);
        ctx.raw = Some(raw);
        Ok(())
    }
}
