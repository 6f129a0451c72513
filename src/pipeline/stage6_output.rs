use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::io::json_writer::build_report;
use crate::io::tsv_writer;
use crate::io::write_json;
use crate::pipeline::Stage;

pub struct Stage6Output;

impl Stage6Output {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage6Output {
    fn name(&self) -> &'static str {
        "stage6_output"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        if ctx.write_tsv {
            tsv_writer::write_records(&ctx.output.records_tsv, &ctx.records)?;
            tsv_writer::write_observed(&ctx.output.observed_tsv, &ctx.observed)?;
            if let Some(comparison) = &ctx.comparison {
                tsv_writer::write_comparison(&ctx.output.loo_tsv, comparison, &ctx.loo)?;
            }
            if let Some(projection) = &ctx.projection {
                tsv_writer::write_samples_required(
                    &ctx.output.samples_tsv,
                    &projection.distribution,
                )?;
            }
            info!(out_dir = %ctx.output.out_dir.display(), "tsv_written");
        }

        let report = build_report(ctx)?;
        if ctx.write_json {
            write_json(&ctx.output.json_path, &report)?;
            info!(path = %ctx.output.json_path.display(), "json_written");
        }
        ctx.report = Some(report);
        Ok(())
    }
}
