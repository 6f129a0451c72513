use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::pipeline::Stage;
use crate::records::{observed_summary, reshape};

/// Distinct days listed in the exclusion warning before it is elided.
const MAX_LISTED_DAYS: usize = 8;

pub struct Stage2Reshape;

impl Stage2Reshape {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Reshape {
    fn name(&self) -> &'static str {
        "stage2_reshape"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let raw = ctx.raw.as_ref().context("detection matrix not loaded")?;
        let gdd = ctx.gdd.as_ref().context("GDD table not loaded")?;
        let outcome = reshape(raw, gdd, ctx.config.missing_gdd)?;

        if !outcome.excluded.is_empty() {
            let mut days: Vec<&str> = outcome.excluded.iter().map(|(_, d)| d.as_str()).collect();
            days.sort_unstable();
            days.dedup();
            let mut listed = days
                .iter()
                .take(MAX_LISTED_DAYS)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            if days.len() > MAX_LISTED_DAYS {
                listed.push_str(", ...");
            }
            warn!(
                excluded = outcome.excluded.len(),
                days = days.len(),
                "records without GDD excluded"
            );
            ctx.warnings.push(format!(
                "excluded {} sampled cells with no GDD entry (days: {})",
                outcome.excluded.len(),
                listed
            ));
        }
        if outcome.records.is_empty() {
            bail!("no detection records after joining against the GDD table");
        }

        ctx.observed = observed_summary(&outcome.records);
        info!(
            records = outcome.records.len(),
            excluded = outcome.excluded.len(),
            directions = outcome.directions.len(),
            gdd_values = ctx.observed.len(),
            "records_ready"
        );

        ctx.records = outcome.records;
        ctx.excluded = outcome.excluded;
        ctx.directions = outcome.directions;
        Ok(())
    }
}
