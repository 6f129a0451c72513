use anyhow::{Result, bail};

use crate::ctx::Ctx;
use crate::io::tsv_writer::fmt_samples;

pub fn format_summary(ctx: &Ctx) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");
    if ctx.records.is_empty() {
        bail!("no detection records to summarize");
    }
    let trees = ctx.raw.as_ref().map(|r| r.n_trees()).unwrap_or(0);
    let positives = ctx.records.iter().filter(|r| r.pos == 1).count();

    let mut out = String::new();
    out.push_str(&format!("eab-gdd v{}\n", version));
    out.push_str(&format!(
        "Input: {} trees, {} records ({} positive), {} excluded\n",
        trees,
        ctx.records.len(),
        positives,
        ctx.excluded.len()
    ));

    for fit in &ctx.fits {
        let d = &fit.outcome.diagnostics;
        out.push_str(&format!(
            "Fit: {} draws={} accept={:.2} rhat={}{}\n",
            fit.name,
            fit.outcome.draws.n_draws(),
            d.mean_acceptance(),
            d.max_rhat
                .map(|r| format!("{:.3}", r))
                .unwrap_or_else(|| "n/a".to_string()),
            if fit.from_cache { " (cached)" } else { "" }
        ));
    }

    if let Some(cmp) = &ctx.comparison {
        out.push_str("LOO:\n");
        for row in &cmp.rows {
            out.push_str(&format!(
                "  {:<20} elpd={:.2} (se {:.2}) diff={:.2} (se {:.2})\n",
                row.model, row.elpd_loo, row.se_elpd_loo, row.elpd_diff, row.se_diff
            ));
        }
    }

    if let Some(p) = &ctx.projection {
        let rows = &p.distribution.rows;
        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            out.push_str(&format!(
                "Samples required ({}, target {:.2}): {} at GDD {:.1} .. {} at GDD {:.1}\n",
                p.model,
                p.distribution.target,
                fmt_samples(first.q50),
                first.gdd,
                fmt_samples(last.q50),
                last.gdd
            ));
        }
    }

    Ok(out)
}
