use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::ctx::ModelLoo;
use crate::loo::LooComparison;
use crate::projection::SamplesRequiredDistribution;
use crate::records::{DetectionRecord, ObservedPoint};

fn create(path: &Path) -> Result<BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_records(path: &Path, records: &[DetectionRecord]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(w, "tree\tday\tgdd\tdirection\tcount\tpos\tpos2")?;
    for r in records {
        writeln!(
            w,
            "{}\t{}\t{:.6}\t{}\t{}\t{}\t{}",
            r.tree, r.day, r.gdd, r.direction, r.count, r.pos, r.pos2
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_observed(path: &Path, observed: &[ObservedPoint]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(w, "gdd\tn\tn_pos\tn_pos2\tprop_pos\tprop_pos2")?;
    for p in observed {
        writeln!(
            w,
            "{:.6}\t{}\t{}\t{}\t{:.6}\t{:.6}",
            p.gdd, p.n, p.n_pos, p.n_pos2, p.prop_pos, p.prop_pos2
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_comparison(path: &Path, comparison: &LooComparison, loo: &[ModelLoo]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "model\telpd_loo\tse_elpd_loo\telpd_diff\tse_diff\tp_loo\tlooic\tk_good\tk_ok\tk_bad\tk_very_bad"
    )?;
    for row in &comparison.rows {
        let Some(model) = loo.iter().find(|m| m.name == row.model) else {
            bail!("no LOO estimate for compared model {}", row.model);
        };
        let k = model.estimate.k_counts;
        writeln!(
            w,
            "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}\t{}\t{}\t{}",
            row.model,
            row.elpd_loo,
            row.se_elpd_loo,
            row.elpd_diff,
            row.se_diff,
            row.p_loo,
            row.looic,
            k.good,
            k.ok,
            k.bad,
            k.very_bad
        )?;
    }
    w.flush()?;
    Ok(())
}

/// Writes `inf` for an unbounded number of samples.
pub fn write_samples_required(path: &Path, dist: &SamplesRequiredDistribution) -> Result<()> {
    let mut w = create(path)?;
    writeln!(w, "gdd\tq2.5\tq10\tq50\tq90\tq97.5")?;
    for row in &dist.rows {
        writeln!(
            w,
            "{:.6}\t{}\t{}\t{}\t{}\t{}",
            row.gdd,
            fmt_samples(row.q025),
            fmt_samples(row.q10),
            fmt_samples(row.q50),
            fmt_samples(row.q90),
            fmt_samples(row.q975)
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn fmt_samples(n: f64) -> String {
    if n.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.6}", n)
    }
}
