use std::path::Path;

use anyhow::{Result, bail};

use crate::error::AnalysisError;
use crate::io::read_delimited;
use crate::records::GddTable;

/// Reads `(day, cumulative GDD)` rows in sampling order.
pub fn read_gdd_table(path: &Path) -> Result<GddTable> {
    let table = read_delimited(path)?;
    if table.header.len() < 2 {
        bail!(
            "{}: GDD table needs two columns (day, gdd), header has {}",
            table.source,
            table.header.len()
        );
    }

    let mut entries = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        if fields.len() < 2 {
            return Err(parse_error(&table.source, *line, "expected 2 columns").into());
        }
        let day = fields[0].clone();
        if day.is_empty() {
            return Err(parse_error(&table.source, *line, "empty day identifier").into());
        }
        let gdd: f64 = fields[1].parse().map_err(|_| {
            parse_error(
                &table.source,
                *line,
                &format!("invalid GDD value '{}'", fields[1]),
            )
        })?;
        entries.push((day, gdd));
    }

    Ok(GddTable::new(entries)?)
}

pub(crate) fn parse_error(source: &str, line: usize, message: &str) -> AnalysisError {
    AnalysisError::Parse {
        source_name: source.to_string(),
        line,
        message: message.to_string(),
    }
}
