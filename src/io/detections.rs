use std::path::Path;

use anyhow::{Result, bail};

use crate::io::gdd::parse_error;
use crate::io::{MISSING_TOKENS, read_delimited};
use crate::records::RawDetectionMatrix;

/// Reads the wide tree x sampling-column matrix. The first column holds the
/// tree identifier; every other header names a `<day><direction>` column.
pub fn read_detection_matrix(path: &Path) -> Result<RawDetectionMatrix> {
    let table = read_delimited(path)?;
    if table.header.len() < 2 {
        bail!(
            "{}: detection matrix needs a tree column and at least one sampling column",
            table.source
        );
    }
    let columns: Vec<String> = table.header[1..].to_vec();

    let mut rows = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        if fields.len() != table.header.len() {
            return Err(parse_error(
                &table.source,
                *line,
                &format!(
                    "expected {} columns, found {}",
                    table.header.len(),
                    fields.len()
                ),
            )
            .into());
        }
        let tree = fields[0].clone();
        if tree.is_empty() {
            return Err(parse_error(&table.source, *line, "empty tree identifier").into());
        }
        let mut counts = Vec::with_capacity(columns.len());
        for (col, cell) in columns.iter().zip(&fields[1..]) {
            counts.push(parse_count(cell).ok_or_else(|| {
                parse_error(
                    &table.source,
                    *line,
                    &format!("invalid count '{}' in column '{}'", cell, col),
                )
            })?);
        }
        rows.push((tree, counts));
    }

    Ok(RawDetectionMatrix::new(columns, rows)?)
}

/// `Some(None)` for a missing cell, `None` for an unparseable one.
pub fn parse_count(cell: &str) -> Option<Option<u32>> {
    if MISSING_TOKENS.contains(&cell) {
        return Some(None);
    }
    if let Ok(v) = cell.parse::<u32>() {
        return Some(Some(v));
    }
    // Spreadsheet exports write integral counts as "2.0".
    let v: f64 = cell.parse().ok()?;
    if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(Some(v as u32))
    } else {
        None
    }
}
