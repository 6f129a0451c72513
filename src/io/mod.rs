use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Serialize;

pub mod detections;
pub mod draw_cache;
pub mod gdd;
pub mod json_writer;
pub mod summary;
pub mod tsv_writer;

/// Cell values read as "not sampled".
pub const MISSING_TOKENS: [&str; 4] = ["", "NA", "NaN", "."];

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub(crate) fn open_maybe_gz(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let decoder = GzDecoder::new(file);
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

/// Header plus data rows of a delimited text file, with 1-based line numbers.
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub source: String,
    pub header: Vec<String>,
    pub rows: Vec<(usize, Vec<String>)>,
}

/// Comma-separated for `.csv` / `.csv.gz`, tab-separated otherwise.
pub fn delimiter_for(path: &Path) -> char {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if name.ends_with(".csv") || name.ends_with(".csv.gz") {
        ','
    } else {
        '\t'
    }
}

/// Reads a delimited file, skipping blank and `#` lines. Fields are trimmed;
/// quoted fields may contain the delimiter.
pub fn read_delimited(path: &Path) -> Result<DelimitedTable> {
    let source = path.display().to_string();
    let delimiter = delimiter_for(path) as u8;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(open_maybe_gz(path)?);

    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", source))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let line_no = record.position().map_or(0, |p| p.line() as usize);
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        if header.is_none() {
            header = Some(fields);
        } else {
            rows.push((line_no, fields));
        }
    }

    let header = header.with_context(|| format!("{} has no header row", source))?;
    Ok(DelimitedTable {
        source,
        header,
        rows,
    })
}
