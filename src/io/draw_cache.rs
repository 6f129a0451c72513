use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crc::{CRC_64_ECMA_182, Crc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::model::{FitOutcome, ModelSpec, Response, SamplerConfig};
use crate::records::DetectionRecord;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

pub const MAGIC: [u8; 8] = *b"EABDRAWS";
pub const FORMAT_VERSION: u32 = 1;
/// magic + version + fingerprint + crc64 + payload length
pub const HEADER_BYTES: usize = 8 + 4 + 8 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Reuse a blob whose fingerprint matches, otherwise fit and store.
    #[default]
    Auto,
    /// Always fit and overwrite.
    Refit,
    /// Always fit, never store.
    Off,
}

impl CachePolicy {
    pub fn reads(self) -> bool {
        matches!(self, CachePolicy::Auto)
    }

    pub fn writes(self) -> bool {
        !matches!(self, CachePolicy::Off)
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    spec: ModelSpec,
    response: Response,
    config: &'a SamplerConfig,
    fitter: &'a str,
    records: &'a [DetectionRecord],
}

/// Identifies everything a draw set depends on.
pub fn fingerprint(
    spec: ModelSpec,
    response: Response,
    config: &SamplerConfig,
    fitter_tag: &str,
    records: &[DetectionRecord],
) -> Result<u64> {
    let input = FingerprintInput {
        spec,
        response,
        config,
        fitter: fitter_tag,
        records,
    };
    let bytes = serde_json::to_vec(&input)?;
    Ok(CRC64.checksum(&bytes))
}

/// Directory of `<model>.draws` blobs.
#[derive(Debug, Clone)]
pub struct DrawCache {
    dir: PathBuf,
}

impl DrawCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{}.draws", model))
    }

    /// `Ok(None)` when no blob exists or its fingerprint is stale.
    pub fn load(&self, model: &str, fingerprint: u64) -> Result<Option<FitOutcome>> {
        let path = self.path_for(model);
        if !path.exists() {
            debug!(model, path = %path.display(), "draw cache miss");
            return Ok(None);
        }
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let blob = decode_header(&path, &bytes)?;
        if blob.fingerprint != fingerprint {
            info!(
                model,
                cached = %format!("{:016x}", blob.fingerprint),
                expected = %format!("{:016x}", fingerprint),
                "draw cache stale"
            );
            return Ok(None);
        }

        let mut json = Vec::new();
        GzDecoder::new(blob.payload)
            .read_to_end(&mut json)
            .map_err(|e| corrupt(&path, format!("gzip payload: {}", e)))?;
        let outcome: FitOutcome = serde_json::from_slice(&json)
            .map_err(|e| corrupt(&path, format!("payload: {}", e)))?;
        info!(model, draws = outcome.draws.n_draws(), "draw cache hit");
        Ok(Some(outcome))
    }

    pub fn store(&self, model: &str, fingerprint: u64, outcome: &FitOutcome) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(model);

        let json = serde_json::to_vec(outcome)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let payload = encoder.finish()?;

        let mut bytes = Vec::with_capacity(HEADER_BYTES + payload.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&fingerprint.to_le_bytes());
        bytes.extend_from_slice(&CRC64.checksum(&payload).to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);

        fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(model, bytes = bytes.len(), path = %path.display(), "draw cache stored");
        Ok(path)
    }
}

struct Blob<'a> {
    fingerprint: u64,
    payload: &'a [u8],
}

fn decode_header<'a>(path: &Path, bytes: &'a [u8]) -> Result<Blob<'a>, AnalysisError> {
    if bytes.len() < HEADER_BYTES {
        return Err(corrupt(path, format!("truncated header ({} bytes)", bytes.len())));
    }
    if bytes[0..8] != MAGIC {
        return Err(corrupt(path, "bad magic".to_string()));
    }
    let version = u32::from_le_bytes(le_array(&bytes[8..12]));
    if version != FORMAT_VERSION {
        return Err(corrupt(path, format!("unsupported format version {}", version)));
    }
    let fingerprint = u64::from_le_bytes(le_array(&bytes[12..20]));
    let expected_crc = u64::from_le_bytes(le_array(&bytes[20..28]));
    let len = u64::from_le_bytes(le_array(&bytes[28..36])) as usize;
    let payload = &bytes[HEADER_BYTES..];
    if payload.len() != len {
        return Err(corrupt(
            path,
            format!("payload length {} != header {}", payload.len(), len),
        ));
    }
    let actual_crc = CRC64.checksum(payload);
    if actual_crc != expected_crc {
        return Err(corrupt(
            path,
            format!(
                "crc64 mismatch (header {:016x}, payload {:016x})",
                expected_crc, actual_crc
            ),
        ));
    }
    Ok(Blob {
        fingerprint,
        payload,
    })
}

fn le_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

fn corrupt(path: &Path, reason: String) -> AnalysisError {
    AnalysisError::CacheCorrupt {
        path: path.display().to_string(),
        reason,
    }
}
