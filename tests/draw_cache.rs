use std::fs;

use eab_gdd::io::draw_cache::{CachePolicy, DrawCache, HEADER_BYTES, fingerprint};
use eab_gdd::model::{LangevinFitter, ModelFitter, ModelSpec, Response, SamplerConfig};
use eab_gdd::records::{DetectionRecord, Direction};
use tempfile::TempDir;

fn records() -> Vec<DetectionRecord> {
    let mut out = Vec::new();
    for t in 0..4 {
        for day in 0..5 {
            out.push(DetectionRecord::new(
                format!("T{}", t),
                day.to_string(),
                100.0 + 40.0 * day as f64,
                Direction('N'),
                ((t + day) % 3) as u32,
            ));
        }
    }
    out
}

fn config() -> SamplerConfig {
    SamplerConfig {
        iterations: 40,
        warmup: 20,
        chains: 1,
        adapt_delta: 0.8,
        seed: 11,
    }
}

#[test]
fn store_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let cache = DrawCache::new(tmp.path().join("draws"));
    let fitter = LangevinFitter::new(5);
    let records = records();
    let outcome = fitter
        .fit(ModelSpec::SmoothGdd, Response::Pos, &records, &config())
        .unwrap();
    let key = fingerprint(
        ModelSpec::SmoothGdd,
        Response::Pos,
        &config(),
        &fitter.tag(),
        &records,
    )
    .unwrap();

    let path = cache.store("gdd_pos", key, &outcome).unwrap();
    assert!(path.ends_with("gdd_pos.draws"));

    let loaded = cache.load("gdd_pos", key).unwrap().unwrap();
    assert_eq!(loaded.draws.n_draws(), outcome.draws.n_draws());
    assert_eq!(loaded.draws.draw(19), outcome.draws.draw(19));
    assert_eq!(loaded.diagnostics, outcome.diagnostics);
    assert_eq!(loaded.draws.structure, outcome.draws.structure);

    assert!(cache.load("tree_pos", key).unwrap().is_none());
}

#[test]
fn fingerprint_tracks_inputs() {
    let records = records();
    let base = fingerprint(ModelSpec::SmoothGdd, Response::Pos, &config(), "x", &records).unwrap();
    let again = fingerprint(ModelSpec::SmoothGdd, Response::Pos, &config(), "x", &records).unwrap();
    assert_eq!(base, again);

    let mut other = config();
    other.seed += 1;
    assert_ne!(
        base,
        fingerprint(ModelSpec::SmoothGdd, Response::Pos, &other, "x", &records).unwrap()
    );
    assert_ne!(
        base,
        fingerprint(ModelSpec::SmoothGdd, Response::Pos2, &config(), "x", &records).unwrap()
    );
    assert_ne!(
        base,
        fingerprint(ModelSpec::SmoothGdd, Response::Pos, &config(), "x", &records[1..]).unwrap()
    );
}

#[test]
fn stale_fingerprint_is_a_miss_and_tampering_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let cache = DrawCache::new(tmp.path());
    let records = records();
    let outcome = LangevinFitter::new(5)
        .fit(ModelSpec::TreeIntercept, Response::Pos, &records, &config())
        .unwrap();
    let path = cache.store("tree_pos", 42, &outcome).unwrap();

    assert!(cache.load("tree_pos", 43).unwrap().is_none());

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&path, &bytes).unwrap();
    let err = format!("{:#}", cache.load("tree_pos", 42).unwrap_err());
    assert!(err.contains("crc64 mismatch"), "{}", err);

    fs::write(&path, b"bad").unwrap();
    let err = format!("{:#}", cache.load("tree_pos", 42).unwrap_err());
    assert!(err.contains("truncated"), "{}", err);

    let mut bytes = vec![0u8; HEADER_BYTES];
    bytes[..8].copy_from_slice(b"NOTDRAWS");
    fs::write(&path, &bytes).unwrap();
    let err = format!("{:#}", cache.load("tree_pos", 42).unwrap_err());
    assert!(err.contains("bad magic"), "{}", err);
}

#[test]
fn policy_flags() {
    assert!(CachePolicy::Auto.reads() && CachePolicy::Auto.writes());
    assert!(!CachePolicy::Refit.reads() && CachePolicy::Refit.writes());
    assert!(!CachePolicy::Off.reads() && !CachePolicy::Off.writes());
    assert_eq!(CachePolicy::default(), CachePolicy::Auto);
}
