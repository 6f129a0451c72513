use eab_gdd::error::AnalysisError;
use eab_gdd::loo::{K_THRESHOLD, loo, refit_unreliable};
use eab_gdd::model::{LangevinFitter, ModelFitter, ModelSpec, Response, SamplerConfig};
use eab_gdd::records::{DetectionRecord, Direction};

fn records() -> Vec<DetectionRecord> {
    let mut out = Vec::new();
    for t in 0..5 {
        for day in 0..4 {
            out.push(DetectionRecord::new(
                format!("T{}", t),
                day.to_string(),
                80.0 + 60.0 * day as f64,
                Direction('N'),
                u32::from((t + 2 * day) % 4 >= 2),
            ));
        }
    }
    out
}

fn config() -> SamplerConfig {
    SamplerConfig {
        iterations: 200,
        warmup: 100,
        chains: 1,
        adapt_delta: 0.8,
        seed: 17,
    }
}

#[test]
fn unreliable_points_are_refit_exactly() {
    let records = records();
    let fitter = LangevinFitter::new(5);
    let outcome = fitter
        .fit(ModelSpec::SmoothGdd, Response::Pos, &records, &config())
        .unwrap();
    let mut estimate = loo(&outcome.draws.pointwise(&records), 1).unwrap();
    estimate.pointwise[0].pareto_k = 0.9;
    let flagged = estimate.unreliable(K_THRESHOLD).len();

    let summary = refit_unreliable(
        &mut estimate,
        &fitter,
        ModelSpec::SmoothGdd,
        Response::Pos,
        &records,
        &config(),
        K_THRESHOLD,
    )
    .unwrap();

    assert_eq!(summary.refitted, flagged);
    assert_eq!(summary.skipped, 0);
    assert!(estimate.pointwise[0].refit);
    assert_eq!(estimate.pointwise[0].pareto_k, 0.0);
    assert!(estimate.pointwise[0].elpd_loo < 0.0);
    assert!(estimate.unreliable(K_THRESHOLD).is_empty());
    assert_eq!(estimate.k_counts.bad + estimate.k_counts.very_bad, 0);
    assert!(estimate.elpd_loo.is_finite());
}

#[test]
fn record_count_must_match_estimate() {
    let records = records();
    let fitter = LangevinFitter::new(5);
    let outcome = fitter
        .fit(ModelSpec::TreeIntercept, Response::Pos, &records, &config())
        .unwrap();
    let mut estimate = loo(&outcome.draws.pointwise(&records), 1).unwrap();
    let err = refit_unreliable(
        &mut estimate,
        &fitter,
        ModelSpec::TreeIntercept,
        Response::Pos,
        &records[1..],
        &config(),
        K_THRESHOLD,
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::ShapeMismatch(_)));
}

#[test]
fn lone_direction_observation_keeps_psis_estimate() {
    let mut records = records();
    records[3].direction = Direction('S');
    let fitter = LangevinFitter::new(5);
    let outcome = fitter
        .fit(ModelSpec::Direction, Response::Pos, &records, &config())
        .unwrap();
    let mut estimate = loo(&outcome.draws.pointwise(&records), 1).unwrap();
    estimate.pointwise[3].pareto_k = 0.9;
    let psis_elpd = estimate.pointwise[3].elpd_loo;

    let summary = refit_unreliable(
        &mut estimate,
        &fitter,
        ModelSpec::Direction,
        Response::Pos,
        &records,
        &config(),
        K_THRESHOLD,
    )
    .unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(!estimate.pointwise[3].refit);
    assert_eq!(estimate.pointwise[3].pareto_k, 0.9);
    assert_eq!(estimate.pointwise[3].elpd_loo, psis_elpd);
    assert_eq!(estimate.unreliable(K_THRESHOLD), vec![3]);
}
