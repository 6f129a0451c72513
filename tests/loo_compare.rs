use eab_gdd::error::AnalysisError;
use eab_gdd::loo::{LooEstimate, PointwiseLogLik, compare, loo, pairwise_difference};

/// Log-likelihood matrix stored observation-major.
struct Matrix {
    n_draws: usize,
    columns: Vec<Vec<f64>>,
}

impl Matrix {
    fn from_fn(n_obs: usize, n_draws: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        Self {
            n_draws,
            columns: (0..n_obs)
                .map(|i| (0..n_draws).map(|s| f(i, s)).collect())
                .collect(),
        }
    }
}

impl PointwiseLogLik for Matrix {
    fn n_obs(&self) -> usize {
        self.columns.len()
    }

    fn n_draws(&self) -> usize {
        self.n_draws
    }

    fn log_lik_column(&self, obs: usize) -> Vec<f64> {
        self.columns[obs].clone()
    }
}

fn estimate(n_obs: usize, f: impl Fn(usize, usize) -> f64) -> LooEstimate {
    loo(&Matrix::from_fn(n_obs, 400, f), 1).unwrap()
}

#[test]
fn constant_log_lik_has_no_loo_penalty() {
    let ll = |i: usize| (0.5 + 0.04 * i as f64).ln();
    let est = estimate(10, |i, _| ll(i));
    for (i, p) in est.pointwise.iter().enumerate() {
        assert!((p.elpd_loo - ll(i)).abs() < 1e-10);
        assert!(p.pareto_k <= 0.5);
    }
    assert!(est.p_loo.abs() < 1e-10);
    assert!((est.looic + 2.0 * est.elpd_loo).abs() < 1e-12);
    assert_eq!(est.k_counts.good, 10);
}

#[test]
fn varying_draws_stay_reliable() {
    let est = estimate(20, |i, s| {
        let wobble = ((s * 7 + i * 3) % 23) as f64 / 23.0 - 0.5;
        (0.6 + 0.2 * wobble).ln()
    });
    assert!(est.elpd_loo.is_finite());
    assert!(est.se_elpd_loo >= 0.0);
    assert!(est.p_loo > 0.0);
    assert!(est.unreliable(0.7).is_empty());
}

#[test]
fn better_model_ranked_first() {
    let good = estimate(12, |i, _| if i % 2 == 0 { 0.8f64.ln() } else { 0.7f64.ln() });
    let poor = estimate(12, |_, _| 0.5f64.ln());

    let cmp = compare(&[
        ("poor".to_string(), poor.clone()),
        ("good".to_string(), good.clone()),
    ])
    .unwrap();
    assert_eq!(cmp.best().unwrap().model, "good");
    assert_eq!(cmp.rows[0].elpd_diff, 0.0);
    assert_eq!(cmp.rows[0].se_diff, 0.0);

    let (diff, se) = pairwise_difference(&poor, &good).unwrap();
    assert!((cmp.rows[1].elpd_diff - diff).abs() < 1e-12);
    assert!((cmp.rows[1].se_diff - se).abs() < 1e-12);
    let expected = 6.0 * (0.5f64.ln() - 0.8f64.ln()) + 6.0 * (0.5f64.ln() - 0.7f64.ln());
    assert!((diff - expected).abs() < 1e-9);
    assert!(se > 0.0);
}

#[test]
fn mismatched_observations_rejected() {
    let a = estimate(5, |_, _| -0.5);
    let b = estimate(6, |_, _| -0.5);
    let err = compare(&[("a".to_string(), a), ("b".to_string(), b)]).unwrap_err();
    assert!(matches!(err, AnalysisError::ShapeMismatch(_)));
}

#[test]
fn empty_matrix_rejected() {
    let err = loo(&Matrix::from_fn(0, 10, |_, _| 0.0), 1).unwrap_err();
    assert!(matches!(err, AnalysisError::ShapeMismatch(_)));
}
