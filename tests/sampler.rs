use eab_gdd::error::AnalysisError;
use eab_gdd::model::{Covariates, LangevinFitter, ModelFitter, ModelSpec, Response, SamplerConfig};
use eab_gdd::projection::ProbabilityModel;
use eab_gdd::records::{DetectionRecord, Direction};

const TREES: usize = 20;
const GDD: [f64; 6] = [100.0, 200.0, 300.0, 400.0, 500.0, 600.0];
/// Positive trees per day, roughly logistic(-3 + 6 (gdd - 100) / 500) * 20.
const POSITIVES: [usize; 6] = [1, 3, 7, 13, 17, 19];

fn simulated(directions: &[char]) -> Vec<DetectionRecord> {
    let mut out = Vec::new();
    for (j, (&gdd, &k)) in GDD.iter().zip(&POSITIVES).enumerate() {
        for i in 0..TREES {
            let dir = directions[(i + j) % directions.len()];
            let count = if (i + 7 * j) % TREES < k { 2 } else { 0 };
            out.push(DetectionRecord::new(
                format!("tree{:02}", i),
                format!("d{}", j),
                gdd,
                Direction(dir),
                count,
            ));
        }
    }
    out
}

fn mean_population(model: &dyn ProbabilityModel, gdd: f64) -> f64 {
    let col = model.population_column(gdd);
    col.iter().sum::<f64>() / col.len() as f64
}

#[test]
fn recovers_rising_detection_with_gdd() {
    let records = simulated(&['N']);
    let config = SamplerConfig {
        iterations: 800,
        warmup: 400,
        chains: 2,
        adapt_delta: 0.8,
        seed: 3,
    };
    let outcome = LangevinFitter::new(6)
        .fit(ModelSpec::SmoothGdd, Response::Pos, &records, &config)
        .unwrap();
    assert_eq!(outcome.draws.n_draws(), 800);
    assert_eq!(outcome.diagnostics.acceptance.len(), 2);

    let view = outcome.draws.population(None).unwrap();
    let early = mean_population(&view, 100.0);
    let late = mean_population(&view, 600.0);
    assert!(late - early > 0.5, "early {} late {}", early, late);
    assert!(early < 0.3, "early {}", early);

    for d in 0..view.n_draws() {
        let p = view.predict_population(d, 350.0);
        assert!((0.0..=1.0).contains(&p));
    }
}

#[test]
fn direction_levels_are_checked() {
    let records = simulated(&['N', 'S']);
    let config = SamplerConfig {
        iterations: 40,
        warmup: 20,
        chains: 1,
        adapt_delta: 0.8,
        seed: 5,
    };
    let outcome = LangevinFitter::new(5)
        .fit(ModelSpec::Direction, Response::Pos2, &records, &config)
        .unwrap();

    let reference = outcome.draws.population(None).unwrap();
    assert_eq!(reference.direction(), Some(Direction('N')));
    let south = outcome.draws.population(Some(Direction('S'))).unwrap();
    assert_eq!(south.direction(), Some(Direction('S')));

    let err = outcome.draws.population(Some(Direction('X'))).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidDirection(_)));
}

#[test]
fn direction_model_needs_two_levels() {
    let records = simulated(&['N']);
    let config = SamplerConfig {
        iterations: 20,
        warmup: 10,
        chains: 1,
        adapt_delta: 0.8,
        seed: 5,
    };
    let err = LangevinFitter::new(5)
        .fit(ModelSpec::SmoothGddDirection, Response::Pos, &records, &config)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidDirection(_)));
}

#[test]
fn invalid_sampler_config_rejected() {
    let records = simulated(&['N']);
    let config = SamplerConfig {
        iterations: 10,
        warmup: 10,
        ..SamplerConfig::default()
    };
    let err = LangevinFitter::default()
        .fit(ModelSpec::TreeIntercept, Response::Pos, &records, &config)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}

#[test]
fn population_prediction_drops_tree_effect() {
    let records = simulated(&['N']);
    let config = SamplerConfig {
        iterations: 60,
        warmup: 30,
        chains: 1,
        adapt_delta: 0.8,
        seed: 8,
    };
    let outcome = LangevinFitter::new(5)
        .fit(ModelSpec::SmoothGdd, Response::Pos, &records, &config)
        .unwrap();
    let draws = &outcome.draws;
    let view = draws.population(None).unwrap();

    let with_tree = Covariates {
        gdd: 300.0,
        direction: Direction('N'),
        tree: Some("tree03"),
    };
    let without_tree = Covariates {
        tree: None,
        ..with_tree
    };
    for d in [0, 29] {
        let population = draws.predict(d, &with_tree, false);
        assert_eq!(population, draws.predict(d, &without_tree, true));
        assert!((population - view.predict_population(d, 300.0)).abs() < 1e-12);
        let tree_level = draws.predict(d, &with_tree, true);
        assert!((0.0..=1.0).contains(&tree_level));
    }
}
