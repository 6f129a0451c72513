use eab_gdd::projection::{cumulative_detection, samples_required};
use proptest::prelude::*;

#[test]
fn one_in_ten_needs_about_28_samples() {
    let n = samples_required(0.1, 0.95);
    assert!((n - 28.433).abs() < 1e-3, "n = {}", n);
}

#[test]
fn boundaries() {
    assert_eq!(samples_required(1.0, 0.95), 0.0);
    assert_eq!(samples_required(1.5, 0.95), 0.0);
    assert_eq!(samples_required(0.0, 0.95), f64::INFINITY);
    assert_eq!(samples_required(-0.2, 0.95), f64::INFINITY);
    assert_eq!(samples_required(f64::NAN, 0.95), f64::INFINITY);

    let near_one = samples_required(0.9999, 0.95);
    assert!(near_one > 0.0 && near_one < 0.5, "{}", near_one);
    let near_zero = samples_required(1e-4, 0.95);
    assert!(near_zero > 29_000.0, "{}", near_zero);
    assert!(near_zero.is_finite());
}

proptest! {
    #[test]
    fn more_likely_detection_needs_fewer_samples(a in 1e-6f64..0.999, b in 1e-6f64..0.999) {
        prop_assume!((a - b).abs() > 1e-9);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(samples_required(hi, 0.95) < samples_required(lo, 0.95));
    }

    #[test]
    fn cumulative_detection_hits_target(p in 1e-4f64..0.9999, target in 0.5f64..0.999) {
        let n = samples_required(p, target);
        prop_assert!(n >= 0.0);
        prop_assert!((cumulative_detection(p, n) - target).abs() < 1e-9);
    }
}
