/// Independent samples needed so that `1 - (1 - p)^n >= target`.
///
/// `n = ln(1 - target) / ln(1 - p)`, real-valued. `p <= 0` never detects and
/// returns `f64::INFINITY`; `p >= 1` detects with one look and returns 0.
pub fn samples_required(p: f64, target: f64) -> f64 {
    if p >= 1.0 {
        return 0.0;
    }
    if !(p > 0.0) {
        return f64::INFINITY;
    }
    let numerator = (1.0 / (1.0 - target)).ln();
    let denominator = -(-p).ln_1p();
    if denominator == 0.0 {
        return f64::INFINITY;
    }
    numerator / denominator
}

/// Probability of at least one detection in `n` independent samples.
pub fn cumulative_detection(p: f64, n: f64) -> f64 {
    if n == 0.0 {
        return 0.0;
    }
    -(n * (-p).ln_1p()).exp_m1()
}
