//! Pareto-smoothed importance sampling.

use crate::math::stats::log_sum_exp;

const MIN_TAIL: usize = 5;
const MIN_GRID_POINTS: usize = 30;
const GRID_PRIOR: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct PsisResult {
    /// Smoothed, unnormalized log weights.
    pub log_weights: Vec<f64>,
    pub pareto_k: f64,
}

/// Tail length for `s` draws with unit relative efficiency.
pub fn tail_len(s: usize) -> usize {
    let s = s as f64;
    (0.2 * s).min(3.0 * s.sqrt()).ceil() as usize
}

/// Smooths the largest importance ratios with a generalized Pareto fit.
pub fn psis(log_ratios: &[f64]) -> PsisResult {
    let s = log_ratios.len();
    let max_ratio = log_ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut lw: Vec<f64> = log_ratios.iter().map(|r| r - max_ratio).collect();
    let mut k = f64::INFINITY;

    let m = tail_len(s);
    if m >= MIN_TAIL && m < s {
        let mut order: Vec<usize> = (0..s).collect();
        order.sort_by(|&a, &b| lw[a].total_cmp(&lw[b]));
        let tail_ids = &order[s - m..];
        let cutoff = lw[order[s - m - 1]];
        let tail: Vec<f64> = tail_ids.iter().map(|&i| lw[i]).collect();
        let spread = tail[m - 1] - tail[0];
        if spread.abs() > f64::EPSILON / 100.0 {
            let (smoothed, khat) = smooth_tail(&tail, cutoff);
            for (&i, v) in tail_ids.iter().zip(smoothed) {
                lw[i] = v;
            }
            k = khat;
        } else {
            // Flat tail: the raw weights are already exact.
            k = 0.0;
        }
    }

    for v in &mut lw {
        if *v > 0.0 {
            *v = 0.0;
        }
        *v += max_ratio;
    }
    PsisResult {
        log_weights: lw,
        pareto_k: k,
    }
}

/// Replaces a sorted log-scale tail by expected GPD order statistics.
fn smooth_tail(tail: &[f64], cutoff: f64) -> (Vec<f64>, f64) {
    let exp_cutoff = cutoff.exp();
    let x: Vec<f64> = tail.iter().map(|v| v.exp() - exp_cutoff).collect();
    let (k, sigma) = gpd_fit(&x);
    if !k.is_finite() {
        return (tail.to_vec(), k);
    }
    let len = tail.len() as f64;
    let smoothed = (0..tail.len())
        .map(|i| {
            let p = (i as f64 + 0.5) / len;
            (gpd_quantile(p, k, sigma) + exp_cutoff).ln()
        })
        .collect();
    (smoothed, k)
}

/// Zhang & Stephens (2009) profile estimate of GPD shape and scale for sorted
/// exceedances, with the weakly informative shrinkage of Vehtari et al.
pub fn gpd_fit(x: &[f64]) -> (f64, f64) {
    let n = x.len();
    if n == 0 {
        return (f64::INFINITY, f64::NAN);
    }
    let nf = n as f64;
    let m = MIN_GRID_POINTS + nf.sqrt().floor() as usize;
    let x_star = x[((nf / 4.0 + 0.5).floor() as usize).clamp(1, n) - 1];
    let x_max = x[n - 1];

    let theta: Vec<f64> = (1..=m)
        .map(|j| 1.0 / x_max + (1.0 - (m as f64 / (j as f64 - 0.5)).sqrt()) / GRID_PRIOR / x_star)
        .collect();
    let log_lik: Vec<f64> = theta
        .iter()
        .map(|&t| {
            let b = -t;
            let k = x.iter().map(|&xi| (b * xi).ln_1p()).sum::<f64>() / nf;
            nf * ((b / k).ln() - k - 1.0)
        })
        .collect();
    let norm = log_sum_exp(&log_lik);
    let theta_hat: f64 = theta
        .iter()
        .zip(&log_lik)
        .map(|(t, l)| t * (l - norm).exp())
        .sum();

    let k = x.iter().map(|&xi| (-theta_hat * xi).ln_1p()).sum::<f64>() / nf;
    let sigma = -k / theta_hat;
    let k = (k * nf + 0.5 * 10.0) / (nf + 10.0);
    if k.is_nan() {
        return (f64::INFINITY, sigma);
    }
    (k, sigma)
}

fn gpd_quantile(p: f64, k: f64, sigma: f64) -> f64 {
    if k.abs() < 1e-12 {
        return -sigma * (-p).ln_1p();
    }
    sigma * (-k * (-p).ln_1p()).exp_m1() / k
}
