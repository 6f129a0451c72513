use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::model::{ModelSpec, Response, SmoothBasis};
use crate::records::{DetectionRecord, Direction, gdd_range};

pub const INTERCEPT: usize = 0;

/// Positions of each parameter block in a draw vector.
///
/// Order: intercept, direction, linear GDD, smooth `z`, smooth log-sd, tree
/// `z`, tree log-sd. Scale parameters are stored on the log scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamLayout {
    pub dim: usize,
    pub direction: Option<usize>,
    pub linear: Option<usize>,
    pub smooth_start: usize,
    pub n_smooth: usize,
    pub log_sd_smooth: Option<usize>,
    pub tree_start: usize,
    pub n_trees: usize,
    pub log_sd_tree: usize,
}

impl ParamLayout {
    pub fn new(has_direction: bool, n_smooth: Option<usize>, n_trees: usize) -> Self {
        let mut next = INTERCEPT + 1;
        let mut take = |n: usize| {
            let at = next;
            next += n;
            at
        };
        let direction = has_direction.then(|| take(1));
        let linear = n_smooth.map(|_| take(1));
        let smooth_start = take(n_smooth.unwrap_or(0));
        let log_sd_smooth = n_smooth.map(|_| take(1));
        let tree_start = take(n_trees);
        let log_sd_tree = take(1);
        Self {
            dim: next,
            direction,
            linear,
            smooth_start,
            n_smooth: n_smooth.unwrap_or(0),
            log_sd_smooth,
            tree_start,
            n_trees,
            log_sd_tree,
        }
    }

    pub fn parameter_name(&self, idx: usize, trees: &[String]) -> String {
        if idx == INTERCEPT {
            return "b_Intercept".to_string();
        }
        if Some(idx) == self.direction {
            return "b_direction".to_string();
        }
        if Some(idx) == self.linear {
            return "bs_gdd".to_string();
        }
        if Some(idx) == self.log_sd_smooth {
            return "log_sds_gdd".to_string();
        }
        if idx == self.log_sd_tree {
            return "log_sd_tree".to_string();
        }
        if (self.smooth_start..self.smooth_start + self.n_smooth).contains(&idx) {
            return format!("zs_gdd[{}]", idx - self.smooth_start + 1);
        }
        if (self.tree_start..self.tree_start + self.n_trees).contains(&idx) {
            let t = idx - self.tree_start;
            return format!("z_tree[{}]", trees.get(t).map(String::as_str).unwrap_or("?"));
        }
        format!("theta[{}]", idx)
    }
}

/// Everything needed to evaluate a draw, independent of the fitting data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStructure {
    pub spec: ModelSpec,
    pub response: Response,
    pub layout: ParamLayout,
    pub basis: Option<SmoothBasis>,
    /// Sorted tree levels.
    pub trees: Vec<String>,
    /// Sorted direction levels; the first is the reference.
    pub directions: Vec<Direction>,
}

impl ModelStructure {
    pub fn from_records(
        spec: ModelSpec,
        response: Response,
        records: &[DetectionRecord],
        basis_dim: usize,
    ) -> AnalysisResult<Self> {
        let (lower, upper) = gdd_range(records)
            .ok_or_else(|| AnalysisError::ShapeMismatch("no detection records".to_string()))?;

        let mut trees: Vec<String> = records.iter().map(|r| r.tree.clone()).collect();
        trees.sort();
        trees.dedup();
        let mut directions: Vec<Direction> = records.iter().map(|r| r.direction).collect();
        directions.sort();
        directions.dedup();

        if spec.has_direction() && directions.len() != 2 {
            return Err(AnalysisError::InvalidDirection(format!(
                "model '{}' needs two observed directions, found {}",
                spec.name(),
                directions.len()
            )));
        }

        let basis = if spec.has_smooth() {
            Some(SmoothBasis::new(lower, upper, basis_dim)?)
        } else {
            None
        };
        let layout = ParamLayout::new(
            spec.has_direction(),
            basis.as_ref().map(SmoothBasis::n_penalized),
            trees.len(),
        );

        Ok(Self {
            spec,
            response,
            layout,
            basis,
            trees,
            directions,
        })
    }

    pub fn tree_index(&self, tree: &str) -> Option<usize> {
        self.trees
            .binary_search_by(|t| t.as_str().cmp(tree))
            .ok()
    }

    /// 1 for the non-reference direction, 0 otherwise.
    pub fn direction_indicator(&self, direction: Direction) -> f64 {
        if self.directions.len() == 2 && direction == self.directions[1] {
            1.0
        } else {
            0.0
        }
    }

    pub fn row(&self, gdd: f64, direction: Direction, tree: Option<&str>) -> CovariateRow {
        let (linear, smooth) = match &self.basis {
            Some(basis) => (basis.linear(gdd), basis.penalized(gdd)),
            None => (0.0, Vec::new()),
        };
        CovariateRow {
            direction: self.direction_indicator(direction),
            linear,
            smooth,
            tree: tree.and_then(|t| self.tree_index(t)),
        }
    }

    /// Linear predictor of one draw. Tree effects apply only when `row.tree` is set.
    pub fn eta(&self, theta: &[f64], row: &RowRef<'_>) -> f64 {
        let layout = &self.layout;
        let mut eta = theta[INTERCEPT];
        if let Some(d) = layout.direction {
            eta += theta[d] * row.direction;
        }
        if let Some(l) = layout.linear {
            eta += theta[l] * row.linear;
        }
        if let Some(ls) = layout.log_sd_smooth {
            let z = &theta[layout.smooth_start..layout.smooth_start + layout.n_smooth];
            let s: f64 = z.iter().zip(row.smooth).map(|(a, b)| a * b).sum();
            eta += theta[ls].exp() * s;
        }
        if let Some(t) = row.tree {
            eta += theta[layout.log_sd_tree].exp() * theta[layout.tree_start + t];
        }
        eta
    }
}

/// Covariates of one prediction, transformed to model columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateRow {
    pub direction: f64,
    pub linear: f64,
    pub smooth: Vec<f64>,
    pub tree: Option<usize>,
}

impl CovariateRow {
    pub fn view(&self) -> RowRef<'_> {
        RowRef {
            direction: self.direction,
            linear: self.linear,
            smooth: &self.smooth,
            tree: self.tree,
        }
    }

    pub fn without_tree(mut self) -> Self {
        self.tree = None;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub direction: f64,
    pub linear: f64,
    pub smooth: &'a [f64],
    pub tree: Option<usize>,
}

/// Model columns for every fitting observation.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub y: Vec<f64>,
    direction: Vec<f64>,
    linear: Vec<f64>,
    smooth: Vec<f64>,
    n_smooth: usize,
    tree: Vec<Option<usize>>,
}

impl DesignMatrix {
    pub fn build(structure: &ModelStructure, records: &[DetectionRecord]) -> Self {
        let n_smooth = structure.layout.n_smooth;
        let mut out = Self {
            y: Vec::with_capacity(records.len()),
            direction: Vec::with_capacity(records.len()),
            linear: Vec::with_capacity(records.len()),
            smooth: Vec::with_capacity(records.len() * n_smooth),
            n_smooth,
            tree: Vec::with_capacity(records.len()),
        };
        for r in records {
            let row = structure.row(r.gdd, r.direction, Some(r.tree.as_str()));
            out.y.push(structure.response.value(r));
            out.direction.push(row.direction);
            out.linear.push(row.linear);
            out.smooth.extend_from_slice(&row.smooth);
            out.tree.push(row.tree);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn row(&self, i: usize) -> RowRef<'_> {
        RowRef {
            direction: self.direction[i],
            linear: self.linear[i],
            smooth: &self.smooth[i * self.n_smooth..(i + 1) * self.n_smooth],
            tree: self.tree[i],
        }
    }
}

pub(crate) fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^x)` without overflow.
pub(crate) fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

pub(crate) fn log_bernoulli(y: f64, eta: f64) -> f64 {
    y * eta - softplus(eta)
}
