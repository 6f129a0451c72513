use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub iterations: usize,
    pub warmup: usize,
    pub chains: usize,
    pub adapt_delta: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub models: Vec<String>,
    pub response: String,
    pub missing_gdd: String,
    pub cache: String,
    pub fitter: String,
    pub basis_dim: usize,
    pub sampler: SamplerSettings,
    pub target: f64,
    pub grid_points: usize,
    pub reloo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMeta {
    pub detections: String,
    pub gdd_table: String,
    pub trees: usize,
    pub sampling_columns: usize,
    pub gdd_days: usize,
    pub records: usize,
    pub excluded_records: usize,
    pub directions: Vec<String>,
    pub gdd_min: Option<f64>,
    pub gdd_max: Option<f64>,
    pub positives: usize,
    pub positives2: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFit {
    pub name: String,
    pub formula: String,
    pub draws: usize,
    pub chains: usize,
    pub from_cache: bool,
    pub mean_acceptance: f64,
    pub step_size: Vec<f64>,
    pub max_rhat: Option<f64>,
    pub worst_parameter: Option<String>,
    pub convergence_warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParetoK {
    pub good: usize,
    pub ok: usize,
    pub bad: usize,
    pub very_bad: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub model: String,
    pub elpd_loo: f64,
    pub se_elpd_loo: f64,
    pub elpd_diff: f64,
    pub se_diff: f64,
    pub p_loo: f64,
    pub looic: f64,
    pub pareto_k: ParetoK,
    pub refits: usize,
}

/// One grid point. `None` marks an unbounded number of samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub gdd: f64,
    pub q2_5: Option<f64>,
    pub q10: Option<f64>,
    pub q50: Option<f64>,
    pub q90: Option<f64>,
    pub q97_5: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub model: String,
    pub direction: Option<String>,
    pub target: f64,
    pub draws: usize,
    pub rows: Vec<ProjectionRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EabGddV1 {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub config: RunConfig,
    pub input: InputMeta,
    pub fits: Vec<ModelFit>,
    pub comparison: Option<Vec<ComparisonEntry>>,
    pub projection: Option<Projection>,
    pub warnings: Vec<String>,
}
