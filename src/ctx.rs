use std::path::PathBuf;

use crate::io::draw_cache::CachePolicy;
use crate::loo::{LooComparison, LooEstimate};
use crate::model::{FitOutcome, LangevinFitter, ModelFitter, ModelSpec, Response, SamplerConfig};
use crate::projection::{DEFAULT_GRID_POINTS, DEFAULT_TARGET, SamplesRequiredDistribution};
use crate::records::{
    DetectionRecord, Direction, GddTable, MissingCovariatePolicy, ObservedPoint,
    RawDetectionMatrix,
};
use crate::schema::v1::EabGddV1;

pub const DEFAULT_BASIS_DIM: usize = 10;

/// Analysis knobs shared by every subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub models: Vec<ModelSpec>,
    pub response: Response,
    pub missing_gdd: MissingCovariatePolicy,
    pub cache: CachePolicy,
    pub sampler: SamplerConfig,
    pub basis_dim: usize,
    pub target: f64,
    pub grid_points: usize,
    /// `None` skips the projection stage.
    pub project_model: Option<ModelSpec>,
    /// Direction level used for population predictions of direction models.
    pub direction: Option<Direction>,
    pub compare: bool,
    pub reloo: bool,
    pub threads: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            models: ModelSpec::ALL.to_vec(),
            response: Response::Pos,
            missing_gdd: MissingCovariatePolicy::Exclude,
            cache: CachePolicy::Auto,
            sampler: SamplerConfig::default(),
            basis_dim: DEFAULT_BASIS_DIM,
            target: DEFAULT_TARGET,
            grid_points: DEFAULT_GRID_POINTS,
            project_model: Some(ModelSpec::SmoothGdd),
            direction: None,
            compare: true,
            reloo: false,
            threads: 0,
        }
    }
}

impl AnalysisConfig {
    /// Requested models plus the projection model, in order, without repeats.
    pub fn fitted_models(&self) -> Vec<ModelSpec> {
        let mut out: Vec<ModelSpec> = Vec::new();
        for spec in self.models.iter().copied().chain(self.project_model) {
            if !out.contains(&spec) {
                out.push(spec);
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub out_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub records_tsv: PathBuf,
    pub observed_tsv: PathBuf,
    pub loo_tsv: PathBuf,
    pub samples_tsv: PathBuf,
    pub json_path: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: PathBuf, cache_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.unwrap_or_else(|| out_dir.join("draws")),
            records_tsv: out_dir.join("records.tsv"),
            observed_tsv: out_dir.join("observed.tsv"),
            loo_tsv: out_dir.join("loo.tsv"),
            samples_tsv: out_dir.join("samples_required.tsv"),
            json_path: out_dir.join("report.json"),
            out_dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FittedModel {
    pub spec: ModelSpec,
    pub name: String,
    pub outcome: FitOutcome,
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
pub struct ModelLoo {
    pub name: String,
    pub estimate: LooEstimate,
    pub refits: usize,
}

#[derive(Debug, Clone)]
pub struct ProjectionResult {
    pub model: String,
    pub direction: Option<Direction>,
    pub distribution: SamplesRequiredDistribution,
}

pub struct Ctx {
    pub detections_path: PathBuf,
    pub gdd_path: PathBuf,
    pub config: AnalysisConfig,
    pub fitter: Box<dyn ModelFitter>,
    pub write_json: bool,
    pub write_tsv: bool,
    pub tool_version: String,
    pub output: OutputPaths,
    pub gdd: Option<GddTable>,
    pub raw: Option<RawDetectionMatrix>,
    pub records: Vec<DetectionRecord>,
    pub excluded: Vec<(String, String)>,
    pub directions: Vec<Direction>,
    pub observed: Vec<ObservedPoint>,
    pub fits: Vec<FittedModel>,
    pub loo: Vec<ModelLoo>,
    pub comparison: Option<LooComparison>,
    pub projection: Option<ProjectionResult>,
    pub warnings: Vec<String>,
    pub report: Option<EabGddV1>,
}

impl Ctx {
    pub fn new(
        detections_path: PathBuf,
        gdd_path: PathBuf,
        out_dir: PathBuf,
        config: AnalysisConfig,
        tool_version: &str,
    ) -> Self {
        let fitter = LangevinFitter::new(config.basis_dim).with_threads(config.threads);
        Self {
            detections_path,
            gdd_path,
            fitter: Box::new(fitter),
            config,
            write_json: true,
            write_tsv: true,
            tool_version: tool_version.to_string(),
            output: OutputPaths::new(out_dir, None),
            gdd: None,
            raw: None,
            records: Vec::new(),
            excluded: Vec::new(),
            directions: Vec::new(),
            observed: Vec::new(),
            fits: Vec::new(),
            loo: Vec::new(),
            comparison: None,
            projection: None,
            warnings: Vec::new(),
            report: None,
        }
    }

    pub fn fit(&self, spec: ModelSpec) -> Option<&FittedModel> {
        self.fits.iter().find(|f| f.spec == spec)
    }
}
