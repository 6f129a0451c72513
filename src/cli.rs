use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::ctx::DEFAULT_BASIS_DIM;
use crate::io::draw_cache::CachePolicy;
use crate::model::{ModelSpec, Response};
use crate::records::MissingCovariatePolicy;

#[derive(Debug, Parser)]
#[command(
    name = "eab-gdd",
    version,
    about = "eDNA detection of emerald ash borer against growing degree days"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reshape, fit every model, compare by LOO, project samples required.
    Run(RunArgs),
    /// Load and reshape the inputs without fitting.
    Validate(ValidateArgs),
    /// Fit (or load) one model and project samples required over GDD.
    Project(ProjectArgs),
    /// List the candidate model specifications.
    Models(ModelsArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    #[arg(long, help = "Detection matrix: tree column, then <day><direction> columns")]
    pub detections: PathBuf,

    #[arg(long, help = "GDD table: day, cumulative GDD")]
    pub gdd: PathBuf,

    #[arg(long, value_enum, default_value_t = MissingGddArg::Exclude)]
    pub missing_gdd: MissingGddArg,
}

#[derive(Debug, Args)]
pub struct FitArgs {
    #[arg(long, value_enum, default_value_t = ResponseArg::Pos)]
    pub response: ResponseArg,

    #[arg(long, default_value_t = 4000)]
    pub iterations: usize,

    #[arg(long, default_value_t = 2000)]
    pub warmup: usize,

    #[arg(long, default_value_t = 4)]
    pub chains: usize,

    #[arg(long, default_value_t = 0.95, help = "Target acceptance for step size adaptation")]
    pub adapt_delta: f64,

    #[arg(long, default_value_t = 20190601)]
    pub seed: u64,

    #[arg(long, default_value_t = DEFAULT_BASIS_DIM, help = "Spline basis functions for s(gdd)")]
    pub basis_dim: usize,

    #[arg(long, value_enum, default_value_t = CacheArg::Auto)]
    pub cache: CacheArg,

    #[arg(long, help = "Draw cache directory (default: <out>/draws)")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 0, help = "Number of threads (0 = auto)")]
    pub threads: usize,
}

#[derive(Debug, Args)]
pub struct ProjectionArgs {
    #[arg(long, default_value_t = 0.95, help = "Target cumulative detection probability")]
    pub target: f64,

    #[arg(long, default_value_t = 100)]
    pub grid_points: usize,

    #[arg(long, help = "Direction level for population predictions (default: reference level)")]
    pub direction: Option<char>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long)]
    pub out: PathBuf,

    #[command(flatten)]
    pub fit: FitArgs,

    #[command(flatten)]
    pub projection: ProjectionArgs,

    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        help = "Models to fit and compare (default: all)"
    )]
    pub models: Vec<ModelArg>,

    #[arg(long, value_enum, default_value_t = ModelArg::Gdd, help = "Model used for projection")]
    pub project: ModelArg,

    #[arg(long, default_value_t = false)]
    pub no_project: bool,

    #[arg(long, default_value_t = false, help = "Refit observations with Pareto k > 0.7")]
    pub reloo: bool,

    #[arg(long, default_value_t = false)]
    pub no_json: bool,

    #[arg(long, default_value_t = false)]
    pub no_tsv: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long)]
    pub out: PathBuf,

    #[command(flatten)]
    pub fit: FitArgs,

    #[command(flatten)]
    pub projection: ProjectionArgs,

    #[arg(long, value_enum, default_value_t = ModelArg::Gdd)]
    pub model: ModelArg,
}

#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[arg(long, value_enum, default_value_t = ResponseArg::Pos)]
    pub response: ResponseArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    Tree,
    Gdd,
    GddDirection,
    Direction,
}

impl From<ModelArg> for ModelSpec {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Tree => ModelSpec::TreeIntercept,
            ModelArg::Gdd => ModelSpec::SmoothGdd,
            ModelArg::GddDirection => ModelSpec::SmoothGddDirection,
            ModelArg::Direction => ModelSpec::Direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResponseArg {
    Pos,
    Pos2,
}

impl From<ResponseArg> for Response {
    fn from(arg: ResponseArg) -> Self {
        match arg {
            ResponseArg::Pos => Response::Pos,
            ResponseArg::Pos2 => Response::Pos2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingGddArg {
    Exclude,
    Fail,
}

impl From<MissingGddArg> for MissingCovariatePolicy {
    fn from(arg: MissingGddArg) -> Self {
        match arg {
            MissingGddArg::Exclude => MissingCovariatePolicy::Exclude,
            MissingGddArg::Fail => MissingCovariatePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheArg {
    Auto,
    Refit,
    Off,
}

impl From<CacheArg> for CachePolicy {
    fn from(arg: CacheArg) -> Self {
        match arg {
            CacheArg::Auto => CachePolicy::Auto,
            CacheArg::Refit => CachePolicy::Refit,
            CacheArg::Off => CachePolicy::Off,
        }
    }
}
