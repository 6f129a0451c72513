use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no GDD entry for day '{day}' (tree '{tree}')")]
    MissingCovariate { tree: String, day: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{source_name}:{line} {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("draw cache {path} is corrupt: {reason}")]
    CacheCorrupt { path: String, reason: String },
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
