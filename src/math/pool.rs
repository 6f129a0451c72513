#[cfg(feature = "mt")]
use crate::error::AnalysisError;
use crate::error::AnalysisResult;

/// Runs `f` on a rayon pool with `threads` workers (0 = rayon default).
#[cfg(feature = "mt")]
pub fn install<R, F>(threads: usize, f: F) -> AnalysisResult<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| AnalysisError::InvalidConfig(format!("failed to build thread pool: {}", e)))?;
    Ok(pool.install(f))
}

#[cfg(not(feature = "mt"))]
pub fn install<R, F>(threads: usize, f: F) -> AnalysisResult<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let _ = threads;
    Ok(f())
}
