use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

}

/// Controls how data-parallel operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool.
    #[default]
    Parallel,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small inputs, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Run `serial` or `parallel` on `input` according to the strategy.
    ///
    /// `parallel` is expected to use Rayon parallel iterators; for
    /// [`ExecutionStrategy::Fixed`] it runs inside a dedicated pool so those
    /// iterators are bound to `n` threads.
    pub fn run<I, R, S, P>(self, input: I, serial: S, parallel: P) -> Result<R, ParallelError>
    where
        I: Send,
        R: Send,
        S: FnOnce(I) -> R,
        P: FnOnce(I) -> R + Send,
    {
        match self {
            ExecutionStrategy::Serial => Ok(serial(input)),
            ExecutionStrategy::Parallel => Ok(parallel(input)),
            ExecutionStrategy::Fixed(n) => {
                if n == 0 {
                    return Err(ParallelError::InvalidThreadCount(n));
                }
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ParallelError::BuildError(e.to_string()))?;
                Ok(pool.install(move || parallel(input)))
            }
        }
    }
}

/// Fill `dst` with `op(index)` for every element, following the strategy.
pub fn fill_indexed<T, F>(
    strategy: ExecutionStrategy,
    dst: &mut [T],
    op: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let op = &op;
    strategy.run(
        dst,
        |dst| {
            dst.iter_mut()
                .enumerate()
                .for_each(|(idx, out)| *out = op(idx))
        },
        |dst| {
            dst.par_iter_mut()
                .enumerate()
                .for_each(|(idx, out)| *out = op(idx))
        },
    )
}
