//! Sizing of the rayon pool the array kernels run on
//!
//! Every kernel (unit conversion, condition masks, per-year counts, the mean
//! over years) uses rayon's global pool, so it is configured once, before the
//! first field is read.

use crate::errors::{HazardError, Result};
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

/// Requested pool size; `None` keeps rayon's default of one thread per core
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

/// The pool a run ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    pub threads: usize,
    pub available_cores: usize,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Configure the global pool and report its size.
    ///
    /// Asking for more threads than there are cores is allowed but logged,
    /// since the kernels are compute-bound.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::ThreadPoolError`] for a zero thread count or if
    /// the global pool was already initialized.
    pub fn setup_global_pool(&self) -> Result<PoolInfo> {
        let available_cores = num_cpus::get();

        if let Some(num_threads) = self.num_threads {
            if num_threads == 0 {
                return Err(HazardError::ThreadPoolError(
                    "thread count must be at least 1".to_string(),
                ));
            }
            if num_threads > available_cores {
                warn!(
                    requested = num_threads,
                    available_cores, "more threads requested than CPU cores"
                );
            }
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    HazardError::ThreadPoolError(format!(
                        "Failed to initialize thread pool with {} threads: {}",
                        num_threads, e
                    ))
                })?;
        }

        let pool = PoolInfo {
            threads: rayon::current_num_threads(),
            available_cores,
        };
        info!(
            threads = pool.threads,
            available_cores = pool.available_cores,
            "thread pool ready"
        );
        Ok(pool)
    }
}
