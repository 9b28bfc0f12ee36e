use crate::error::Result;
use rayon::ThreadPool;
use std::sync::Arc;

/// Thread pool used to compute fragment closures in parallel
#[derive(Clone)]
pub struct PartitionPool {
    pool: Arc<ThreadPool>,
}

impl PartitionPool {
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|i| format!("wiregraph-partition-{i}"))
            .build()?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// One thread per logical CPU.
    pub fn with_default_threads() -> Result<Self> {
        Self::new(num_cpus::get())
    }

    /// Run `f` inside the pool so rayon parallel iterators use its threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(f)
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_install_runs_parallel_work() {
        let pool = PartitionPool::new(2).unwrap();
        assert_eq!(pool.num_threads(), 2);
        let sum: u64 = pool.install(|| (1..=100u64).into_par_iter().sum());
        assert_eq!(sum, 5050);
    }

    #[test]
    fn test_zero_threads_is_clamped() {
        let pool = PartitionPool::new(0).unwrap();
        assert_eq!(pool.num_threads(), 1);
    }
}
