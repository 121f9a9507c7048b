//! Parallel execution strategy
//!
//! Resource management only: how many workers the machine and the settings
//! allow, and whether a workload is large enough to be worth spreading over
//! them. Callers decide what the work items are.
//!
//! ```rust
//! use reportwright::parallel::ExecutionStrategy;
//!
//! let workers = ExecutionStrategy::calculate_optimal_workers(0, 75);
//! let strategy = ExecutionStrategy::auto(3, 8, workers);
//! assert!(matches!(strategy, ExecutionStrategy::Sequential));
//!
//! let doubled = strategy.execute(&[1, 2, 3], |n| n * 2);
//! assert_eq!(doubled, vec![2, 4, 6]);
//! ```

use rayon::prelude::*;

use crate::config::ParallelSettings;

/// Sequential or parallel execution over a fixed worker count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    /// Parallel when there are at least `min_items_for_parallel` items and more than one worker
    pub fn auto(work_items_count: usize, min_items_for_parallel: usize, optimal_workers: usize) -> Self {
        if work_items_count >= min_items_for_parallel.max(1) && optimal_workers > 1 {
            ExecutionStrategy::Parallel {
                workers: optimal_workers.min(work_items_count),
            }
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// Strategy for `work_items_count` items under the engine's parallel settings
    pub fn for_settings(work_items_count: usize, settings: &ParallelSettings) -> Self {
        let workers = Self::calculate_optimal_workers(settings.max_threads, settings.thread_percentage);
        Self::auto(work_items_count, settings.min_items_for_parallel, workers)
    }

    /// Workers allowed by the CPU count, a percentage of it and an optional hard cap (0 = none)
    pub fn calculate_optimal_workers(max_threads_config: usize, thread_percentage: u8) -> usize {
        let available_cores = num_cpus::get();
        let by_percentage = (available_cores * thread_percentage.min(100) as usize / 100).max(1);

        if max_threads_config > 0 {
            by_percentage.min(max_threads_config)
        } else {
            by_percentage
        }
    }

    /// Apply `processor` to every item; results keep the input order
    pub fn execute<T, R, F>(&self, work_items: &[T], processor: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        match self {
            ExecutionStrategy::Sequential => work_items.iter().map(processor).collect(),
            ExecutionStrategy::Parallel { workers } => {
                match rayon::ThreadPoolBuilder::new().num_threads(*workers).build() {
                    Ok(pool) => {
                        tracing::debug!("Processing {} item(s) on {} worker(s)", work_items.len(), workers);
                        pool.install(|| work_items.par_iter().map(processor).collect())
                    }
                    Err(e) => {
                        tracing::warn!("Failed to start worker pool ({}), running sequentially", e);
                        work_items.iter().map(processor).collect()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_threshold() {
        assert_eq!(ExecutionStrategy::auto(3, 8, 4), ExecutionStrategy::Sequential);
        assert_eq!(ExecutionStrategy::auto(10, 8, 4), ExecutionStrategy::Parallel { workers: 4 });
        assert_eq!(ExecutionStrategy::auto(10, 8, 1), ExecutionStrategy::Sequential);
        assert_eq!(ExecutionStrategy::auto(2, 0, 4), ExecutionStrategy::Parallel { workers: 2 });
    }

    #[test]
    fn test_calculate_optimal_workers() {
        assert!(ExecutionStrategy::calculate_optimal_workers(0, 75) >= 1);
        assert!(ExecutionStrategy::calculate_optimal_workers(2, 100) <= 2);
        assert_eq!(ExecutionStrategy::calculate_optimal_workers(0, 0), 1);
    }

    #[test]
    fn test_parallel_preserves_order() {
        let items: Vec<usize> = (0..200).collect();
        let results = ExecutionStrategy::Parallel { workers: 4 }.execute(&items, |n| n * n);
        assert_eq!(results, items.iter().map(|n| n * n).collect::<Vec<_>>());
    }
}
