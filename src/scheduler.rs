use rayon::prelude::*;

use crate::foundation::error::{RaytileError, RaytileResult};

/// Per-item work of a parallel-for.
///
/// Items are independent; they may run in any order and concurrently.
pub trait ParallelTask: Sync {
    /// Execute item `item`.
    fn run(&self, item: usize) -> RaytileResult<()>;
}

/// Thread-pool abstraction used by the load balancers.
///
/// `parallel_for` returns only after every dispatched item finished (a join barrier). Once an
/// item fails, implementations stop handing out new items and return an error.
pub trait TaskScheduler: Send + Sync {
    /// Run `task` for every item in `0..count`.
    fn parallel_for(&self, count: usize, task: &dyn ParallelTask) -> RaytileResult<()>;

    /// Worker threads available to `parallel_for`.
    fn num_threads(&self) -> usize;
}

/// Scheduler backed by a dedicated rayon thread pool.
pub struct RayonScheduler {
    pool: rayon::ThreadPool,
}

impl RayonScheduler {
    /// Build a pool with `threads` workers, or rayon's default when `None`.
    pub fn new(threads: Option<usize>) -> RaytileResult<Self> {
        Ok(Self {
            pool: build_thread_pool(threads)?,
        })
    }
}

impl std::fmt::Debug for RayonScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonScheduler")
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl TaskScheduler for RayonScheduler {
    fn parallel_for(&self, count: usize, task: &dyn ParallelTask) -> RaytileResult<()> {
        self.pool
            .install(|| (0..count).into_par_iter().try_for_each(|i| task.run(i)))
    }

    fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// Runs items in index order on the calling thread. Stops at the first failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialScheduler;

impl TaskScheduler for SerialScheduler {
    fn parallel_for(&self, count: usize, task: &dyn ParallelTask) -> RaytileResult<()> {
        (0..count).try_for_each(|i| task.run(i))
    }

    fn num_threads(&self) -> usize {
        1
    }
}

fn build_thread_pool(threads: Option<usize>) -> RaytileResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(RaytileError::validation(
            "scheduler 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("raytile-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| RaytileError::scheduler(format!("failed to build rayon thread pool: {e}")))
}
