//! The two worker pools used by the prover.
//!
//! [`PoolLevel::Low`] runs fine-grained data-parallel kernels (FFT
//! butterflies, element-wise polynomial arithmetic, Merkle leaf hashing),
//! [`PoolLevel::High`] runs coarse tasks such as whole-polynomial operations
//! or per-query proof construction. Work running on one pool may hand work to
//! the other one; work handed to the pool it already runs on is executed
//! inline.

use once_cell::sync::Lazy;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Vectors shorter than this are processed sequentially.
pub(crate) const PARALLEL_THRESHOLD: usize = 1 << 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolLevel {
    Low,
    High,
}

fn build(name: &'static str) -> ThreadPool {
    let threads = std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1);
    log::debug!("starting {name} pool with {threads} threads");
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
        .expect("failed to start worker pool")
}

static LOW: Lazy<ThreadPool> = Lazy::new(|| build("low"));
static HIGH: Lazy<ThreadPool> = Lazy::new(|| build("high"));

impl PoolLevel {
    pub fn pool(self) -> &'static ThreadPool {
        match self {
            PoolLevel::Low => &LOW,
            PoolLevel::High => &HIGH,
        }
    }

    /// Runs `op` on this pool and waits for it.
    pub fn install<R, OP>(self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        let pool = self.pool();
        if pool.current_thread_index().is_some() {
            op()
        } else {
            pool.install(op)
        }
    }
}

/// Calls `f(i)` for every `i` in `range` on the given pool.
pub fn parallel_for<F>(level: PoolLevel, range: std::ops::Range<usize>, f: F)
where
    F: Fn(usize) + Send + Sync,
{
    use rayon::prelude::*;
    level.install(|| range.into_par_iter().for_each(f));
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_parallel_for_visits_every_index() {
        let sum = AtomicUsize::new(0);
        parallel_for(PoolLevel::High, 0..1000, |i| {
            sum.fetch_add(i, Ordering::Relaxed);
        });
        assert_eq!(sum.into_inner(), 999 * 1000 / 2);
    }

    #[test]
    fn test_cross_pool_submission() {
        let inner = PoolLevel::High.install(|| {
            assert!(PoolLevel::High.pool().current_thread_index().is_some());
            PoolLevel::Low.install(|| PoolLevel::Low.pool().current_thread_index().is_some())
        });
        assert!(inner);
        // Re-entering the same pool runs inline.
        assert_eq!(PoolLevel::Low.install(|| PoolLevel::Low.install(|| 7)), 7);
    }
}
