use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, StreamExt};

use crate::bisect::{classic_bisect, optimized_bisect};
use crate::error::Result;

type BoxFuture = Pin<Box<dyn Future<Output = Result<i64>> + Send>>;

const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Bounded-concurrency runner for oracle probes, grounded in the
/// teacher's `modules::port_scan::PortScanModule::execute` worker-pool
/// shape but built on `buffered` rather than `buffer_unordered`: the
/// extraction engine depends on the result sequence matching enqueue
/// order (worker *i* produces byte *i*), which `buffer_unordered` does
/// not guarantee.
pub struct AsyncPool {
    limit: usize,
    fail_fast: bool,
    tasks: Vec<BoxFuture>,
}

/// Outcome of one `solve_tasks` batch: an ordered sequence of slots, each
/// either the worker's integer result or a sentinel when that worker's
/// oracle call failed (non-fail-fast mode only).
#[derive(Debug, Clone)]
pub struct PoolResult {
    slots: Vec<Option<i64>>,
}

impl PoolResult {
    pub fn values(&self) -> &[Option<i64>] {
        &self.slots
    }

    /// Treats each slot as an ASCII byte/codepoint and concatenates,
    /// substituting the Unicode replacement character for any sentinel.
    pub fn get_str_result(&self) -> String {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(byte) => char::from_u32(*byte as u32).unwrap_or(REPLACEMENT_CHAR),
                None => REPLACEMENT_CHAR,
            })
            .collect()
    }
}

impl AsyncPool {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            fail_fast: false,
            tasks: Vec::new(),
        }
    }

    /// Open Question (3): the original prints and swallows worker
    /// exceptions, leaving a sentinel slot. Set `fail_fast` to abort the
    /// whole batch with the first worker's error instead.
    pub fn set_fail_fast(&mut self, enabled: bool) {
        self.fail_fast = enabled;
    }

    /// Enqueue a single-shot oracle call whose boolean result becomes 0/1.
    pub fn add_task<F>(&mut self, oracle: F)
    where
        F: Future<Output = Result<bool>> + Send + 'static,
    {
        self.tasks.push(Box::pin(async move { Ok(oracle.await? as i64) }));
    }

    /// Enqueue a classical bisection worker over `(min, max]`.
    pub fn add_classic_bisec_task<P, Fut>(&mut self, min: i64, max: i64, oracle: P)
    where
        P: FnMut(i64) -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.tasks
            .push(Box::pin(async move {
                let mut oracle = oracle;
                classic_bisect(min, max, &mut oracle).await
            }));
    }

    /// Enqueue an optimized 3-probe bisection worker over `(min, max]`.
    pub fn add_bisec_task<P, Fut>(&mut self, min: i64, max: i64, probe: P)
    where
        P: FnMut(i64, i64, i64) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(bool, bool, bool)>> + Send + 'static,
    {
        self.tasks
            .push(Box::pin(async move {
                let mut probe = probe;
                optimized_bisect(min, max, &mut probe).await
            }));
    }

    /// Run every queued worker, at most `limit` concurrent, blocking
    /// until all complete. Returns a result ordered by enqueue position.
    pub async fn solve_tasks(&mut self) -> Result<PoolResult> {
        let tasks = std::mem::take(&mut self.tasks);
        let limit = self.limit;
        let fail_fast = self.fail_fast;

        let raw: Vec<Result<i64>> = stream::iter(tasks).buffered(limit).collect().await;

        if fail_fast {
            let mut slots = Vec::with_capacity(raw.len());
            for r in raw {
                slots.push(r?);
            }
            Ok(PoolResult {
                slots: slots.into_iter().map(Some).collect(),
            })
        } else {
            let slots = raw
                .into_iter()
                .map(|r| match r {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!(error = %e, "pool worker failed; slot degraded to sentinel");
                        None
                    }
                })
                .collect();
            Ok(PoolResult { slots })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn preserves_enqueue_order() {
        let mut pool = AsyncPool::new(3);
        for i in 0..5i64 {
            pool.add_task(async move { Ok(i % 2 == 0) });
        }
        let result = pool.solve_tasks().await.unwrap();
        assert_eq!(
            result.values(),
            &[Some(1), Some(0), Some(1), Some(0), Some(1)]
        );
    }

    #[tokio::test]
    async fn bisec_tasks_resolve_each_byte_independently() {
        let mut pool = AsyncPool::new(4);
        let targets = [72i64, 105, 33]; // 'H', 'i', '!'
        for target in targets {
            pool.add_classic_bisec_task(0, 256, move |mid| {
                async move { Ok(target < mid) }
            });
        }
        let result = pool.solve_tasks().await.unwrap();
        assert_eq!(result.values(), &[Some(72), Some(105), Some(33)]);
        assert_eq!(result.get_str_result(), "Hi!");
    }

    #[tokio::test]
    async fn optimized_bisec_tasks_preserve_order_too() {
        let mut pool = AsyncPool::new(4);
        for target in [1i64, 2, 3] {
            pool.add_bisec_task(0, 4, move |mid_l, mid, mid_r| async move {
                Ok((target < mid_l, target < mid, target < mid_r))
            });
        }
        let result = pool.solve_tasks().await.unwrap();
        assert_eq!(result.values(), &[Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn failed_worker_degrades_to_sentinel_by_default() {
        let mut pool = AsyncPool::new(2);
        pool.add_task(async { Ok(true) });
        pool.add_task(async { Err(crate::error::SqliError::TransportFailure("boom".into())) });
        pool.add_task(async { Ok(false) });
        let result = pool.solve_tasks().await.unwrap();
        assert_eq!(result.values(), &[Some(1), None, Some(0)]);
    }

    #[tokio::test]
    async fn fail_fast_aborts_batch_on_first_error() {
        let mut pool = AsyncPool::new(2);
        pool.set_fail_fast(true);
        pool.add_task(async { Ok(true) });
        pool.add_task(async { Err(crate::error::SqliError::TransportFailure("boom".into())) });
        let result = pool.solve_tasks().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_configured_limit() {
        let in_flight = Arc::new(AtomicI64::new(0));
        let max_seen = Arc::new(AtomicI64::new(0));
        let mut pool = AsyncPool::new(2);
        for _ in 0..6 {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            pool.add_task(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(true)
            });
        }
        pool.solve_tasks().await.unwrap();
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
