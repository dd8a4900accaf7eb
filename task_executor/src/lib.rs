//! A thin handle around a tokio Runtime, shared by `worker_pool` (for
//! spawning the supervisor loop per worker) and `calc_service`/`sweep` (for
//! `spawn_blocking` the Code Generator's synchronous work off the async
//! request path).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};

/// Executors come in two flavors:
/// * "borrowed"
///     * Created with `Self::new()`, or `self.to_borrowed()`.
///     * Not shut down when all handles are dropped; `shutdown` has no effect.
///     * Used when a `#[tokio::main]`/`#[tokio::test]` runtime already exists
///       and this is just a handle into it.
/// * "owned"
///     * Created with `Self::new_owned()`.
///     * When all handles of an owned Executor are dropped, its Runtime will
///       be shut down. Used by `worker_process`, which is not itself started
///       under a tokio macro.
#[derive(Debug, Clone)]
pub struct Executor {
    runtime: Arc<Mutex<Option<Runtime>>>,
    handle: Handle,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Wraps the ambient runtime (generally provided by a `tokio` macro). The
    /// returned Executor's lifecycle is independent of that Runtime: dropping
    /// every clone will not shut it down.
    pub fn new() -> Executor {
        Self {
            runtime: Arc::new(Mutex::new(None)),
            handle: Handle::current(),
        }
    }

    /// Builds and owns a fresh multi-thread Runtime.
    pub fn new_owned(worker_threads: usize, max_blocking_threads: usize) -> Result<Executor, String> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .max_blocking_threads(max_blocking_threads)
            .enable_all()
            .build()
            .map_err(|e| format!("failed to start runtime: {e}"))?;

        let handle = runtime.handle().clone();
        Ok(Executor {
            runtime: Arc::new(Mutex::new(Some(runtime))),
            handle,
        })
    }

    /// A clone of this Executor disconnected from shutdown events.
    pub fn to_borrowed(&self) -> Executor {
        Self {
            runtime: Arc::new(Mutex::new(None)),
            handle: self.handle.clone(),
        }
    }

    /// Runs a Future as a new Task, recovering from a panicked task via
    /// `rescue_join_error` rather than propagating the `JoinError`.
    pub fn spawn<O: Send + 'static, F: Future<Output = O> + Send + 'static>(
        &self,
        future: F,
        rescue_join_error: impl FnOnce(JoinError) -> O,
    ) -> impl Future<Output = O> {
        self.handle.spawn(future).map(|res| match res {
            Ok(o) => o,
            Err(e) => rescue_join_error(e),
        })
    }

    pub fn native_spawn<O: Send + 'static, F: Future<Output = O> + Send + 'static>(
        &self,
        future: F,
    ) -> JoinHandle<O> {
        self.handle.spawn(future)
    }

    /// Blocks the calling thread until `future` resolves. Must only be called
    /// from something resembling a main method, never from within a future.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// Spawns `f` on the blocking thread pool, for synchronous work (the Code
    /// Generator, filesystem reads) that must not occupy an async worker
    /// thread.
    pub fn spawn_blocking<F: FnOnce() -> R + Send + 'static, R: Send + 'static>(
        &self,
        f: F,
        rescue_join_error: impl FnOnce(JoinError) -> R,
    ) -> impl Future<Output = R> {
        self.handle.spawn_blocking(f).map(|res| match res {
            Ok(o) => o,
            Err(e) => rescue_join_error(e),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Shuts down this Executor's owned Runtime, leaking any tasks that do
    /// not complete within `timeout`. No-op on a borrowed Executor.
    pub fn shutdown(&self, timeout: Duration) {
        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };

        let start = Instant::now();
        runtime.shutdown_timeout(timeout);
        if start.elapsed() > timeout {
            log::warn!("executor shutdown took unexpectedly long: tasks were likely leaked");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.runtime.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn borrowed_executor_spawns_and_joins() {
        let executor = Executor::new();
        let result = executor.native_spawn(async { 1 + 1 }).await.unwrap();
        assert_eq!(result, 2);
    }

    #[test]
    fn owned_executor_runs_and_shuts_down() {
        let executor = Executor::new_owned(1, 2).unwrap();
        let result = executor.block_on(async { 40 + 2 });
        assert_eq!(result, 42);
        assert!(!executor.is_shutdown());
        executor.shutdown(Duration::from_secs(1));
        assert!(executor.is_shutdown());
    }

    #[test]
    fn borrowed_clone_is_unaffected_by_shutdown() {
        let owned = Executor::new_owned(1, 1).unwrap();
        let borrowed = owned.to_borrowed();
        owned.shutdown(Duration::from_secs(1));
        assert!(!borrowed.is_shutdown());
    }
}
