//! Transport engine owned by one client.
//!
//! Every client owns its own tokio runtime instead of borrowing a
//! process-wide one. The reader and writer tasks run on it, and blocking
//! calls park the caller's thread in [`Engine::block_on`] until the response
//! future completes. Dropping the engine releases the runtime exactly once,
//! including when client construction fails halfway.

use std::future::Future;

use tokio::runtime::{Builder, EnterGuard, Runtime};
use tokio::task::JoinHandle;

use crate::error::{ChronologError, Result};

/// Default number of runtime worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 1;

/// Owned tokio runtime driving one client's transport.
pub struct Engine {
    runtime: Option<Runtime>,
}

impl Engine {
    /// Start a multi-threaded runtime with `worker_threads` workers.
    pub fn start(worker_threads: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("chronolog-engine")
            .enable_all()
            .build()
            .map_err(|e| ChronologError::Transport(format!("cannot start engine: {}", e)))?;

        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Run `future` to completion, blocking the calling thread.
    ///
    /// Several threads may block on the same engine at once.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous execution context,
    /// like `tokio::runtime::Runtime::block_on`. Async callers should await
    /// [`CallDispatcher::call`](crate::dispatcher::CallDispatcher::call) instead.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime().block_on(future)
    }

    /// Spawn a background task on the engine.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime().spawn(future)
    }

    /// Enter the engine's runtime context on the current thread.
    ///
    /// Needed to spawn tasks from synchronous code with `tokio::spawn`.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime().enter()
    }

    fn runtime(&self) -> &Runtime {
        // Only `Drop` takes the runtime out.
        match &self.runtime {
            Some(runtime) => runtime,
            None => unreachable!("engine used after shutdown"),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Never blocks, so it is safe even when the last client handle
            // is dropped inside another runtime.
            runtime.shutdown_background();
            tracing::debug!("Engine shut down");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("running", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_block_on_runs_future() {
        let engine = Engine::start(1).unwrap();
        let value = engine.block_on(async { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_spawned_task_completes() {
        let engine = Engine::start(2).unwrap();
        let handle = engine.spawn(async { "done" });
        assert_eq!(engine.block_on(handle).unwrap(), "done");
    }

    #[test]
    fn test_concurrent_block_on() {
        let engine = Arc::new(Engine::start(1).unwrap());

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    engine.block_on(async move {
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        i
                    })
                })
            })
            .collect();

        let mut results: Vec<i32> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        results.sort();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_drop_inside_async_context() {
        let engine = Engine::start(1).unwrap();
        drop(engine);
    }
}
