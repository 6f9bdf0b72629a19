//! Immutable per-run execution context.
//!
//! The context is constructed once at startup from CLI options and passed by
//! reference to every adapter call. It is never mutated mid-run; the only
//! runtime signal it carries is the cancellation flag, which is set from the
//! SIGINT handler and only ever transitions false → true.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::exec::Executor;
use crate::logging::Log;

/// Shared context for one convergence run.
pub struct RunContext {
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Logger for engine and adapter output.
    pub log: Arc<dyn Log>,
    /// Whether to preview changes without applying them.
    pub dry_run: bool,
    /// Retry policy applied to every unit's apply step.
    pub retry: RetryPolicy,
    /// Maximum number of units applied concurrently (1 = sequential).
    pub concurrency: usize,
    /// Sleep implementation used for retry backoff (injectable for tests).
    pub sleeper: Arc<dyn Sleeper>,
    /// Set once by the SIGINT handler; checked before each unit starts.
    cancelled: Arc<AtomicBool>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("executor", &"<dyn Executor>")
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .field("sleeper", &"<dyn Sleeper>")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl RunContext {
    /// Create a context with the production sleeper and a fresh cancellation
    /// flag.
    #[must_use]
    pub fn new(
        executor: Arc<dyn Executor>,
        log: Arc<dyn Log>,
        dry_run: bool,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            executor,
            log,
            dry_run,
            retry,
            concurrency: concurrency.max(1),
            sleeper: Arc::new(ThreadSleeper),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clone of the cancellation flag, for wiring into a signal handler.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
