//! Testing utilities for Quill.
//!
//! Handlers and hooks with observable behavior, for exercising a dispatcher
//! without real business code.
//!
//! - [`RecordingHandler`]: answers with a fixed response and counts calls
//! - [`FailingHandler`]: always fails with an internal fault
//! - [`PanickingHandler`]: always panics
//! - [`PendingHandler`]: waits until the call is cancelled
//! - [`RecordingHook`]: records every operation it sees

use quill_core::{
    Fault, Handler, Hook, HookResult, Operation, OperationMetadata, RequestContext,
};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;

// ============================================================================
// Handlers
// ============================================================================

/// A handler that returns a clone of a fixed response and counts its calls.
///
/// Clones share the counter.
///
/// # Example
///
/// ```rust,ignore
/// let handler = RecordingHandler::new(vec!["first post".to_string()]);
/// let calls = handler.clone();
///
/// let dispatcher = Dispatcher::builder()
///     .operation::<GetBlogPostsQuery>()
///     .handler::<GetBlogPostsQuery, _>(handler)
///     .build();
///
/// dispatcher.dispatch("getblogposts", json!({"page": 1}), ctx).await;
/// assert_eq!(calls.calls(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingHandler<R> {
    response: R,
    calls: Arc<AtomicUsize>,
}

impl<R> RecordingHandler<R> {
    /// Create a handler answering with `response`.
    pub fn new(response: R) -> Self {
        Self {
            response,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of completed calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<Op, R> Handler<Op> for RecordingHandler<R>
where
    Op: Operation<Response = R>,
    R: Clone + Send + Sync + 'static,
{
    async fn handle(&self, _request: Op, _ctx: RequestContext) -> Result<R, Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// A handler that always fails with [`Fault::Internal`].
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Fail with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<Op: Operation> Handler<Op> for FailingHandler {
    async fn handle(&self, _request: Op, _ctx: RequestContext) -> Result<Op::Response, Fault> {
        Err(Fault::internal(self.message.clone()))
    }
}

/// A handler that always panics.
#[derive(Debug, Clone)]
pub struct PanickingHandler {
    message: String,
}

impl PanickingHandler {
    /// Panic with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<Op: Operation> Handler<Op> for PanickingHandler {
    async fn handle(&self, _request: Op, _ctx: RequestContext) -> Result<Op::Response, Fault> {
        panic!("{}", self.message)
    }
}

/// A handler that never finishes on its own: it waits for the caller's
/// cancellation signal.
///
/// [`started`](Self::started) resolves once a call is in flight, so a test can
/// cancel at the right moment.
#[derive(Debug, Clone, Default)]
pub struct PendingHandler {
    started: Arc<Notify>,
    released: Arc<AtomicUsize>,
}

impl PendingHandler {
    /// Create a pending handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a call has started.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Number of calls that observed their cancellation.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl<Op: Operation> Handler<Op> for PendingHandler {
    async fn handle(&self, _request: Op, ctx: RequestContext) -> Result<Op::Response, Fault> {
        self.started.notify_one();
        ctx.cancellation().cancelled().await;
        self.released.fetch_add(1, Ordering::SeqCst);
        Err(Fault::Cancelled)
    }
}

// ============================================================================
// Recording Hook
// ============================================================================

/// A hook that records the name of every operation it sees.
///
/// Clones share the record.
#[derive(Debug, Clone)]
pub struct RecordingHook {
    operations: Arc<Mutex<Vec<String>>>,
    result: HookResult,
}

impl Default for RecordingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHook {
    /// Create a new recording hook that returns `Next`.
    pub fn new() -> Self {
        Self::with_result(HookResult::Next)
    }

    /// Create a recording hook that returns a specific result.
    pub fn with_result(result: HookResult) -> Self {
        Self {
            operations: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    /// Names of the operations seen so far, in order.
    pub fn operations(&self) -> Vec<String> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the number of recorded operations.
    pub fn count(&self) -> usize {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Hook for RecordingHook {
    async fn on_dispatch(
        &self,
        operation: &OperationMetadata,
        _ctx: &RequestContext,
    ) -> Result<HookResult, Fault> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation.name().to_string());
        Ok(self.result)
    }
}
