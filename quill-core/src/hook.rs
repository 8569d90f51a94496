//! # Gatekeeping Layer (Hook)
//!
//! Hooks run after an operation has been resolved and before its payload is
//! decoded. They see the operation's metadata and the request context, never
//! the payload itself.
//!
//! # Use Cases
//!
//! - Authentication and authorization gates
//! - Observing dispatches (logging, metrics, tracing)
//! - Rejecting operations by policy (maintenance mode, feature flags)
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Hook`] uses native `async fn`. The dispatcher stores hooks as
//! [`DynHook`] trait objects; every `Hook` is a `DynHook` automatically.

use crate::{context::RequestContext, error::Fault, handler::BoxFuture, metadata::OperationMetadata};
use std::future::Future;

/// Result of hook execution indicating whether the dispatch may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// Continue to the next hook, and eventually the handler.
    Next,
    /// Reject the call. The dispatcher answers with a 403 envelope.
    Stop,
}

/// A gate evaluated before every dispatch.
///
/// Return `Err` to fail the call with a specific [`Fault`] (a missing
/// principal becomes a 401, for instance); return [`HookResult::Stop`] for a
/// generic rejection.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Hook`",
    label = "missing `Hook` implementation",
    note = "Hooks must implement `on_dispatch`."
)]
pub trait Hook: Send + Sync + 'static {
    /// Called once the operation is resolved.
    fn on_dispatch(
        &self,
        operation: &OperationMetadata,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<HookResult, Fault>> + Send;
}

/// Dynamic object-safe version of [`Hook`].
pub trait DynHook: Send + Sync + 'static {
    /// Called once the operation is resolved (dynamic dispatch version).
    fn on_dispatch_dyn<'a>(
        &'a self,
        operation: &'a OperationMetadata,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<HookResult, Fault>>;
}

impl<T: Hook> DynHook for T {
    fn on_dispatch_dyn<'a>(
        &'a self,
        operation: &'a OperationMetadata,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<HookResult, Fault>> {
        Box::pin(self.on_dispatch(operation, ctx))
    }
}
