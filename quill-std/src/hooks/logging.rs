//! Logging hook for dispatch observation.

use quill_core::{Fault, Hook, HookResult, OperationMetadata, RequestContext};

/// A hook that logs every resolved operation at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl Hook for LoggingHook {
    async fn on_dispatch(
        &self,
        operation: &OperationMetadata,
        ctx: &RequestContext,
    ) -> Result<HookResult, Fault> {
        tracing::debug!(
            operation = operation.name(),
            action = operation.action(),
            kind = ?operation.kind(),
            principal = ctx.principal().map(|p| p.subject()),
            "dispatching operation"
        );
        Ok(HookResult::Next)
    }
}
