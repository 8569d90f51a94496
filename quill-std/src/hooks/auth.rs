//! Authentication and authorization gates.

use quill_core::{Fault, Hook, HookResult, OperationMetadata, RequestContext};
use std::collections::HashSet;

/// Rejects anonymous calls to operations that require authentication.
///
/// Installed first by the dispatcher builder, so the check happens before
/// any payload is decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationHook;

impl Hook for AuthenticationHook {
    async fn on_dispatch(
        &self,
        operation: &OperationMetadata,
        ctx: &RequestContext,
    ) -> Result<HookResult, Fault> {
        if operation.requires_authentication() && !ctx.is_authenticated() {
            return Err(Fault::unauthorized(format!(
                "operation '{}' requires authentication",
                operation.action()
            )));
        }
        Ok(HookResult::Next)
    }
}

/// Requires a role for a set of actions.
///
/// Anonymous callers get a 401; authenticated callers without the role get a
/// 403.
#[derive(Debug, Clone)]
pub struct RoleHook {
    role: String,
    actions: HashSet<String>,
}

impl RoleHook {
    /// Require `role` for `actions`.
    pub fn new<I, S>(role: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            role: role.into(),
            actions: actions
                .into_iter()
                .map(|a| a.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Hook for RoleHook {
    async fn on_dispatch(
        &self,
        operation: &OperationMetadata,
        ctx: &RequestContext,
    ) -> Result<HookResult, Fault> {
        if !self.actions.contains(operation.action()) {
            return Ok(HookResult::Next);
        }
        match ctx.principal() {
            None => Err(Fault::unauthorized(format!(
                "operation '{}' requires authentication",
                operation.action()
            ))),
            Some(principal) if principal.has_role(&self.role) => Ok(HookResult::Next),
            Some(principal) => Err(Fault::forbidden(format!(
                "'{}' lacks role '{}'",
                principal.subject(),
                self.role
            ))),
        }
    }
}
