//! # Request Context
//!
//! Per-call state handed to hooks and handlers: the caller's cancellation
//! signal and, when the transport authenticated the caller, their
//! [`Principal`].
//!
//! Contexts are cheap to clone. Handlers should pass the context (or its
//! [`CancellationToken`]) on to any downstream I/O so that a cancelled call
//! stops consuming resources promptly.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: String,
    roles: Vec<String>,
}

impl Principal {
    /// A caller identified by `subject` with no roles.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Vec::new(),
        }
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// The caller's identifier (user id, email, ...).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether the caller holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Per-call context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancellation: CancellationToken,
    principal: Option<Arc<Principal>>,
}

impl RequestContext {
    /// An anonymous context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the caller's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attach the authenticated caller.
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(Arc::new(principal));
        self
    }

    /// The caller's cancellation signal.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the caller has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The authenticated caller, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_deref()
    }

    /// Whether a principal is attached.
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
