//! # quill - Generic Operation Dispatch
//!
//! `quill` exposes every command and query of an application through one
//! generic entry point. Callers name an operation by action (`"login"`,
//! `"getbyauthor"`) and hand over a structured payload; the dispatcher finds
//! the operation, decodes and validates the payload, invokes the handler
//! through a type-erased path, and answers with a uniform [`Envelope`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quill::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Operation)]
//! #[operation(response = LoginResponse)]
//! struct LoginCommand { email: String, password: String }
//!
//! #[derive(Serialize)]
//! struct LoginResponse { token: String }
//!
//! #[quill::handler]
//! async fn login(cmd: LoginCommand) -> Result<LoginResponse, Fault> {
//!     Ok(LoginResponse { token: issue_token(&cmd.email) })
//! }
//!
//! let dispatcher = Dispatcher::builder().collected().build();
//! let envelope = dispatcher
//!     .dispatch("login", json!({"email": "a@b.com", "password": "secret1"}), RequestContext::new())
//!     .await;
//! assert_eq!(envelope.status_code(), 200);
//! ```
//!
//! ## Explicit Registration
//!
//! Handlers that hold services are registered with their instance:
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder()
//!     .collected()
//!     .handler::<CreatePostCommand, _>(CreatePostHandler::new(posts))
//!     .build();
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use quill_core::{
    // Errors
    BoxError,
    DescribeError,
    // Wire
    DispatchRequest,
    // Hook
    DynHook,
    Envelope,
    // Handler
    ErasedHandler,
    ErasedHandlerWrapper,
    ErasedValidator,
    Fault,
    // Operation description
    FieldShape,
    Handler,
    HandlerDescriptor,
    HandlerId,
    HandlerProvider,
    Hook,
    HookResult,
    Operation,
    OperationDescriptor,
    OperationKind,
    OperationMetadata,
    // Context
    Principal,
    RequestContext,
    // Validation
    Rules,
    Shape,
    Validator,
    Violation,
    status,
};

pub use quill_std::{
    ActionResolver, Ambiguity, ConfigError, DispatchConfig, Dispatcher, DispatcherBuilder,
    RegisteredOperation, Registry, RegistryBuilder, RegistryError, ServiceContainer,
    SharedRegistry, SkippedOperation,
};

#[cfg(feature = "macros")]
pub use quill_macros::{Operation, handler, validator};

#[doc(hidden)]
pub use inventory;

/// Link-time registrations, for types implementing the traits by hand.
pub mod discovery {
    pub use quill_std::discovery::{
        HandlerRegistration, OperationRegistration, ValidatorRegistration, collect_handlers,
        collect_operations, collect_validators,
    };
}

/// Standard hook implementations.
pub mod hooks {
    pub use quill_std::hooks::{AuthenticationHook, LoggingHook, RoleHook};
}

/// Testing utilities.
pub mod testing {
    pub use quill_std::testing::{
        FailingHandler, PanickingHandler, PendingHandler, RecordingHandler, RecordingHook,
    };
}

/// Prelude module - common imports for Quill.
///
/// # Usage
///
/// ```rust,ignore
/// use quill::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        DispatchConfig, Dispatcher, Envelope, Fault, Handler, Hook, HookResult, Operation,
        RequestContext, Rules, Validator, Violation,
    };
}
