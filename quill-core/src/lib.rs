//! # quill-core
//!
//! Core traits for the Quill operation dispatch engine.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! feature crates that declare operations and handlers without pulling in the
//! full `quill-std` dispatcher.
//!
//! # Dispatch Pipeline
//!
//! Every call moves through the same stages, each owned by one abstraction:
//!
//! ## Stage 1: Description ([`Operation`], [`OperationMetadata`])
//!
//! A request type describes itself: its declared name, optional kind marker,
//! optional external action, authentication marker and structural
//! [`Shape`]. Discovery turns the description into immutable
//! [`OperationMetadata`].
//!
//! ## Stage 2: Gatekeeping ([`Hook`])
//!
//! Hooks run once the operation is resolved and before any payload is decoded.
//! They decide whether the call may proceed (`Next`), is rejected (`Stop`), or
//! fails with a [`Fault`] (authentication, for example).
//!
//! ## Stage 3: Validation ([`Validator`])
//!
//! Optional per request type. Every violated rule is reported, never just the
//! first one.
//!
//! ## Stage 4: Invocation ([`Handler`])
//!
//! The terminal point where business logic runs. Handlers are strongly typed;
//! [`ErasedHandler`] is their type-erased form stored in dispatch tables.
//!
//! ## Stage 5: Enveloping ([`Envelope`])
//!
//! Every outcome, success or failure, becomes one uniform envelope.
//!
//! # Error Types
//!
//! - [`Fault`] - Failures raised while a dispatch is in flight
//! - [`DescribeError`] - Registrations that cannot produce valid metadata

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod envelope;
mod error;
mod handler;
mod hook;
mod metadata;
mod operation;
mod request;
mod validator;

// Re-exports
pub use context::{Principal, RequestContext};
pub use envelope::{Envelope, status};
pub use error::{BoxError, DescribeError, Fault};
pub use handler::{
    BoxFuture, ErasedHandler, ErasedHandlerWrapper, Handler, HandlerDescriptor, HandlerProvider,
};
pub use hook::{DynHook, Hook, HookResult};
pub use metadata::{HandlerId, OperationMetadata};
pub use operation::{
    DecodeFn, ErasedRequest, FieldShape, Operation, OperationDescriptor, OperationKind, Shape,
    is_valid_action,
};
pub use request::{DispatchRequest, normalize_payload};
pub use validator::{ErasedValidator, ErasedValidatorWrapper, Rules, Validator, Violation};
