//! # Invocation Layer (Handler)
//!
//! Handlers are the terminal point of a dispatch: they receive a decoded,
//! validated request and perform the business logic.
//!
//! # Usage Patterns
//!
//! 1. **Attribute macro**: `#[quill::handler] async fn login(cmd: LoginCommand) -> ...`
//! 2. **Struct implementation**: `impl Handler<LoginCommand> for LoginHandler`
//!    (the usual choice for handlers holding repositories or services)
//! 3. **Direct closure**: `|cmd: LoginCommand, ctx| async move { ... }`
//!
//! # Type Erasure
//!
//! The dispatcher never names request or response types. [`ErasedHandler`]
//! is the object-safe form stored in dispatch tables, and
//! [`ErasedHandlerWrapper`] bridges a typed handler into it: requests arrive
//! as [`ErasedRequest`]s and responses leave as structured JSON values.

use crate::{
    context::RequestContext,
    error::Fault,
    metadata::HandlerId,
    operation::{ErasedRequest, Operation},
};
use serde_json::Value;
use std::{any::TypeId, future::Future, marker::PhantomData, pin::Pin, sync::Arc};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes one operation.
///
/// The context carries the caller's cancellation token; pass it on to
/// downstream I/O.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle operation `{Op}`",
    label = "missing `Handler<{Op}>` implementation",
    note = "Handlers must implement `handle` for the operation type `{Op}`."
)]
pub trait Handler<Op: Operation>: Send + Sync + 'static {
    /// Executes the handler logic.
    fn handle(
        &self,
        request: Op,
        ctx: RequestContext,
    ) -> impl Future<Output = Result<Op::Response, Fault>> + Send;
}

// Blanket impl for closures
impl<F, Op, Fut> Handler<Op> for F
where
    Op: Operation,
    F: Fn(Op, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Op::Response, Fault>> + Send,
{
    fn handle(
        &self,
        request: Op,
        ctx: RequestContext,
    ) -> impl Future<Output = Result<Op::Response, Fault>> + Send {
        (self)(request, ctx)
    }
}

/// Object-safe, type-erased handler.
pub trait ErasedHandler: Send + Sync + 'static {
    /// The identity this handler is registered under.
    fn identity(&self) -> HandlerId;

    /// Execute the handler with a type-erased request.
    ///
    /// The request is downcast to the concrete operation type internally; the
    /// response is serialized to a structured value.
    fn call_erased(
        &self,
        request: ErasedRequest,
        ctx: RequestContext,
    ) -> BoxFuture<'_, Result<Value, Fault>>;
}

/// Wrapper to implement [`ErasedHandler`] for a typed handler.
pub struct ErasedHandlerWrapper<Op, H> {
    handler: H,
    _phantom: PhantomData<fn(Op)>,
}

impl<Op, H> ErasedHandlerWrapper<Op, H> {
    /// Create a new wrapper around a typed handler.
    pub const fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.handler
    }
}

impl<Op, H> ErasedHandler for ErasedHandlerWrapper<Op, H>
where
    Op: Operation,
    H: Handler<Op>,
{
    fn identity(&self) -> HandlerId {
        HandlerId::of::<Op, H>()
    }

    fn call_erased(
        &self,
        request: ErasedRequest,
        ctx: RequestContext,
    ) -> BoxFuture<'_, Result<Value, Fault>> {
        Box::pin(async move {
            let request = request.downcast::<Op>().map_err(|_| {
                Fault::internal(format!(
                    "handler '{}' received a request that is not '{}'",
                    std::any::type_name::<H>(),
                    Op::NAME
                ))
            })?;
            let response = self.handler.handle(*request, ctx).await?;
            serde_json::to_value(response).map_err(Fault::internal)
        })
    }
}

/// Declares that handler type `H` serves one (request, response) pair.
///
/// The identity is specific to the pair, so a handler type serving several
/// operations declares (and is instantiated) once per operation.
///
/// Discovery pairs operations with handlers through these declarations; the
/// live instance is looked up later through a [`HandlerProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerDescriptor {
    /// The handler's identity.
    pub identity: HandlerId,
    /// Name of the operation it declares to serve.
    pub operation: &'static str,
    /// Identity of the request type it accepts.
    pub request_type: TypeId,
    /// Identity of the response type it produces.
    pub response_type: TypeId,
}

impl HandlerDescriptor {
    /// Describe handler `H` for operation `Op`.
    pub fn of<Op, H>() -> Self
    where
        Op: Operation,
        H: Handler<Op>,
    {
        Self {
            identity: HandlerId::of::<Op, H>(),
            operation: Op::NAME,
            request_type: TypeId::of::<Op>(),
            response_type: TypeId::of::<Op::Response>(),
        }
    }

    /// Whether this handler serves exactly the given pair.
    pub fn serves(&self, request_type: TypeId, response_type: TypeId) -> bool {
        self.request_type == request_type && self.response_type == response_type
    }
}

/// The dependency-lookup collaborator: resolves handler identities into live
/// handler instances.
pub trait HandlerProvider: Send + Sync {
    /// Resolve a live handler, or `None` if the provider cannot produce one.
    fn resolve(&self, identity: HandlerId) -> Option<Arc<dyn ErasedHandler>>;
}

impl<P: HandlerProvider + ?Sized> HandlerProvider for Arc<P> {
    fn resolve(&self, identity: HandlerId) -> Option<Arc<dyn ErasedHandler>> {
        (**self).resolve(identity)
    }
}
