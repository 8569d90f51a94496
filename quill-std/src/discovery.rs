//! Link-time discovery of operations, handlers and validators.
//!
//! `#[derive(Operation)]`, `#[quill::handler]` and `#[quill::validator]`
//! submit one registration each through `inventory`. The registrations only
//! hold function pointers, so they are usable in `static` position; nothing
//! is constructed until a registry is built.
//!
//! Types that implement the traits by hand can submit their own:
//!
//! ```rust,ignore
//! quill::inventory::submit! {
//!     quill::discovery::OperationRegistration::of::<LoginCommand>()
//! }
//! ```

use quill_core::{
    ErasedHandler, ErasedHandlerWrapper, ErasedValidator, ErasedValidatorWrapper, Handler,
    HandlerDescriptor, Operation, OperationDescriptor, Validator,
};
use std::{any::TypeId, sync::Arc};

/// A discoverable operation type.
#[derive(Debug, Clone, Copy)]
pub struct OperationRegistration {
    describe: fn() -> OperationDescriptor,
}

impl OperationRegistration {
    /// Register operation type `Op`.
    pub const fn of<Op: Operation>() -> Self {
        Self {
            describe: OperationDescriptor::of::<Op>,
        }
    }

    /// Produce the operation's descriptor.
    pub fn describe(&self) -> OperationDescriptor {
        (self.describe)()
    }
}

/// A discoverable handler type, with a factory for its default instance.
#[derive(Debug, Clone, Copy)]
pub struct HandlerRegistration {
    describe: fn() -> HandlerDescriptor,
    create: fn() -> Arc<dyn ErasedHandler>,
}

impl HandlerRegistration {
    /// Register handler `H` for operation `Op`.
    pub const fn of<Op, H>() -> Self
    where
        Op: Operation,
        H: Handler<Op> + Default,
    {
        Self {
            describe: HandlerDescriptor::of::<Op, H>,
            create: create_handler::<Op, H>,
        }
    }

    /// The handler's declaration.
    pub fn describe(&self) -> HandlerDescriptor {
        (self.describe)()
    }

    /// A fresh handler instance.
    pub fn create(&self) -> Arc<dyn ErasedHandler> {
        (self.create)()
    }
}

fn create_handler<Op, H>() -> Arc<dyn ErasedHandler>
where
    Op: Operation,
    H: Handler<Op> + Default,
{
    Arc::new(ErasedHandlerWrapper::<Op, H>::new(H::default()))
}

/// A discoverable validator type.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorRegistration {
    request_type: fn() -> TypeId,
    create: fn() -> Arc<dyn ErasedValidator>,
}

impl ValidatorRegistration {
    /// Register validator `V` for operation `Op`.
    pub const fn of<Op, V>() -> Self
    where
        Op: Operation,
        V: Validator<Op> + Default,
    {
        Self {
            request_type: TypeId::of::<Op>,
            create: create_validator::<Op, V>,
        }
    }

    /// The request type this validator checks.
    pub fn request_type(&self) -> TypeId {
        (self.request_type)()
    }

    /// A fresh validator instance.
    pub fn create(&self) -> Arc<dyn ErasedValidator> {
        (self.create)()
    }
}

fn create_validator<Op, V>() -> Arc<dyn ErasedValidator>
where
    Op: Operation,
    V: Validator<Op> + Default,
{
    Arc::new(ErasedValidatorWrapper::<Op, V>::new(V::default()))
}

inventory::collect!(OperationRegistration);
inventory::collect!(HandlerRegistration);
inventory::collect!(ValidatorRegistration);

/// Every operation registered in the linked program.
pub fn collect_operations() -> Vec<OperationDescriptor> {
    inventory::iter::<OperationRegistration>
        .into_iter()
        .map(OperationRegistration::describe)
        .collect()
}

/// Every handler registered in the linked program.
pub fn collect_handlers() -> Vec<&'static HandlerRegistration> {
    inventory::iter::<HandlerRegistration>.into_iter().collect()
}

/// Every validator registered in the linked program.
pub fn collect_validators() -> Vec<&'static ValidatorRegistration> {
    inventory::iter::<ValidatorRegistration>.into_iter().collect()
}
