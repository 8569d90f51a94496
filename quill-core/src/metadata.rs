//! Immutable metadata for discovered operations.

use crate::operation::{OperationKind, Shape};
use serde::{Serialize, Serializer};
use std::{any::TypeId, fmt};

/// An opaque reference to a handler serving one operation, resolved to a
/// live instance through a [`HandlerProvider`].
///
/// Identity is the pair (handler type, request type): one handler type may
/// serve several operations, and closures share a printable type name. The
/// type name is kept for display and ordering only.
///
/// [`HandlerProvider`]: crate::HandlerProvider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId {
    name: &'static str,
    handler: Option<TypeId>,
    request: Option<TypeId>,
}

impl HandlerId {
    /// The identity of handler type `H` serving request type `Op`.
    pub fn of<Op: ?Sized + 'static, H: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<H>(),
            handler: Some(TypeId::of::<H>()),
            request: Some(TypeId::of::<Op>()),
        }
    }

    /// An identity with an explicit name and no backing type.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            handler: None,
            request: None,
        }
    }

    /// The handler's printable name.
    pub fn as_str(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Serialize for HandlerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// Describes one discoverable, dispatchable operation.
///
/// Created once by discovery and never mutated afterwards; the kind in
/// particular is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    name: &'static str,
    action: String,
    request_shape: Shape,
    response_shape: Shape,
    kind: OperationKind,
    handler_identity: HandlerId,
    requires_authentication: bool,
}

impl OperationMetadata {
    /// Assemble metadata. The action is stored lowercase.
    pub fn new(
        name: &'static str,
        action: &str,
        request_shape: Shape,
        response_shape: Shape,
        kind: OperationKind,
        handler_identity: HandlerId,
        requires_authentication: bool,
    ) -> Self {
        Self {
            name,
            action: action.to_ascii_lowercase(),
            request_shape,
            response_shape,
            kind,
            handler_identity,
            requires_authentication,
        }
    }

    /// The declared identifier.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The external, lowercase action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Structure of the request.
    pub fn request_shape(&self) -> &Shape {
        &self.request_shape
    }

    /// Structure of the response.
    pub fn response_shape(&self) -> &Shape {
        &self.response_shape
    }

    /// Command, query, event or unknown.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The handler that serves this operation.
    pub fn handler_identity(&self) -> HandlerId {
        self.handler_identity
    }

    /// Whether callers must be authenticated.
    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }
}
