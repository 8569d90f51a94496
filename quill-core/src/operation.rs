//! Operation trait and the self-description every request type provides.

use crate::error::DescribeError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::any::{Any, TypeId};

/// The category of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub enum OperationKind {
    /// Changes state.
    Command,
    /// Reads state without changing it.
    Query,
    /// Announces that something happened.
    Event,
    /// Neither suffix nor marker identified the kind.
    Unknown,
}

impl OperationKind {
    const SUFFIXES: [(&'static str, OperationKind); 3] = [
        ("Command", OperationKind::Command),
        ("Query", OperationKind::Query),
        ("Event", OperationKind::Event),
    ];

    /// Classify a type name by its suffix.
    ///
    /// A name that *is* the suffix (`"Query"`) is not classified.
    pub fn from_type_name(name: &str) -> Self {
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
            .map_or(OperationKind::Unknown, |(_, kind)| *kind)
    }

    /// The naming suffix associated with this kind, if any.
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            OperationKind::Command => Some("Command"),
            OperationKind::Query => Some("Query"),
            OperationKind::Event => Some("Event"),
            OperationKind::Unknown => None,
        }
    }

    /// Strip any recognized kind suffix from `name`.
    pub fn strip_suffix(name: &str) -> &str {
        Self::SUFFIXES
            .iter()
            .find_map(|(suffix, _)| name.strip_suffix(suffix))
            .unwrap_or(name)
    }

    /// Whether `name` ends with a recognized suffix, ignoring ASCII case.
    pub fn has_suffix_ignore_case(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        Self::SUFFIXES
            .iter()
            .any(|(suffix, _)| lower.ends_with(&suffix.to_ascii_lowercase()))
    }
}

/// One field of a [`Shape`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldShape {
    name: &'static str,
    ty: &'static str,
}

impl FieldShape {
    /// Describe a field by its wire name and type.
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self { name, ty }
    }

    /// The field's name on the wire.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The field's declared type.
    pub fn ty(&self) -> &'static str {
        self.ty
    }
}

/// Structural description of a request or response type.
///
/// Records carry their fields; opaque shapes only know the type name (used
/// for response types and hand-written operations that skip field listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    type_name: &'static str,
    fields: Vec<FieldShape>,
}

impl Shape {
    /// A record with named fields.
    pub fn record(type_name: &'static str, fields: Vec<FieldShape>) -> Self {
        Self { type_name, fields }
    }

    /// A shape that only knows its type name.
    pub fn opaque(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    /// The described type's name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The described fields, in declaration order.
    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    /// Look up a field by wire name.
    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A request type that can be dispatched by name.
///
/// Usually derived with `#[derive(Operation)]`, which also registers the type
/// for discovery. Hand-written implementations must be added to a registry
/// builder explicitly.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct LoginCommand { email: String, password: String }
///
/// impl Operation for LoginCommand {
///     type Response = LoginResponse;
///     const NAME: &'static str = "LoginCommand";
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a dispatchable Operation",
    label = "missing `Operation` implementation",
    note = "Derive `Operation` or implement it with a `Response` type and a `NAME`."
)]
pub trait Operation: DeserializeOwned + Send + Sync + 'static {
    /// The value the handler returns.
    type Response: Serialize + Send + 'static;

    /// The declared identifier, normally the type's own name.
    const NAME: &'static str;

    /// Explicit kind marker; `None` falls back to the name suffix.
    const KIND: Option<OperationKind> = None;

    /// Explicit external action; `None` derives one from the name.
    const ACTION: Option<&'static str> = None;

    /// Whether callers must be authenticated.
    const REQUIRES_AUTHENTICATION: bool = false;

    /// Structural description of the request.
    fn request_shape() -> Shape {
        Shape::opaque(Self::NAME)
    }

    /// Structural description of the response.
    fn response_shape() -> Shape {
        Shape::opaque(std::any::type_name::<Self::Response>())
    }
}

/// A decoded request whose concrete type is known only to its handler.
pub type ErasedRequest = Box<dyn Any + Send>;

/// Decodes a structured payload into an [`ErasedRequest`].
pub type DecodeFn = fn(Value) -> Result<ErasedRequest, serde_json::Error>;

/// Everything discovery needs to know about one operation type.
///
/// Produced by [`OperationDescriptor::of`], with type identities and the
/// payload decoder erased at this boundary.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Declared operation name.
    pub name: &'static str,
    /// Explicit kind marker.
    pub kind_marker: Option<OperationKind>,
    /// Explicit external action.
    pub action_override: Option<&'static str>,
    /// Authentication marker.
    pub requires_authentication: bool,
    /// Request structure.
    pub request_shape: Shape,
    /// Response structure.
    pub response_shape: Shape,
    /// Identity of the request type.
    pub request_type: TypeId,
    /// Identity of the response type.
    pub response_type: TypeId,
    /// Payload decoder for the request type.
    pub decode: DecodeFn,
}

impl OperationDescriptor {
    /// Describe an operation type.
    pub fn of<Op: Operation>() -> Self {
        Self {
            name: Op::NAME,
            kind_marker: Op::KIND,
            action_override: Op::ACTION,
            requires_authentication: Op::REQUIRES_AUTHENTICATION,
            request_shape: Op::request_shape(),
            response_shape: Op::response_shape(),
            request_type: TypeId::of::<Op>(),
            response_type: TypeId::of::<Op::Response>(),
            decode: decode_request::<Op>,
        }
    }

    /// Check that the description can produce metadata.
    pub fn validate(&self) -> Result<(), DescribeError> {
        if self.name.trim().is_empty() {
            return Err(DescribeError::EmptyName);
        }
        if let Some(action) = self.action_override {
            if !is_valid_action(action) {
                return Err(DescribeError::InvalidAction {
                    name: self.name.to_string(),
                    action: action.to_string(),
                });
            }
        } else if OperationKind::strip_suffix(self.name).is_empty() {
            return Err(DescribeError::EmptyAction {
                name: self.name.to_string(),
            });
        }
        Ok(())
    }
}

/// Whether `action` can be used as an external action: non-empty, made of
/// ASCII alphanumerics, `.`, `-` or `_`.
pub fn is_valid_action(action: &str) -> bool {
    !action.is_empty()
        && action
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn decode_request<Op: Operation>(payload: Value) -> Result<ErasedRequest, serde_json::Error> {
    let request: Op = serde_json::from_value(payload)?;
    Ok(Box::new(request))
}
