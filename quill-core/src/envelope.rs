//! The uniform response envelope.
//!
//! Every dispatch produces exactly one [`Envelope`], whatever happened along
//! the way. The envelope is created fresh per call and never shared.

use crate::error::Fault;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status codes carried by envelopes.
pub mod status {
    /// The operation succeeded.
    pub const OK: u16 = 200;
    /// The payload could not be decoded or failed validation.
    pub const BAD_REQUEST: u16 = 400;
    /// The caller is not authenticated.
    pub const UNAUTHORIZED: u16 = 401;
    /// The caller is not allowed to perform the operation.
    pub const FORBIDDEN: u16 = 403;
    /// The operation (or something it refers to) does not exist.
    pub const NOT_FOUND: u16 = 404;
    /// Anything unexpected.
    pub const INTERNAL_ERROR: u16 = 500;
}

const SUCCESS_MESSAGE: &str = "operation completed successfully";

/// The success/failure wrapper returned for every dispatch call.
///
/// A failed envelope never carries data; [`Envelope::new`] enforces this for
/// every construction path, including deserialization.
///
/// # Wire Format
///
/// ```json
/// { "isSuccess": false, "message": "operation not found", "data": null,
///   "errors": ["no operation matches 'nope'"], "statusCode": 404 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireEnvelope")]
pub struct Envelope {
    is_success: bool,
    message: String,
    data: Option<Value>,
    errors: Vec<String>,
    status_code: u16,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    is_success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<String>,
    status_code: u16,
}

impl From<WireEnvelope> for Envelope {
    fn from(wire: WireEnvelope) -> Self {
        Envelope::new(
            wire.is_success,
            wire.message,
            wire.data,
            wire.errors,
            wire.status_code,
        )
    }
}

impl Envelope {
    /// Populate an envelope from its parts.
    ///
    /// Data is dropped when `is_success` is `false`.
    pub fn new(
        is_success: bool,
        message: impl Into<String>,
        data: Option<Value>,
        errors: Vec<String>,
        status_code: u16,
    ) -> Self {
        let data = if is_success { data } else { None };
        Self {
            is_success,
            message: message.into(),
            data,
            errors,
            status_code,
        }
    }

    /// A 200 envelope carrying `data`.
    pub fn success(data: Value) -> Self {
        Self::new(true, SUCCESS_MESSAGE, Some(data), Vec::new(), status::OK)
    }

    /// A 200 envelope carrying `data` and a custom message.
    pub fn success_with_message(data: Value, message: impl Into<String>) -> Self {
        Self::new(true, message, Some(data), Vec::new(), status::OK)
    }

    /// A failure envelope.
    pub fn failure(status_code: u16, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self::new(false, message, None, errors, status_code)
    }

    /// Package a handler's serialized result.
    ///
    /// A result that is itself envelope-shaped (an object with a boolean
    /// `isSuccess` and a numeric `statusCode`) passes through unchanged;
    /// anything else is wrapped as a 200 success.
    pub fn from_handler_value(value: Value) -> Self {
        if Self::is_envelope_shaped(&value) {
            if let Ok(envelope) = serde_json::from_value::<Envelope>(value.clone()) {
                return envelope;
            }
        }
        Self::success(value)
    }

    fn is_envelope_shaped(value: &Value) -> bool {
        match value {
            Value::Object(map) => {
                map.get("isSuccess").is_some_and(Value::is_boolean)
                    && map.get("statusCode").is_some_and(Value::is_u64)
            }
            _ => false,
        }
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.is_success
    }

    /// Human-readable outcome summary.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The payload of a successful call.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Consume the envelope and return its payload.
    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// Every discrete error reported for the call.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The outcome category.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }
}

impl From<Fault> for Envelope {
    fn from(fault: Fault) -> Self {
        let errors = fault.error_list();
        Envelope::failure(fault.status_code(), fault.to_string(), errors)
    }
}
