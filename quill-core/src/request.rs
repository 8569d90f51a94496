//! The generic request body accepted by transports.

use crate::error::Fault;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ "operation": "...", "data": ... }`
///
/// `data` may be a structured value or a string holding JSON text; it is
/// normalized by [`DispatchRequest::payload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// The external action or operation name.
    pub operation: String,
    /// The request payload.
    #[serde(default)]
    pub data: Value,
}

impl DispatchRequest {
    /// A request with a structured payload.
    pub fn new(operation: impl Into<String>, data: Value) -> Self {
        Self {
            operation: operation.into(),
            data,
        }
    }

    /// The structured payload.
    ///
    /// A missing or `null` payload is an empty object. A string payload is
    /// parsed as JSON text; text that does not parse is bad input.
    pub fn payload(&self) -> Result<Value, Fault> {
        normalize_payload(self.data.clone())
    }
}

/// Normalize a raw payload (see [`DispatchRequest::payload`]).
pub fn normalize_payload(data: Value) -> Result<Value, Fault> {
    match data {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            serde_json::from_str(trimmed)
                .map_err(|e| Fault::bad_input("payload is not valid JSON", vec![e.to_string()]))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_data_is_empty_object() {
        let request: DispatchRequest = serde_json::from_str(r#"{"operation":"ping"}"#).unwrap();
        assert_eq!(request.payload().unwrap(), json!({}));
    }

    #[test]
    fn test_string_data_is_parsed() {
        let request = DispatchRequest::new("login", json!(r#"{"email":"a@b.c"}"#));
        assert_eq!(request.payload().unwrap(), json!({"email": "a@b.c"}));
    }

    #[test]
    fn test_unparseable_string_is_bad_input() {
        let request = DispatchRequest::new("login", json!("{email"));
        let fault = request.payload().unwrap_err();
        assert_eq!(fault.status_code(), 400);
    }
}
