// Ingestion errors raised by the normalizer and fault decoding
use thiserror::Error;

/// Rejection of a raw device payload.
///
/// Every variant is recoverable and is reported back to the caller. Nothing
/// is written to the stores when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("malformed payload encoding: {0}")]
    MalformedEncoding(String),

    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` is not numeric: {value}")]
    NonNumeric { field: String, value: String },

    #[error("field `{field}` must be a string, got {kind}")]
    NonText { field: String, kind: &'static str },
}

/// Short name of a JSON value's type, used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
