// Raw device payloads as handed over by the transport layer
use super::error::{json_kind, InvalidInput};
use serde_json::{Map, Value};

/// A device payload before normalization.
///
/// Devices either send an already-structured mapping or the serialized JSON
/// text of one.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Structured(Value),
    Text(String),
}

impl RawPayload {
    /// Decode into the JSON object the normalizers read from.
    pub fn into_object(self) -> Result<Map<String, Value>, InvalidInput> {
        let value = match self {
            RawPayload::Structured(value) => value,
            RawPayload::Text(text) => serde_json::from_str(&text)
                .map_err(|e| InvalidInput::MalformedEncoding(e.to_string()))?,
        };

        match value {
            Value::Object(map) => Ok(map),
            other => Err(InvalidInput::NotAnObject(json_kind(&other))),
        }
    }
}

impl From<Value> for RawPayload {
    /// A bare JSON string is treated as serialized text, anything else as structure.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => RawPayload::Text(text),
            other => RawPayload::Structured(other),
        }
    }
}

impl From<String> for RawPayload {
    fn from(text: String) -> Self {
        RawPayload::Text(text)
    }
}
