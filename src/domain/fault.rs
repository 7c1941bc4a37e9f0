// Fault lifecycle domain model
use super::error::{json_kind, InvalidInput};
use super::payload::RawPayload;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One raised fault and, once cleared, its resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultRecord {
    pub timestamp: DateTime<Utc>,
    pub fault: String,
    pub message: String,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_time: Option<DateTime<Utc>>,
}

impl FaultRecord {
    pub fn raised(input: FaultInput, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            fault: input.fault,
            message: input.message,
            resolved: false,
            resolved_time: None,
        }
    }

    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_time = Some(at);
    }
}

/// Caller-supplied part of a fault notification.
///
/// Absent fields default to empty strings; requiring them is left to the
/// transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultInput {
    pub fault: String,
    pub message: String,
}

impl FaultInput {
    pub fn new(fault: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fault: fault.into(),
            message: message.into(),
        }
    }

    pub fn from_payload(raw: RawPayload) -> Result<Self, InvalidInput> {
        let fields = raw.into_object()?;
        Ok(Self::new(
            read_text(&fields, "fault")?,
            read_text(&fields, "message")?,
        ))
    }
}

fn read_text(fields: &Map<String, Value>, key: &str) -> Result<String, InvalidInput> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(InvalidInput::NonText {
            field: key.to_string(),
            kind: json_kind(other),
        }),
    }
}

/// Lifecycle state of the fault tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultState {
    NoFault,
    FaultActive,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_reads_fields() {
        let input = FaultInput::from_payload(RawPayload::Structured(
            json!({"fault": "OVERVOLT", "message": "too high"}),
        ))
        .unwrap();

        assert_eq!(input, FaultInput::new("OVERVOLT", "too high"));
    }

    #[test]
    fn test_from_payload_defaults_absent_fields() {
        let input = FaultInput::from_payload(RawPayload::Text(r#"{"fault": "E42"}"#.into())).unwrap();

        assert_eq!(input.fault, "E42");
        assert_eq!(input.message, "");
    }

    #[test]
    fn test_from_payload_rejects_non_text() {
        let err = FaultInput::from_payload(RawPayload::Structured(json!({"fault": 7}))).unwrap_err();

        assert_eq!(
            err,
            InvalidInput::NonText {
                field: "fault".into(),
                kind: "number"
            }
        );
    }

    #[test]
    fn test_unresolved_record_omits_resolved_time() {
        let record = FaultRecord::raised(FaultInput::new("E1", "m"), Utc::now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["resolved"], json!(false));
        assert!(value.get("resolved_time").is_none());
    }
}
