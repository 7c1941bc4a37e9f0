// Telemetry sample domain model and normalizer
use super::error::{json_kind, InvalidInput};
use super::payload::RawPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One normalized telemetry reading.
///
/// `power` is derived from `voltage` and `current` on construction and has no
/// setter, so a record can never carry a stale power value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    voltage: f64,
    current: f64,
    angle: f64,
    power: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, voltage: f64, current: f64, angle: f64) -> Self {
        Self {
            timestamp,
            voltage,
            current,
            angle,
            power: voltage * current,
        }
    }

    /// Same reading captured at a different time. Power is unaffected.
    pub fn stamped(self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..self }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn power(&self) -> f64 {
        self.power
    }
}

/// Field naming used by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyConvention {
    /// `V` / `C` / `A`
    #[default]
    Abbreviated,
    /// `voltage` / `current` / `angle`
    Full,
}

/// Payload keys the normalizer reads each measurement from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleKeys {
    pub voltage: String,
    pub current: String,
    pub angle: String,
}

impl SampleKeys {
    pub fn new(
        voltage: impl Into<String>,
        current: impl Into<String>,
        angle: impl Into<String>,
    ) -> Self {
        Self {
            voltage: voltage.into(),
            current: current.into(),
            angle: angle.into(),
        }
    }
}

impl From<KeyConvention> for SampleKeys {
    fn from(convention: KeyConvention) -> Self {
        match convention {
            KeyConvention::Abbreviated => SampleKeys::new("V", "C", "A"),
            KeyConvention::Full => SampleKeys::new("voltage", "current", "angle"),
        }
    }
}

impl Default for SampleKeys {
    fn default() -> Self {
        KeyConvention::default().into()
    }
}

/// Convert a raw device payload into a canonical [`Sample`] captured at `now`.
///
/// Every measurement is required and must coerce to a finite float. Any
/// `power` the device sends is ignored and recomputed.
pub fn normalize(
    raw: RawPayload,
    keys: &SampleKeys,
    now: DateTime<Utc>,
) -> Result<Sample, InvalidInput> {
    let fields = raw.into_object()?;

    let voltage = read_measurement(&fields, &keys.voltage)?;
    let current = read_measurement(&fields, &keys.current)?;
    let angle = read_measurement(&fields, &keys.angle)?;

    Ok(Sample::new(now, voltage, current, angle))
}

fn read_measurement(fields: &Map<String, Value>, key: &str) -> Result<f64, InvalidInput> {
    let value = fields
        .get(key)
        .ok_or_else(|| InvalidInput::MissingField(key.to_string()))?;

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(InvalidInput::NonNumeric {
            field: key.to_string(),
            value: match value {
                Value::String(s) => format!("{:?}", s),
                other => json_kind(other).to_string(),
            },
        }),
    }
}
