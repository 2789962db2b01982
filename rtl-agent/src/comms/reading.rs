//! Sensor reading model.
//!
//! `rtl_433 -F json` emits one JSON object per decoded radio packet. Only the
//! fields the store persists (plus the sensor model and capture time, which
//! are useful in logs) are required; anything else the decoder adds is
//! ignored.
//!
//! A `Reading` only exists once a line has been fully validated: there is no
//! way to build or mutate one field by field.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// One parsed sensor observation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reading {
    #[serde(rename = "time")]
    timestamp: String,
    model: String,
    #[serde(rename = "id")]
    sensor_id: i64,
    #[serde(rename = "temperature_C")]
    temperature_c: f64,
    io: String,
}

/// Why a raw line was not turned into a `Reading`.
#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("line is not a valid reading: {0}")]
    Json(#[from] serde_json::Error),
}

impl Reading {
    /// Decode raw bytes from the subprocess and parse them.
    pub fn parse(raw: &[u8]) -> Result<Self, ReadingError> {
        std::str::from_utf8(raw)?.parse()
    }

    /// Capture-relative time string as reported by the decoder.
    pub fn timestamp(&self) -> &str { &self.timestamp }

    pub fn model(&self) -> &str { &self.model }

    pub fn sensor_id(&self) -> i64 { self.sensor_id }

    pub fn temperature_c(&self) -> f64 { self.temperature_c }

    /// Raw bit-string payload.
    pub fn io(&self) -> &str { &self.io }
}

impl FromStr for Reading {
    type Err = ReadingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The derived visitor would also take a positional array.
        let object: Map<String, Value> = serde_json::from_str(s)?;
        Ok(Reading::deserialize(Value::Object(object))?)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {:.1}°C @ {}",
            self.model, self.sensor_id, self.temperature_c, self.timestamp
        )
    }
}
