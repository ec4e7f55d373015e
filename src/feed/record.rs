//! Payload decoding: flat record array → value map + control sentinels.
//!
//! The wire format mixes displayable records (`name`/`value`/`unit`) with
//! sentinel records carrying `page`, `focus`, or `autoMode`. Decoding is
//! lenient: unknown keys are ignored, wrongly-typed fields are treated as
//! absent, and non-object array elements are skipped. Only a body that is not
//! a JSON array at all is rejected.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::core::errors::{DashError, Result};

/// A displayable parameter value: the feed sends either strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(Number),
}

impl ParamValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(Self::Number(n.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Live key → value lookup, rebuilt wholesale from each successful fetch.
pub type ValueMap = HashMap<String, ParamValue>;

/// Sentinel field carrying a value that is present but unusable.
///
/// `Invalid` still counts as "exposing" the field, so a later well-formed
/// sentinel of the same kind is not consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Signal<T> {
    Valid(T),
    Invalid,
}

/// One element of the payload array, decoded leniently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Signal<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<Signal<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_mode: Option<Signal<bool>>,
}

impl ParameterRecord {
    /// Decode one object. Fields set to `null` count as absent.
    #[must_use]
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            name: obj.get("name").and_then(Value::as_str).map(str::to_string),
            value: obj.get("value").and_then(ParamValue::from_json),
            unit: obj.get("unit").and_then(Value::as_str).map(str::to_string),
            page: signal(obj, "page", whole_number),
            focus: signal(obj, "focus", whole_number),
            auto_mode: signal(obj, "autoMode", Value::as_bool),
        }
    }
}

/// Integers, plus floats with no fractional part (`2.0` from float-typed producers).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn signal<T>(
    obj: &Map<String, Value>,
    key: &str,
    extract: impl Fn(&Value) -> Option<T>,
) -> Option<Signal<T>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(raw) => Some(extract(raw).map_or(Signal::Invalid, Signal::Valid)),
    }
}

/// Everything one successful poll cycle publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadSnapshot {
    /// Records in wire order (used by the live-blocks view).
    pub records: Vec<ParameterRecord>,
    pub values: ValueMap,
    /// First `page` sentinel, 1-based. `None` means no override this cycle.
    pub page: Option<i64>,
    /// First `focus` sentinel, 0-based. `None` means no override this cycle.
    pub focus: Option<i64>,
    /// First `autoMode` sentinel; absence resets to `false`.
    pub auto_mode: bool,
}

impl PayloadSnapshot {
    /// Reduce a decoded record sequence.
    ///
    /// Only the first record exposing each sentinel kind is honored. A first
    /// sentinel with an unusable value suppresses that kind for the cycle.
    #[must_use]
    pub fn from_records(records: Vec<ParameterRecord>) -> Self {
        let mut values = ValueMap::with_capacity(records.len());
        for record in &records {
            if let (Some(name), Some(value)) = (&record.name, &record.value) {
                values.insert(name.clone(), value.clone());
            }
        }

        let page = records
            .iter()
            .find_map(|r| r.page)
            .and_then(signal_value);
        let focus = records
            .iter()
            .find_map(|r| r.focus)
            .and_then(signal_value);
        let auto_mode = records
            .iter()
            .find_map(|r| r.auto_mode)
            .and_then(signal_value)
            .unwrap_or(false);

        Self {
            records,
            values,
            page,
            focus,
            auto_mode,
        }
    }

    /// Number of displayable records (those with a name).
    #[must_use]
    pub fn named_count(&self) -> usize {
        self.records.iter().filter(|r| r.name.is_some()).count()
    }
}

const fn signal_value<T: Copy>(signal: Signal<T>) -> Option<T> {
    match signal {
        Signal::Valid(v) => Some(v),
        Signal::Invalid => None,
    }
}

/// Decode a raw response body into a snapshot.
pub fn decode_payload(body: &str) -> Result<PayloadSnapshot> {
    let parsed: Value = serde_json::from_str(body).map_err(|e| DashError::MalformedPayload {
        details: e.to_string(),
    })?;
    let Value::Array(items) = parsed else {
        return Err(DashError::MalformedPayload {
            details: format!("expected a JSON array, got {}", json_kind(&parsed)),
        });
    };
    let records = items
        .iter()
        .filter_map(Value::as_object)
        .map(ParameterRecord::from_object)
        .collect();
    Ok(PayloadSnapshot::from_records(records))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ──────────────────── tests ────────────────────
