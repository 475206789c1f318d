// Path: crates/types/src/codec.rs

//! Decodes raw endorsement payloads into typed values.
//!
//! Contracts answer queries with self-describing JSON. This module turns those opaque
//! byte blobs into a [`DecodedValue`], and defines the canonical byte form used to
//! decide whether two endorsers agree. Canonicalization follows RFC 8785 (JCS), so two
//! payloads that differ only in key order or whitespace compare equal.

use crate::error::LedgerError;
use crate::MAX_PAYLOAD_BYTES;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A leaf value inside a decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// An explicit JSON `null` nested inside a structure.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, kept at the precision the payload carried.
    Number(Number),
    /// A UTF-8 string.
    Text(String),
}

/// The structured content of one endorsement payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", from = "Value")]
pub enum DecodedValue {
    /// A key-value object. Keys are kept sorted.
    Map(BTreeMap<String, DecodedValue>),
    /// An ordered sequence.
    List(Vec<DecodedValue>),
    /// A single leaf value.
    Scalar(Scalar),
    /// No value: the payload was empty or a bare `null`.
    Absent,
}

impl DecodedValue {
    /// Returns true if the payload carried no value.
    pub fn is_absent(&self) -> bool {
        matches!(self, DecodedValue::Absent)
    }

    /// Looks up a field of a `Map` value.
    pub fn get(&self, key: &str) -> Option<&DecodedValue> {
        match self {
            DecodedValue::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Returns the string content of a `Text` scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a JSON tree. `Absent` becomes `null`.
    pub fn to_json(&self) -> Value {
        match self {
            DecodedValue::Map(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            DecodedValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            DecodedValue::Scalar(Scalar::Null) | DecodedValue::Absent => Value::Null,
            DecodedValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            DecodedValue::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            DecodedValue::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
        }
    }

    /// Encodes the value into its canonical (RFC 8785) byte representation.
    ///
    /// Two values are considered identical by the aggregator exactly when their
    /// canonical bytes are equal.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        serde_jcs::to_vec(&self.to_json()).map_err(|e| LedgerError::MalformedPayload {
            peer: None,
            reason: format!("canonical encoding failed: {}", e),
            raw: Vec::new(),
        })
    }

    fn from_nested(v: Value) -> Self {
        match v {
            Value::Null => DecodedValue::Scalar(Scalar::Null),
            Value::Bool(b) => DecodedValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => DecodedValue::Scalar(Scalar::Number(n)),
            Value::String(s) => DecodedValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                DecodedValue::List(items.into_iter().map(Self::from_nested).collect())
            }
            Value::Object(m) => DecodedValue::Map(
                m.into_iter()
                    .map(|(k, v)| (k, Self::from_nested(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for DecodedValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => DecodedValue::Absent,
            other => DecodedValue::from_nested(other),
        }
    }
}

impl From<DecodedValue> for Value {
    fn from(v: DecodedValue) -> Self {
        v.to_json()
    }
}

/// Decodes a raw endorsement payload.
///
/// This is a pure function. A zero-length payload is a valid "no value" answer and
/// decodes to [`DecodedValue::Absent`]; it is never treated as a failure.
///
/// # Arguments
///
/// * `raw` - The opaque payload bytes exactly as one peer returned them.
///
/// # Returns
///
/// The decoded value, or `LedgerError::MalformedPayload` carrying the raw bytes when
/// the payload is oversized, not UTF-8, or not well-formed JSON.
pub fn decode(raw: &[u8]) -> Result<DecodedValue, LedgerError> {
    if raw.is_empty() {
        return Ok(DecodedValue::Absent);
    }
    if raw.len() > MAX_PAYLOAD_BYTES {
        return Err(malformed(
            raw,
            format!(
                "payload of {} bytes exceeds the {} byte limit",
                raw.len(),
                MAX_PAYLOAD_BYTES
            ),
        ));
    }
    let json: Value = serde_json::from_slice(raw).map_err(|e| malformed(raw, e.to_string()))?;
    Ok(DecodedValue::from(json))
}

fn malformed(raw: &[u8], reason: String) -> LedgerError {
    LedgerError::MalformedPayload {
        peer: None,
        reason,
        raw: raw.to_vec(),
    }
}
