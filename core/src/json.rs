//! Payload codec: raw bytes to a tagged JSON value and back.
//!
//! # Design
//! A `JsonValue` always keeps the bytes it was built from next to the parsed
//! structure, so a response can hand out either form without re-encoding.
//! Only two top-level shapes are structured: a mapping and a sequence of
//! mappings. Anything else that is still valid JSON (a scalar, an array of
//! scalars) is `None` and only keeps its bytes.

use serde_json::{Map, Value};

use crate::error::ParsingError;

/// A JSON mapping, the unit of structured payloads.
pub type Mapping = Map<String, Value>;

/// Parsed JSON payload paired with its raw bytes.
#[derive(Debug, Clone)]
pub enum JsonValue {
    None(Vec<u8>),
    Mapping(Vec<u8>, Mapping),
    Sequence(Vec<u8>, Vec<Mapping>),
}

impl JsonValue {
    /// An absent value with no bytes.
    pub fn none() -> Self {
        JsonValue::None(Vec::new())
    }

    /// Parse `bytes`, classifying the top level as mapping, sequence or none.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParsingError> {
        let body: Value =
            serde_json::from_slice(bytes).map_err(|e| ParsingError::Malformed(e.to_string()))?;
        let raw = bytes.to_vec();

        Ok(match body {
            Value::Object(mapping) => JsonValue::Mapping(raw, mapping),
            Value::Array(items) => match into_mappings(items) {
                Some(sequence) => JsonValue::Sequence(raw, sequence),
                None => JsonValue::None(raw),
            },
            _ => JsonValue::None(raw),
        })
    }

    /// Build from a mapping, serializing it to rebuild the bytes.
    pub fn from_mapping(mapping: Mapping) -> Result<Self, ParsingError> {
        let raw = serde_json::to_vec(&mapping)
            .map_err(|e| ParsingError::Unserializable(e.to_string()))?;
        Ok(JsonValue::Mapping(raw, mapping))
    }

    /// Build from a sequence of mappings, serializing it to rebuild the bytes.
    pub fn from_sequence(sequence: Vec<Mapping>) -> Result<Self, ParsingError> {
        let raw = serde_json::to_vec(&sequence)
            .map_err(|e| ParsingError::Unserializable(e.to_string()))?;
        Ok(JsonValue::Sequence(raw, sequence))
    }

    /// Build from an arbitrary structure; only mappings and sequences of
    /// mappings are accepted.
    pub fn from_value(value: Value) -> Result<Self, ParsingError> {
        match value {
            Value::Object(mapping) => Self::from_mapping(mapping),
            Value::Array(items) => match into_mappings(items) {
                Some(sequence) => Self::from_sequence(sequence),
                None => Err(ParsingError::Unserializable(
                    "sequence elements must be mappings".to_string(),
                )),
            },
            other => Err(ParsingError::Unserializable(format!(
                "expected a mapping or a sequence, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// The mapping, or an empty one for any other shape.
    pub fn mapping(&self) -> Mapping {
        match self {
            JsonValue::Mapping(_, mapping) => mapping.clone(),
            _ => Mapping::new(),
        }
    }

    /// The sequence, or an empty one for any other shape.
    pub fn sequence(&self) -> Vec<Mapping> {
        match self {
            JsonValue::Sequence(_, sequence) => sequence.clone(),
            _ => Vec::new(),
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            JsonValue::Mapping(_, mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Mapping]> {
        match self {
            JsonValue::Sequence(_, sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Raw bytes the value was parsed from (or serialized to).
    pub fn bytes(&self) -> &[u8] {
        match self {
            JsonValue::None(raw) | JsonValue::Mapping(raw, _) | JsonValue::Sequence(raw, _) => raw,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, JsonValue::None(_))
    }
}

/// Two values are equal when their parsed structures print the same; the raw
/// bytes are not compared.
impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        canonical(&self.mapping()) == canonical(&other.mapping())
            && canonical(&self.sequence()) == canonical(&other.sequence())
    }
}

/// Serialize a mapping or a sequence of mappings to bytes.
pub fn serialize(structure: &Value) -> Result<Vec<u8>, ParsingError> {
    JsonValue::from_value(structure.clone()).map(|json| json.bytes().to_vec())
}

/// Parse bytes into a `JsonValue`.
pub fn parse(bytes: &[u8]) -> Result<JsonValue, ParsingError> {
    JsonValue::parse(bytes)
}

fn into_mappings(items: Vec<Value>) -> Option<Vec<Mapping>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(mapping) => Some(mapping),
            _ => None,
        })
        .collect()
}

// serde_json's default map is ordered by key, so the printed form is canonical.
fn canonical<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
