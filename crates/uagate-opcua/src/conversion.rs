// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value coercion between loose external JSON and typed wire values.
//!
//! Writes: a loosely-typed scalar from the REST surface is coerced to the
//! variable's declared built-in type before it touches the stack; anything
//! that does not fit is rejected as caller input with the canonical
//! type-mismatch message. Reads: a wire value becomes JSON plus a shape
//! descriptor sufficient for the caller to format a future write.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{status, UaError, UaResult, WRITE_TYPE_MISMATCH_MESSAGE};
use crate::transport::{NodeSnapshot, UaValue, ValueSample};
use crate::types::UaDataType;

// =============================================================================
// ExternalValue
// =============================================================================

/// How a value is shaped on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeRank {
    /// A single scalar.
    Scalar,
    /// A one-dimensional array.
    Array,
}

/// Machine-readable descriptor of a value's type and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSchema {
    /// Built-in type name, or the data type's node id string for
    /// non-standard types.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Scalar or array.
    pub rank: ShapeRank,

    /// Array dimensions, when the value is an array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<usize>>,
}

/// A variable value as presented on the REST surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalValue {
    /// The value as JSON.
    pub value: JsonValue,

    /// Shape descriptor for the value.
    #[serde(rename = "value-schema")]
    pub schema: ValueSchema,

    /// Status name of the read, e.g. `"Good"`.
    pub status: String,
}

// =============================================================================
// Write Coercion
// =============================================================================

/// Coerces a loose external scalar into the variable's declared type.
///
/// The declared data type must resolve to a built-in kind; custom and
/// structured types are not writable through this surface. Every failure
/// is caller input, never a stack fault.
pub fn to_write_value(raw: &JsonValue, snapshot: &NodeSnapshot) -> UaResult<UaValue> {
    let kind = snapshot
        .built_in_type()
        .ok_or_else(|| UaError::caller_input(WRITE_TYPE_MISMATCH_MESSAGE))?;

    coerce_scalar(raw, kind).ok_or_else(|| UaError::caller_input(WRITE_TYPE_MISMATCH_MESSAGE))
}

fn coerce_scalar(raw: &JsonValue, kind: UaDataType) -> Option<UaValue> {
    match kind {
        UaDataType::Boolean => bool_from_json(raw).map(UaValue::Boolean),
        UaDataType::SByte => {
            integral_from_json(raw).and_then(|v| i8::try_from(v).ok().map(UaValue::SByte))
        }
        UaDataType::Byte => {
            integral_from_json(raw).and_then(|v| u8::try_from(v).ok().map(UaValue::Byte))
        }
        UaDataType::Int16 => {
            integral_from_json(raw).and_then(|v| i16::try_from(v).ok().map(UaValue::Int16))
        }
        UaDataType::UInt16 => {
            integral_from_json(raw).and_then(|v| u16::try_from(v).ok().map(UaValue::UInt16))
        }
        UaDataType::Int32 => {
            integral_from_json(raw).and_then(|v| i32::try_from(v).ok().map(UaValue::Int32))
        }
        UaDataType::UInt32 => {
            integral_from_json(raw).and_then(|v| u32::try_from(v).ok().map(UaValue::UInt32))
        }
        UaDataType::Int64 => {
            integral_from_json(raw).and_then(|v| i64::try_from(v).ok().map(UaValue::Int64))
        }
        UaDataType::UInt64 => {
            integral_from_json(raw).and_then(|v| u64::try_from(v).ok().map(UaValue::UInt64))
        }
        UaDataType::Float => float_from_json(raw).map(|v| UaValue::Float(v as f32)),
        UaDataType::Double => float_from_json(raw).map(UaValue::Double),
        UaDataType::String => string_from_json(raw).map(UaValue::String),
        UaDataType::DateTime => raw
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| UaValue::DateTime(dt.with_timezone(&chrono::Utc))),
        UaDataType::Guid => raw
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(UaValue::Guid),
        UaDataType::ByteString => raw
            .as_str()
            .and_then(decode_hex)
            .map(UaValue::ByteString),
    }
}

fn bool_from_json(raw: &JsonValue) -> Option<bool> {
    if let Some(v) = raw.as_bool() {
        return Some(v);
    }
    if let Some(v) = raw.as_f64() {
        return Some(v != 0.0);
    }
    let s = raw.as_str()?.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn integral_from_json(raw: &JsonValue) -> Option<i128> {
    if let Some(v) = raw.as_i64() {
        return Some(v as i128);
    }
    if let Some(v) = raw.as_u64() {
        return Some(v as i128);
    }
    if let Some(v) = raw.as_f64() {
        if v.is_finite() && v.fract() == 0.0 {
            return Some(v as i128);
        }
        return None;
    }
    raw.as_str()?.trim().parse().ok()
}

fn float_from_json(raw: &JsonValue) -> Option<f64> {
    if let Some(v) = raw.as_f64() {
        return Some(v);
    }
    raw.as_str()?.trim().parse().ok()
}

fn string_from_json(raw: &JsonValue) -> Option<String> {
    match raw {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(_) | JsonValue::Number(_) => Some(raw.to_string()),
        _ => None,
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

// =============================================================================
// Read Conversion
// =============================================================================

/// Converts a read sample into its external JSON form with schema and
/// status name.
pub fn to_external_value(sample: &ValueSample, snapshot: &NodeSnapshot) -> ExternalValue {
    let value = sample
        .value
        .as_ref()
        .map(value_to_json)
        .unwrap_or(JsonValue::Null);

    let (rank, dimensions) = match &sample.value {
        Some(UaValue::Array(items)) => (ShapeRank::Array, Some(vec![items.len()])),
        _ => (ShapeRank::Scalar, None),
    };

    let type_name = snapshot
        .built_in_type()
        .map(|kind| kind.name().to_string())
        .or_else(|| snapshot.data_type().map(|id| id.to_opc_string()))
        .unwrap_or_else(|| "Null".to_string());

    ExternalValue {
        value,
        schema: ValueSchema {
            type_name,
            rank,
            dimensions,
        },
        status: status::name(sample.status_code).to_string(),
    }
}

/// Renders a wire value as JSON. Non-finite floats become `null`, byte
/// strings render as lowercase hex.
pub fn value_to_json(value: &UaValue) -> JsonValue {
    match value {
        UaValue::Boolean(v) => JsonValue::Bool(*v),
        UaValue::SByte(v) => JsonValue::from(*v),
        UaValue::Byte(v) => JsonValue::from(*v),
        UaValue::Int16(v) => JsonValue::from(*v),
        UaValue::UInt16(v) => JsonValue::from(*v),
        UaValue::Int32(v) => JsonValue::from(*v),
        UaValue::UInt32(v) => JsonValue::from(*v),
        UaValue::Int64(v) => JsonValue::from(*v),
        UaValue::UInt64(v) => JsonValue::from(*v),
        UaValue::Float(v) => serde_json::Number::from_f64(*v as f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        UaValue::Double(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        UaValue::String(v) => JsonValue::String(v.clone()),
        UaValue::DateTime(v) => JsonValue::String(v.to_rfc3339()),
        UaValue::Guid(v) => JsonValue::String(v.to_string()),
        UaValue::ByteString(bytes) => {
            JsonValue::String(bytes.iter().map(|b| format!("{b:02x}")).collect())
        }
        UaValue::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        UaValue::Null => JsonValue::Null,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::transport::NodeInfo;
    use crate::types::NodeId;

    fn variable_snapshot(data_type: u32, value_rank: i32) -> NodeSnapshot {
        NodeSnapshot {
            node_id: NodeId::numeric(2, 1001),
            display_name: "Speed".into(),
            browse_name: "2:Speed".into(),
            info: NodeInfo::Variable {
                data_type: NodeId::numeric(0, data_type),
                value_rank,
                user_access_level: 0x3,
                minimum_sampling_interval: None,
                historizing: false,
            },
        }
    }

    #[test]
    fn test_boolean_coercion() {
        let snapshot = variable_snapshot(1, -1);
        assert_eq!(
            to_write_value(&json!(true), &snapshot).unwrap(),
            UaValue::Boolean(true)
        );
        assert_eq!(
            to_write_value(&json!("False"), &snapshot).unwrap(),
            UaValue::Boolean(false)
        );
        assert_eq!(
            to_write_value(&json!(1), &snapshot).unwrap(),
            UaValue::Boolean(true)
        );
        assert!(to_write_value(&json!("maybe"), &snapshot).is_err());
    }

    #[test]
    fn test_integer_coercion_respects_range() {
        let snapshot = variable_snapshot(4, -1);
        assert_eq!(
            to_write_value(&json!(1200), &snapshot).unwrap(),
            UaValue::Int16(1200)
        );
        assert_eq!(
            to_write_value(&json!("-5"), &snapshot).unwrap(),
            UaValue::Int16(-5)
        );

        let error = to_write_value(&json!(70000), &snapshot).unwrap_err();
        assert!(error.is_caller_input());
        assert_eq!(error.to_string(), WRITE_TYPE_MISMATCH_MESSAGE);
    }

    #[test]
    fn test_integral_rejects_fractions() {
        let snapshot = variable_snapshot(6, -1);
        assert_eq!(
            to_write_value(&json!(25.0), &snapshot).unwrap(),
            UaValue::Int32(25)
        );
        assert!(to_write_value(&json!(25.7), &snapshot).is_err());
    }

    #[test]
    fn test_double_and_string_coercion() {
        let double = variable_snapshot(11, -1);
        assert_eq!(
            to_write_value(&json!("21.5"), &double).unwrap(),
            UaValue::Double(21.5)
        );

        let string = variable_snapshot(12, -1);
        assert_eq!(
            to_write_value(&json!(42), &string).unwrap(),
            UaValue::String("42".into())
        );
        assert!(to_write_value(&json!([1, 2]), &string).is_err());
    }

    #[test]
    fn test_custom_data_type_rejected() {
        let snapshot = NodeSnapshot {
            node_id: NodeId::numeric(2, 1001),
            display_name: "Recipe".into(),
            browse_name: "2:Recipe".into(),
            info: NodeInfo::Variable {
                data_type: NodeId::numeric(3, 3002),
                value_rank: -1,
                user_access_level: 0x3,
                minimum_sampling_interval: None,
                historizing: false,
            },
        };

        let error = to_write_value(&json!(1), &snapshot).unwrap_err();
        assert!(error.is_caller_input());
    }

    #[test]
    fn test_guid_and_hex_coercion() {
        let guid = variable_snapshot(14, -1);
        let raw = "72962b91-fa75-4ae6-8d28-b404dc7daf63";
        assert_eq!(
            to_write_value(&json!(raw), &guid).unwrap(),
            UaValue::Guid(raw.parse().unwrap())
        );

        let bytes = variable_snapshot(15, -1);
        assert_eq!(
            to_write_value(&json!("0aff"), &bytes).unwrap(),
            UaValue::ByteString(vec![0x0a, 0xff])
        );
        assert!(to_write_value(&json!("0af"), &bytes).is_err());
    }

    #[test]
    fn test_external_value_scalar() {
        let snapshot = variable_snapshot(11, -1);
        let sample = ValueSample::good(snapshot.node_id.clone(), UaValue::Double(21.5));

        let external = to_external_value(&sample, &snapshot);
        assert_eq!(external.value, json!(21.5));
        assert_eq!(external.schema.type_name, "Double");
        assert_eq!(external.schema.rank, ShapeRank::Scalar);
        assert!(external.schema.dimensions.is_none());
        assert_eq!(external.status, "Good");
    }

    #[test]
    fn test_external_value_array_and_wire_keys() {
        let snapshot = variable_snapshot(6, 1);
        let sample = ValueSample::good(
            snapshot.node_id.clone(),
            UaValue::Array(vec![UaValue::Int32(1), UaValue::Int32(2), UaValue::Int32(3)]),
        );

        let external = to_external_value(&sample, &snapshot);
        assert_eq!(external.value, json!([1, 2, 3]));
        assert_eq!(external.schema.rank, ShapeRank::Array);
        assert_eq!(external.schema.dimensions, Some(vec![3]));

        let wire = serde_json::to_value(&external).unwrap();
        assert!(wire.get("value-schema").is_some());
        assert_eq!(wire["value-schema"]["type"], "Int32");
        assert_eq!(wire["value-schema"]["rank"], "array");
    }

    #[test]
    fn test_value_to_json_edge_cases() {
        assert_eq!(value_to_json(&UaValue::Double(f64::NAN)), JsonValue::Null);
        assert_eq!(
            value_to_json(&UaValue::ByteString(vec![0xde, 0xad])),
            json!("dead")
        );
        assert_eq!(value_to_json(&UaValue::Null), JsonValue::Null);
    }
}
