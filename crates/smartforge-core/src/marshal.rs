//! Conversions between [`ScalarValue`] and backend wire encodings.
//!
//! - Field bus: values become a typed [`Variant`], chosen from the value kind and
//!   an optional [`Precision`].
//! - Key/value: values become byte strings; reads are decoded according to a
//!   caller-declared [`DataType`].

use crate::value::{DataType, Precision, ScalarValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field-bus wire type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantType {
    /// Single-bit boolean.
    Boolean,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// IEEE 754 single precision.
    Float,
    /// IEEE 754 double precision.
    Double,
    /// UTF-8 string; read-only from this side.
    String,
    /// Opaque bytes; read-only from this side.
    ByteString,
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A typed field-bus value as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    Boolean(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteString(Vec<u8>),
}

impl Variant {
    pub fn variant_type(&self) -> VariantType {
        match self {
            Self::Boolean(_) => VariantType::Boolean,
            Self::Int16(_) => VariantType::Int16,
            Self::Int32(_) => VariantType::Int32,
            Self::Int64(_) => VariantType::Int64,
            Self::Float(_) => VariantType::Float,
            Self::Double(_) => VariantType::Double,
            Self::String(_) => VariantType::String,
            Self::ByteString(_) => VariantType::ByteString,
        }
    }

    /// Widen the wire value back into an application scalar.
    pub fn to_scalar(&self) -> ScalarValue {
        match self {
            Self::Boolean(b) => ScalarValue::Boolean(*b),
            Self::Int16(i) => ScalarValue::Integer((*i).into()),
            Self::Int32(i) => ScalarValue::Integer((*i).into()),
            Self::Int64(i) => ScalarValue::Integer(*i),
            Self::Float(f) => ScalarValue::Float((*f).into()),
            Self::Double(f) => ScalarValue::Float(*f),
            Self::String(s) => ScalarValue::String(s.clone()),
            Self::ByteString(b) => ScalarValue::Bytes(b.clone()),
        }
    }
}

/// A value has no field-bus encoding for the requested width.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalError {
    #[error("{kind} values cannot be written to the field bus, expected boolean, float or integer")]
    UnsupportedKind { kind: &'static str },
    #[error("{kind} values have no {precision} wire type")]
    UnsupportedPrecision {
        kind: &'static str,
        precision: Precision,
    },
    #[error("integer {value} does not fit in {precision}")]
    OutOfRange { value: i64, precision: Precision },
    #[error("float {value} overflows {precision}")]
    FloatOutOfRange { value: f64, precision: Precision },
}

/// Select the field-bus wire type for a value.
pub fn to_variant(value: &ScalarValue, precision: Option<Precision>) -> Result<Variant, MarshalError> {
    match (value, precision) {
        (ScalarValue::Boolean(b), _) => Ok(Variant::Boolean(*b)),
        (ScalarValue::Float(f), Some(Precision::Bits32)) => {
            let single = *f as f32;
            if f.is_finite() && single.is_infinite() {
                return Err(MarshalError::FloatOutOfRange {
                    value: *f,
                    precision: Precision::Bits32,
                });
            }
            Ok(Variant::Float(single))
        }
        (ScalarValue::Float(f), Some(Precision::Bits64) | None) => Ok(Variant::Double(*f)),
        (ScalarValue::Integer(i), Some(Precision::Bits16)) => i16::try_from(*i)
            .map(Variant::Int16)
            .map_err(|_| MarshalError::OutOfRange {
                value: *i,
                precision: Precision::Bits16,
            }),
        (ScalarValue::Integer(i), Some(Precision::Bits32)) => i32::try_from(*i)
            .map(Variant::Int32)
            .map_err(|_| MarshalError::OutOfRange {
                value: *i,
                precision: Precision::Bits32,
            }),
        (ScalarValue::Integer(i), Some(Precision::Bits64) | None) => Ok(Variant::Int64(*i)),
        (v @ ScalarValue::Float(_), Some(p)) => Err(MarshalError::UnsupportedPrecision {
            kind: v.kind(),
            precision: p,
        }),
        (v, _) => Err(MarshalError::UnsupportedKind { kind: v.kind() }),
    }
}

/// Encode a value for the key/value store.
///
/// The store has no boolean type, so booleans are written as the text `True`
/// or `False`. Reading such a key back as [`DataType::Byte`] yields that text.
pub fn encode_kv(value: &ScalarValue) -> Vec<u8> {
    match value {
        ScalarValue::Bytes(b) => b.clone(),
        other => other.to_string().into_bytes(),
    }
}

/// A stored value could not be read as its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("stored value is not valid UTF-8")]
    InvalidUtf8,
    #[error("cannot parse {text:?} as {data_type}")]
    Malformed { text: String, data_type: DataType },
}

/// Decode a stored key/value entry according to its declared type.
///
/// Absent values and [`DataType::Byte`] pass through untouched. Text is
/// parsed exactly as stored: surrounding whitespace is never stripped, so
/// `" 42"` is not an integer and `"True "` is not a boolean.
pub fn decode_kv(raw: Option<Vec<u8>>, data_type: DataType) -> Result<Option<ScalarValue>, ConversionError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if data_type == DataType::Byte {
        return Ok(Some(ScalarValue::Bytes(raw)));
    }

    let text = String::from_utf8(raw).map_err(|_| ConversionError::InvalidUtf8)?;
    let malformed = |text: &str| ConversionError::Malformed {
        text: text.to_string(),
        data_type,
    };

    let value = match data_type {
        DataType::String => ScalarValue::String(text),
        DataType::Byte => ScalarValue::Bytes(text.into_bytes()),
        DataType::Integer => ScalarValue::Integer(text.parse().map_err(|_| malformed(&text))?),
        DataType::Float => ScalarValue::Float(text.parse().map_err(|_| malformed(&text))?),
        DataType::Boolean => ScalarValue::Boolean(parse_bool_literal(&text).ok_or_else(|| malformed(&text))?),
    };
    Ok(Some(value))
}

/// Only the two spellings [`encode_kv`] produces are accepted.
fn parse_bool_literal(text: &str) -> Option<bool> {
    match text {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}
