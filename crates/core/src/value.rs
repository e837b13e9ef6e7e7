//! Primitive field values and their codecs.
//!
//! The registry is closed: every primitive type has a string tag used on the
//! wire and one encode/decode pair.

use std::fmt;

use crate::codec::{ByteInput, ByteOutput};
use crate::error::{CodecError, CodecResult};

/// Type tag of a primitive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    /// `bool`
    Boolean,
    /// `i32`
    Int32,
    /// `f32`
    Float32,
    /// UTF-8 `String`
    String,
}

impl PrimitiveType {
    /// All registered primitive types.
    pub const ALL: [PrimitiveType; 4] = [
        PrimitiveType::Boolean,
        PrimitiveType::Int32,
        PrimitiveType::Float32,
        PrimitiveType::String,
    ];

    /// Wire tag of this type.
    pub fn tag(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::String => "string",
        }
    }

    /// Look up a type by its wire tag.
    pub fn from_tag(tag: &str) -> CodecResult<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.tag() == tag)
            .ok_or_else(|| CodecError::UnknownPrimitiveType(tag.to_string()))
    }

    /// Default value for a field of this type.
    pub fn default_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Boolean => PrimitiveValue::Boolean(false),
            PrimitiveType::Int32 => PrimitiveValue::Int32(0),
            PrimitiveType::Float32 => PrimitiveValue::Float32(0.0),
            PrimitiveType::String => PrimitiveValue::String(String::new()),
        }
    }

    /// Decode one value of this type.
    pub fn decode(self, input: &mut ByteInput<'_>) -> CodecResult<PrimitiveValue> {
        Ok(match self {
            PrimitiveType::Boolean => PrimitiveValue::Boolean(input.read_bool()?),
            PrimitiveType::Int32 => PrimitiveValue::Int32(input.read_i32()?),
            PrimitiveType::Float32 => PrimitiveValue::Float32(input.read_f32()?),
            PrimitiveType::String => PrimitiveValue::String(input.read_string()?),
        })
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Scalar held by a primitive field.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 32-bit float
    Float32(f32),
    /// String value
    String(String),
}

impl PrimitiveValue {
    /// Type tag of this value.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            PrimitiveValue::Boolean(_) => PrimitiveType::Boolean,
            PrimitiveValue::Int32(_) => PrimitiveType::Int32,
            PrimitiveValue::Float32(_) => PrimitiveType::Float32,
            PrimitiveValue::String(_) => PrimitiveType::String,
        }
    }

    /// Encode the value without its type tag.
    pub fn encode(&self, output: &mut ByteOutput) {
        match self {
            PrimitiveValue::Boolean(v) => output.write_bool(*v),
            PrimitiveValue::Int32(v) => output.write_i32(*v),
            PrimitiveValue::Float32(v) => output.write_f32(*v),
            PrimitiveValue::String(v) => output.write_string(v),
        }
    }

    /// Get as bool, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrimitiveValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as i32, if this is an int32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PrimitiveValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as f32, if this is a float32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PrimitiveValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as str, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrimitiveValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Boolean(v) => write!(f, "{}", v),
            PrimitiveValue::Int32(v) => write!(f, "{}", v),
            PrimitiveValue::Float32(v) => write!(f, "{}", v),
            PrimitiveValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for PrimitiveValue {
    fn from(v: bool) -> Self {
        PrimitiveValue::Boolean(v)
    }
}

impl From<i32> for PrimitiveValue {
    fn from(v: i32) -> Self {
        PrimitiveValue::Int32(v)
    }
}

impl From<f32> for PrimitiveValue {
    fn from(v: f32) -> Self {
        PrimitiveValue::Float32(v)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(v: &str) -> Self {
        PrimitiveValue::String(v.to_string())
    }
}

impl From<String> for PrimitiveValue {
    fn from(v: String) -> Self {
        PrimitiveValue::String(v)
    }
}
