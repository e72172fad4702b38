// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values carried between ports.

use crate::port::PortType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value that can flow out of an output port
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Produced, but empty
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
    /// String
    String(String),
}

impl Value {
    /// Get the port type for this value, `None` for [`Value::Null`]
    pub fn port_type(&self) -> Option<PortType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(PortType::Bool),
            Self::Int(_) => Some(PortType::Int),
            Self::Float(_) => Some(PortType::Float),
            Self::Vector2(_) => Some(PortType::Vector2),
            Self::Vector3(_) => Some(PortType::Vector3),
            Self::Vector4(_) => Some(PortType::Vector4),
            Self::Color(_) => Some(PortType::Color),
            Self::String(_) => Some(PortType::String),
        }
    }

    /// Short description of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vector2(_) => "vector2",
            Self::Vector3(_) => "vector3",
            Self::Vector4(_) => "vector4",
            Self::Color(_) => "color",
            Self::String(_) => "string",
        }
    }

    /// Check for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the integer, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the float, if this is one
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the string slice, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vector2(v) => write!(f, "{v:?}"),
            Self::Vector3(v) => write!(f, "{v:?}"),
            Self::Vector4(v) | Self::Color(v) => write!(f, "{v:?}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// Current state of an output port.
///
/// `Unset` means the port has not produced anything during the current
/// evaluation pass; `Set(Value::Null)` is a legitimate produced value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OutputValue {
    /// Not yet produced
    #[default]
    Unset,
    /// Produced
    Set(Value),
}

impl OutputValue {
    /// Whether a value has been produced
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Get the produced value
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Set(v) => Some(v),
            Self::Unset => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_distinct_from_unset() {
        let produced = OutputValue::Set(Value::Null);
        assert!(produced.is_set());
        assert_eq!(produced.value(), Some(&Value::Null));
        assert!(!OutputValue::Unset.is_set());
        assert_ne!(produced, OutputValue::Unset);
    }

    #[test]
    fn test_port_type_of_value() {
        assert_eq!(Value::Int(3).port_type(), Some(PortType::Int));
        assert_eq!(Value::from("a").port_type(), Some(PortType::String));
        assert_eq!(Value::Null.port_type(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
