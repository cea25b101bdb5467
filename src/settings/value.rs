//! Setting value and type definitions.
//!
//! Values arrive from three places: definition files (JSON), profile files
//! (KDL) and callers. All of them are normalised into [`SettingValue`] and
//! coerced to the declared [`SettingType`] before they are stored.

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Int,
    Float,
    Boolean,
    /// Free-form text (default when nothing else is known)
    #[default]
    String,
    /// One key out of the setting's option list
    Enum,
}

impl SettingType {
    /// Parse from the `type` field of a definition fragment.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Some(SettingType::Int),
            "float" | "double" => Some(SettingType::Float),
            "boolean" | "bool" => Some(SettingType::Boolean),
            "string" | "str" => Some(SettingType::String),
            "enum" => Some(SettingType::Enum),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::Int => "int",
            SettingType::Float => "float",
            SettingType::Boolean => "boolean",
            SettingType::String => "string",
            SettingType::Enum => "enum",
        }
    }

    /// Numeric types are the only ones range validation applies to.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SettingType::Int | SettingType::Float)
    }

    /// Infer a type from a raw value (used when a fragment has no `type`).
    pub fn infer(value: &SettingValue) -> Self {
        match value {
            SettingValue::Bool(_) => SettingType::Boolean,
            SettingValue::Int(_) => SettingType::Int,
            SettingValue::Float(_) => SettingType::Float,
            SettingValue::Text(_) => SettingType::String,
        }
    }
}

impl std::fmt::Display for SettingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    /// Convert a JSON scalar. Arrays, objects and null have no setting value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(SettingValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(SettingValue::Int(i))
                } else {
                    n.as_f64().map(SettingValue::Float)
                }
            }
            Value::String(s) => Some(SettingValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Int(i) => Some(*i as f64),
            SettingValue::Float(f) => Some(*f),
            SettingValue::Text(s) => s.trim().parse().ok(),
            SettingValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            SettingValue::Int(i) => match i {
                0 => Some(false),
                1 => Some(true),
                _ => None,
            },
            SettingValue::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce this value into the representation used by `ty`.
    ///
    /// Enum membership is checked by the setting, which owns the option list.
    pub fn coerce(&self, ty: SettingType) -> Result<SettingValue, Error> {
        let coerced = match ty {
            SettingType::Int => match self {
                SettingValue::Int(i) => Some(SettingValue::Int(*i)),
                SettingValue::Float(f) if is_integral(*f) => Some(SettingValue::Int(*f as i64)),
                SettingValue::Text(s) => s.trim().parse().ok().map(SettingValue::Int),
                _ => None,
            },
            SettingType::Float => self.as_f64().map(SettingValue::Float),
            SettingType::Boolean => self.as_bool().map(SettingValue::Bool),
            SettingType::String | SettingType::Enum => Some(SettingValue::Text(self.to_string())),
        };

        coerced.ok_or_else(|| {
            Error::InvalidValue(format!("cannot convert '{}' to {}", self, ty.as_str()))
        })
    }
}

/// Whole number inside the `i64` range. `i64::MAX as f64` rounds up to 2^63,
/// so the upper bound is exclusive.
fn is_integral(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl std::fmt::Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Float(v) => write!(f, "{}", v),
            SettingValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}
