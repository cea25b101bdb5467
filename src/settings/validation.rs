//! Range validation for numeric settings.

use crate::settings::value::SettingValue;
use serde::{Deserialize, Serialize};

/// Classification of a setting's current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    #[default]
    Ok,
    MinValueWarning,
    MaxValueWarning,
    MinValueError,
    MaxValueError,
}

impl ValidationResult {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ValidationResult::MinValueError | ValidationResult::MaxValueError
        )
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ValidationResult::MinValueWarning | ValidationResult::MaxValueWarning
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationResult::Ok => "ok",
            ValidationResult::MinValueWarning => "min_value_warning",
            ValidationResult::MaxValueWarning => "max_value_warning",
            ValidationResult::MinValueError => "min_value_error",
            ValidationResult::MaxValueError => "max_value_error",
        }
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hard and soft limits for a numeric setting.
///
/// Values outside `min_value`/`max_value` are errors; values outside the
/// warning limits are accepted but flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueBounds {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_value_warning: Option<f64>,
    pub max_value_warning: Option<f64>,
}

impl ValueBounds {
    /// Check whether any limit is configured.
    pub fn is_empty(&self) -> bool {
        self.min_value.is_none()
            && self.max_value.is_none()
            && self.min_value_warning.is_none()
            && self.max_value_warning.is_none()
    }

    /// Classify a value. Errors take precedence over warnings; values without
    /// a numeric view always pass.
    pub fn validate(&self, value: &SettingValue) -> ValidationResult {
        let Some(v) = value.as_f64() else {
            return ValidationResult::Ok;
        };

        if let Some(min) = self.min_value {
            if v < min {
                return ValidationResult::MinValueError;
            }
        }
        if let Some(max) = self.max_value {
            if v > max {
                return ValidationResult::MaxValueError;
            }
        }
        if let Some(min) = self.min_value_warning {
            if v < min {
                return ValidationResult::MinValueWarning;
            }
        }
        if let Some(max) = self.max_value_warning {
            if v > max {
                return ValidationResult::MaxValueWarning;
            }
        }

        ValidationResult::Ok
    }
}
