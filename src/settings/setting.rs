//! Individual settings and the partial updates definition files apply to them.

use crate::Error;
use crate::settings::validation::{ValidationResult, ValueBounds};
use crate::settings::value::{SettingType, SettingValue};
use serde_json::{Map, Value};

/// Parsed setting fragment from a definition file.
///
/// Every field is optional: `None` means "keep whatever the setting already
/// has". Applying the same fragment twice leaves the setting unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingFragment {
    pub label: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub setting_type: Option<SettingType>,
    pub default_value: Option<SettingValue>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_value_warning: Option<f64>,
    pub max_value_warning: Option<f64>,
    /// Enum options as (key, label) in declaration order.
    pub options: Option<Vec<(String, String)>>,
    pub visible: Option<bool>,
    /// Child fragments in declaration order.
    pub children: Vec<(String, SettingFragment)>,
}

impl SettingFragment {
    /// Parse a fragment from the JSON object stored under a setting key.
    ///
    /// Unknown fields are ignored. Known fields with the wrong shape are
    /// rejected with a description of the problem.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("setting '{}' must be an object", key))?;

        let mut fragment = Self {
            label: get_string(obj, key, "label")?,
            description: get_string(obj, key, "description")?,
            unit: get_string(obj, key, "unit")?,
            min_value: get_number(obj, key, "min_value")?,
            max_value: get_number(obj, key, "max_value")?,
            min_value_warning: get_number(obj, key, "min_value_warning")?,
            max_value_warning: get_number(obj, key, "max_value_warning")?,
            ..Default::default()
        };

        if let Some(ty) = get_string(obj, key, "type")? {
            fragment.setting_type = Some(
                SettingType::parse(&ty)
                    .ok_or_else(|| format!("setting '{}' has unknown type '{}'", key, ty))?,
            );
        }

        if let Some(default) = obj.get("default") {
            if !default.is_null() {
                fragment.default_value = Some(SettingValue::from_json(default).ok_or_else(
                    || format!("setting '{}' has a non-scalar default value", key),
                )?);
            }
        }

        if let Some(visible) = obj.get("visible") {
            fragment.visible = Some(
                visible
                    .as_bool()
                    .ok_or_else(|| format!("setting '{}': 'visible' must be a boolean", key))?,
            );
        }

        if let Some(options) = obj.get("options") {
            let options = options
                .as_object()
                .ok_or_else(|| format!("setting '{}': 'options' must be an object", key))?;
            fragment.options = Some(
                options
                    .iter()
                    .map(|(k, v)| {
                        let label = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                        (k.clone(), label)
                    })
                    .collect(),
            );
        }

        if let Some(children) = obj.get("children") {
            let children = children
                .as_object()
                .ok_or_else(|| format!("setting '{}': 'children' must be an object", key))?;
            for (child_key, child) in children {
                fragment
                    .children
                    .push((child_key.clone(), SettingFragment::from_json(child_key, child)?));
            }
        }

        Ok(fragment)
    }
}

fn get_string(obj: &Map<String, Value>, key: &str, field: &str) -> Result<Option<String>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("setting '{}': '{}' must be a string", key, field)),
    }
}

fn get_number(obj: &Map<String, Value>, key: &str, field: &str) -> Result<Option<f64>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("setting '{}': '{}' must be a number", key, field)),
        Some(_) => Err(format!("setting '{}': '{}' must be a number", key, field)),
    }
}

/// A single configurable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    key: String,
    label: String,
    description: String,
    unit: String,
    /// Declared type; inferred from the default when never declared.
    setting_type: Option<SettingType>,
    default_value: Option<SettingValue>,
    /// Current value. `None` follows the default.
    value: Option<SettingValue>,
    bounds: ValueBounds,
    options: Vec<(String, String)>,
    visible: bool,
    /// Key of the owning category, `None` for machine-level settings.
    category: Option<String>,
    /// Display catalog used for labels.
    catalog: Option<String>,
    children: Vec<Setting>,
}

impl Setting {
    /// Create a setting with every structural field unset.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            description: String::new(),
            unit: String::new(),
            setting_type: None,
            default_value: None,
            value: None,
            bounds: ValueBounds::default(),
            options: Vec::new(),
            visible: true,
            category: None,
            catalog: None,
            children: Vec::new(),
        }
    }

    /// Set the owning category (applies to existing children too).
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.set_category(category);
        self
    }

    pub fn with_catalog(mut self, catalog: Option<String>) -> Self {
        self.catalog = catalog;
        self
    }

    fn set_category(&mut self, category: Option<String>) {
        for child in &mut self.children {
            child.set_category(category.clone());
        }
        self.category = category;
    }

    /// Apply a definition fragment, overwriting every field it carries.
    ///
    /// Children are found by key among this setting's direct children or
    /// created when missing.
    pub fn apply(&mut self, fragment: &SettingFragment) -> Result<(), String> {
        if let Some(ref label) = fragment.label {
            self.label = label.clone();
        }
        if let Some(ref description) = fragment.description {
            self.description = description.clone();
        }
        if let Some(ref unit) = fragment.unit {
            self.unit = unit.clone();
        }
        if let Some(ty) = fragment.setting_type {
            self.setting_type = Some(ty);
        }
        if let Some(ref options) = fragment.options {
            self.options = options.clone();
        }
        if let Some(ref default) = fragment.default_value {
            // Without a declared type, keep the type the current default implies
            let ty = self
                .setting_type
                .or_else(|| self.default_value.as_ref().map(SettingType::infer));
            let default = match ty {
                Some(ty) => default
                    .coerce(ty)
                    .map_err(|e| format!("setting '{}': default {}", self.key, e))?,
                None => default.clone(),
            };
            self.default_value = Some(default);
        }
        if let Some(min) = fragment.min_value {
            self.bounds.min_value = Some(min);
        }
        if let Some(max) = fragment.max_value {
            self.bounds.max_value = Some(max);
        }
        if let Some(min) = fragment.min_value_warning {
            self.bounds.min_value_warning = Some(min);
        }
        if let Some(max) = fragment.max_value_warning {
            self.bounds.max_value_warning = Some(max);
        }
        if let Some(visible) = fragment.visible {
            self.visible = visible;
        }

        for (child_key, child_fragment) in &fragment.children {
            let index = match self.children.iter().position(|c| &c.key == child_key) {
                Some(index) => index,
                None => {
                    let child = Setting::new(child_key.clone())
                        .with_category(self.category.clone())
                        .with_catalog(self.catalog.clone());
                    self.children.push(child);
                    self.children.len() - 1
                }
            };
            self.children[index].apply(child_fragment)?;
        }

        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Effective type: declared, else inferred from the default, else string.
    pub fn setting_type(&self) -> SettingType {
        self.setting_type
            .or_else(|| self.default_value.as_ref().map(SettingType::infer))
            .unwrap_or_default()
    }

    pub fn default_value(&self) -> Option<&SettingValue> {
        self.default_value.as_ref()
    }

    /// Current value, falling back to the default.
    pub fn value(&self) -> Option<&SettingValue> {
        self.value.as_ref().or(self.default_value.as_ref())
    }

    /// Check if the current value equals the default.
    pub fn is_default(&self) -> bool {
        self.value() == self.default_value.as_ref()
    }

    pub fn bounds(&self) -> &ValueBounds {
        &self.bounds
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn children(&self) -> &[Setting] {
        &self.children
    }

    /// Set the current value.
    ///
    /// The value is coerced to the setting's type first. Returns whether the
    /// effective value changed.
    pub(crate) fn set_value(&mut self, value: SettingValue) -> Result<bool, Error> {
        let ty = self.setting_type();
        let value = value.coerce(ty).map_err(|e| match e {
            Error::InvalidValue(reason) => Error::InvalidValue(format!("{}: {}", self.key, reason)),
            other => other,
        })?;

        if ty == SettingType::Enum && !self.options.is_empty() {
            let allowed = value
                .as_str()
                .is_some_and(|v| self.options.iter().any(|(k, _)| k == v));
            if !allowed {
                return Err(Error::InvalidValue(format!(
                    "{}: '{}' is not one of [{}]",
                    self.key,
                    value,
                    self.options
                        .iter()
                        .map(|(k, _)| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        if self.value() == Some(&value) {
            return Ok(false);
        }
        self.value = Some(value);
        Ok(true)
    }

    /// Drop the current value so the setting follows its default again.
    ///
    /// Returns whether the effective value changed.
    pub(crate) fn reset(&mut self) -> bool {
        let changed = self.value.is_some() && self.value != self.default_value;
        self.value = None;
        changed
    }

    /// Validate the current value against the setting's bounds.
    pub fn validate(&self) -> ValidationResult {
        if !self.setting_type().is_numeric() {
            return ValidationResult::Ok;
        }
        self.value()
            .map(|v| self.bounds.validate(v))
            .unwrap_or_default()
    }

    /// Find this setting or one of its descendants by key.
    pub fn find(&self, key: &str) -> Option<&Setting> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    pub(crate) fn find_mut(&mut self, key: &str) -> Option<&mut Setting> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(key))
    }

    /// Append this setting and its descendants in pre-order.
    pub fn flatten<'a>(&'a self, out: &mut Vec<&'a Setting>) {
        out.push(self);
        for child in &self.children {
            child.flatten(out);
        }
    }

    /// Visit this setting and its descendants in pre-order.
    pub(crate) fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Setting)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer_height() -> Setting {
        let fragment = SettingFragment::from_json(
            "layer_height",
            &json!({
                "label": "Layer Height",
                "unit": "mm",
                "type": "float",
                "default": 0.2,
                "min_value": 0.05,
                "max_value": 0.3
            }),
        )
        .unwrap();
        let mut setting = Setting::new("layer_height").with_category(Some("quality".to_string()));
        setting.apply(&fragment).unwrap();
        setting
    }

    #[test]
    fn test_new_setting_is_blank() {
        let setting = Setting::new("speed");
        assert_eq!(setting.key(), "speed");
        assert_eq!(setting.default_value(), None);
        assert_eq!(setting.value(), None);
        assert!(setting.is_visible());
        assert_eq!(setting.category(), None);
        assert_eq!(setting.setting_type(), SettingType::String);
    }

    #[test]
    fn test_apply_fragment() {
        let setting = layer_height();
        assert_eq!(setting.label(), "Layer Height");
        assert_eq!(setting.unit(), "mm");
        assert_eq!(setting.setting_type(), SettingType::Float);
        assert_eq!(setting.default_value(), Some(&SettingValue::Float(0.2)));
        assert_eq!(setting.value(), Some(&SettingValue::Float(0.2)));
        assert_eq!(setting.bounds().min_value, Some(0.05));
        assert_eq!(setting.category(), Some("quality"));
    }

    #[test]
    fn test_apply_partial_fragment_keeps_other_fields() {
        let mut setting = layer_height();
        let fragment = SettingFragment::from_json("layer_height", &json!({"default": 0.15})).unwrap();
        setting.apply(&fragment).unwrap();

        assert_eq!(setting.default_value(), Some(&SettingValue::Float(0.15)));
        assert_eq!(setting.label(), "Layer Height");
        assert_eq!(setting.bounds().max_value, Some(0.3));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut setting = layer_height();
        let before = setting.clone();
        let fragment = SettingFragment::from_json(
            "layer_height",
            &json!({"label": "Layer Height", "default": 0.2}),
        )
        .unwrap();
        setting.apply(&fragment).unwrap();
        setting.apply(&fragment).unwrap();
        assert_eq!(setting, before);
    }

    #[test]
    fn test_default_is_coerced_to_declared_type() {
        let mut setting = Setting::new("wall_count");
        let fragment =
            SettingFragment::from_json("wall_count", &json!({"type": "int", "default": "3"})).unwrap();
        setting.apply(&fragment).unwrap();
        assert_eq!(setting.default_value(), Some(&SettingValue::Int(3)));
    }

    #[test]
    fn test_type_is_inferred_from_default() {
        let mut setting = Setting::new("support_enable");
        let fragment =
            SettingFragment::from_json("support_enable", &json!({"default": false})).unwrap();
        setting.apply(&fragment).unwrap();
        assert_eq!(setting.setting_type(), SettingType::Boolean);
    }

    #[test]
    fn test_fragment_rejects_bad_shapes() {
        assert!(SettingFragment::from_json("a", &json!(3)).is_err());
        assert!(SettingFragment::from_json("a", &json!({"label": 3})).is_err());
        assert!(SettingFragment::from_json("a", &json!({"type": "matrix"})).is_err());
        assert!(SettingFragment::from_json("a", &json!({"default": [1, 2]})).is_err());
        assert!(SettingFragment::from_json("a", &json!({"visible": "yes"})).is_err());
        assert!(SettingFragment::from_json("a", &json!({"max_value": true})).is_err());
    }

    #[test]
    fn test_fragment_ignores_unknown_fields() {
        let fragment =
            SettingFragment::from_json("a", &json!({"label": "A", "inherit_function": "x"})).unwrap();
        assert_eq!(fragment.label, Some("A".to_string()));
    }

    #[test]
    fn test_set_value_and_reset() {
        let mut setting = layer_height();
        assert!(setting.set_value(SettingValue::Float(0.1)).unwrap());
        assert_eq!(setting.value(), Some(&SettingValue::Float(0.1)));
        assert!(!setting.is_default());

        // Same value again is not a change
        assert!(!setting.set_value(SettingValue::from("0.1")).unwrap());

        assert!(setting.reset());
        assert!(setting.is_default());
        assert!(!setting.reset());
    }

    #[test]
    fn test_set_value_rejects_wrong_type() {
        let mut setting = layer_height();
        let err = setting.set_value(SettingValue::from("thick")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
        assert!(err.to_string().contains("layer_height"));
    }

    #[test]
    fn test_enum_options() {
        let fragment = SettingFragment::from_json(
            "adhesion_type",
            &json!({
                "type": "enum",
                "default": "skirt",
                "options": {"skirt": "Skirt", "brim": "Brim", "raft": "Raft"}
            }),
        )
        .unwrap();
        let mut setting = Setting::new("adhesion_type");
        setting.apply(&fragment).unwrap();

        let keys: Vec<&str> = setting.options().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["skirt", "brim", "raft"]);

        assert!(setting.set_value(SettingValue::from("brim")).unwrap());
        assert!(setting.set_value(SettingValue::from("glue")).is_err());
        assert_eq!(setting.value(), Some(&SettingValue::from("brim")));
    }

    #[test]
    fn test_validate_current_value() {
        let mut setting = layer_height();
        assert_eq!(setting.validate(), ValidationResult::Ok);
        setting.set_value(SettingValue::Float(0.5)).unwrap();
        assert_eq!(setting.validate(), ValidationResult::MaxValueError);
        setting.set_value(SettingValue::Float(0.01)).unwrap();
        assert_eq!(setting.validate(), ValidationResult::MinValueError);
    }

    #[test]
    fn test_children_are_created_and_found() {
        let fragment = SettingFragment::from_json(
            "infill_sparse_density",
            &json!({
                "type": "float",
                "default": 20,
                "children": {
                    "infill_line_distance": {"type": "float", "default": 2.0}
                }
            }),
        )
        .unwrap();
        let mut setting =
            Setting::new("infill_sparse_density").with_category(Some("infill".to_string()));
        setting.apply(&fragment).unwrap();

        let child = setting.find("infill_line_distance").unwrap();
        assert_eq!(child.category(), Some("infill"));
        assert_eq!(child.default_value(), Some(&SettingValue::Float(2.0)));

        let mut flat = Vec::new();
        setting.flatten(&mut flat);
        let keys: Vec<&str> = flat.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["infill_sparse_density", "infill_line_distance"]);

        // Applying again reuses the existing child
        setting.apply(&fragment).unwrap();
        assert_eq!(setting.children().len(), 1);
    }
}
