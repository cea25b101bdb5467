//! Setting categories.

use crate::settings::setting::{Setting, SettingFragment};
use serde_json::Value;

/// Parsed category fragment from a definition file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFragment {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub visible: Option<bool>,
    /// Setting fragments in declaration order.
    pub settings: Vec<(String, SettingFragment)>,
}

impl CategoryFragment {
    /// Parse a fragment from the JSON object stored under a category key.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("category '{}' must be an object", key))?;

        let mut fragment = Self::default();

        for (field, slot) in [("label", &mut fragment.label), ("icon", &mut fragment.icon)] {
            match obj.get(field) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => *slot = Some(s.clone()),
                Some(_) => return Err(format!("category '{}': '{}' must be a string", key, field)),
            }
        }

        if let Some(visible) = obj.get("visible") {
            fragment.visible = Some(
                visible
                    .as_bool()
                    .ok_or_else(|| format!("category '{}': 'visible' must be a boolean", key))?,
            );
        }

        if let Some(settings) = obj.get("settings") {
            let settings = settings
                .as_object()
                .ok_or_else(|| format!("category '{}': 'settings' must be an object", key))?;
            for (setting_key, setting) in settings {
                fragment.settings.push((
                    setting_key.clone(),
                    SettingFragment::from_json(setting_key, setting)?,
                ));
            }
        }

        Ok(fragment)
    }
}

/// A named, ordered group of settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsCategory {
    key: String,
    label: String,
    icon: Option<String>,
    visible: bool,
    catalog: Option<String>,
    settings: Vec<Setting>,
}

impl SettingsCategory {
    pub fn new(key: impl Into<String>, catalog: Option<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            icon: None,
            visible: true,
            catalog,
            settings: Vec::new(),
        }
    }

    /// Apply a definition fragment.
    ///
    /// Settings are found by key among this category's top-level settings or
    /// created at the end of the list.
    pub fn apply(&mut self, fragment: &CategoryFragment) -> Result<(), String> {
        if let Some(ref label) = fragment.label {
            self.label = label.clone();
        }
        if let Some(ref icon) = fragment.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(visible) = fragment.visible {
            self.visible = visible;
        }

        for (key, setting_fragment) in &fragment.settings {
            let index = match self.settings.iter().position(|s| s.key() == key) {
                Some(index) => index,
                None => {
                    self.add_setting(Setting::new(key.clone()));
                    self.settings.len() - 1
                }
            };
            self.settings[index].apply(setting_fragment)?;
        }

        Ok(())
    }

    /// Add a setting, claiming it for this category.
    pub fn add_setting(&mut self, setting: Setting) {
        let setting = setting
            .with_category(Some(self.key.clone()))
            .with_catalog(self.catalog.clone());
        self.settings.push(setting);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    /// Top-level settings in declaration order.
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// All settings including nested children, pre-order.
    pub fn all_settings(&self) -> Vec<&Setting> {
        let mut out = Vec::new();
        for setting in &self.settings {
            setting.flatten(&mut out);
        }
        out
    }

    /// Find a setting (at any depth) by key.
    pub fn setting(&self, key: &str) -> Option<&Setting> {
        self.settings.iter().find_map(|s| s.find(key))
    }

    pub(crate) fn setting_mut(&mut self, key: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find_map(|s| s.find_mut(key))
    }

    pub(crate) fn visit_settings_mut(&mut self, f: &mut dyn FnMut(&mut Setting)) {
        for setting in &mut self.settings {
            setting.visit_mut(f);
        }
    }
}
