//! Machine definition files and the layering loader.
//!
//! A definition is a JSON object. Key order is significant: categories and
//! settings appear in the order the file declares them.
//!
//! ```json
//! {
//!     "id": "ultimaker2",
//!     "name": "Ultimaker 2",
//!     "version": 1,
//!     "inherits": "fdmprinter.json",
//!     "machine_settings": { "machine_width": { "default": 230 } },
//!     "categories": { "quality": { "settings": { "layer_height": { "default": 0.2 } } } },
//!     "overrides": { "layer_height": { "default": 0.15 } }
//! }
//! ```

use crate::settings::category::{CategoryFragment, SettingsCategory};
use crate::settings::events::SettingsEvent;
use crate::settings::machine::{MachineSettings, SettingsQuery};
use crate::settings::setting::{Setting, SettingFragment};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The only definition schema version this crate reads.
pub const DEFINITION_VERSION: i64 = 1;

/// A parsed, not yet applied, definition file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionDocument {
    pub id: String,
    pub name: String,
    pub version: i64,
    pub platform: Option<String>,
    pub platform_texture: Option<String>,
    pub icon: Option<String>,
    pub inherits: Option<String>,
    pub machine_settings: Vec<(String, SettingFragment)>,
    pub categories: Vec<(String, CategoryFragment)>,
    pub overrides: Vec<(String, SettingFragment)>,
}

impl DefinitionDocument {
    /// Read and parse a definition file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
        Self::parse(path, &content)
    }

    /// Parse definition text. `path` is only used for error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let root: Value =
            serde_json::from_str(content).map_err(|e| invalid(path, format!("invalid JSON: {}", e)))?;
        let obj = root
            .as_object()
            .ok_or_else(|| invalid(path, "top level must be an object"))?;

        let id = required_string(path, obj, "id")?;
        let name = required_string(path, obj, "name")?;

        let version = match obj.get("version") {
            Some(v) if version_number(v) == Some(DEFINITION_VERSION) => DEFINITION_VERSION,
            other => {
                return Err(Error::InvalidVersion {
                    path: path.to_path_buf(),
                    expected: DEFINITION_VERSION,
                    found: other.map_or_else(|| "nothing".to_string(), Value::to_string),
                });
            }
        };

        let mut doc = DefinitionDocument {
            id,
            name,
            version,
            platform: optional_string(path, obj, "platform")?,
            platform_texture: optional_string(path, obj, "platform_texture")?,
            icon: optional_string(path, obj, "icon")?,
            inherits: optional_string(path, obj, "inherits")?,
            ..Default::default()
        };

        for (key, value) in section(path, obj, "machine_settings")? {
            let fragment = SettingFragment::from_json(key, value).map_err(|e| invalid(path, e))?;
            doc.machine_settings.push((key.clone(), fragment));
        }
        for (key, value) in section(path, obj, "categories")? {
            let fragment = CategoryFragment::from_json(key, value).map_err(|e| invalid(path, e))?;
            doc.categories.push((key.clone(), fragment));
        }
        for (key, value) in section(path, obj, "overrides")? {
            let fragment = SettingFragment::from_json(key, value).map_err(|e| invalid(path, e))?;
            doc.overrides.push((key.clone(), fragment));
        }

        Ok(doc)
    }
}

/// A numeric version, allowing integral floats such as `1.0`.
fn version_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn invalid(path: &Path, reason: impl Into<String>) -> Error {
    Error::InvalidDefinition {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn required_string(path: &Path, obj: &Map<String, Value>, field: &str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(invalid(path, format!("missing required field '{}'", field))),
        Some(other) => Ok(other.to_string()),
    }
}

fn optional_string(path: &Path, obj: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(path, format!("'{}' must be a string", field))),
    }
}

fn section<'a>(
    path: &Path,
    obj: &'a Map<String, Value>,
    field: &str,
) -> Result<impl Iterator<Item = (&'a String, &'a Value)>> {
    let entries = match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.iter()),
        Some(_) => return Err(invalid(path, format!("'{}' must be an object", field))),
    };
    Ok(entries.into_iter().flatten())
}

impl MachineSettings {
    /// Load a definition file, resolving its inheritance chain.
    ///
    /// On failure the machine may be partially populated and should be
    /// discarded.
    pub fn load_definition(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut chain = Vec::new();
        self.load_definition_layer(path.as_ref(), &mut chain)?;

        self.ensure_unique_keys(path.as_ref())?;

        tracing::info!(
            path = %path.as_ref().display(),
            id = %self.type_id,
            settings = self.all_settings(SettingsQuery::new().include_machine(true)).len(),
            "loaded machine definition"
        );
        self.emit(&SettingsEvent::SettingsLoaded);
        Ok(())
    }

    fn load_definition_layer(&mut self, path: &Path, chain: &mut Vec<PathBuf>) -> Result<()> {
        let identity = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if chain.contains(&identity) {
            return Err(invalid(path, "inheritance cycle"));
        }
        chain.push(identity);

        let doc = DefinitionDocument::read(path)?;
        tracing::debug!(path = %path.display(), id = %doc.id, "layering definition");

        self.definition_path = Some(path.to_path_buf());
        self.catalog = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.type_id = doc.id.clone();
        self.type_name = doc.name.clone();
        self.type_version = doc.version.to_string();
        if let Some(ref icon) = doc.icon {
            self.icon = icon.clone();
        }
        if let Some(ref platform) = doc.platform {
            self.platform_mesh = Some(platform.clone());
        }
        if let Some(ref texture) = doc.platform_texture {
            self.platform_texture = Some(texture.clone());
        }

        if let Some(ref inherits) = doc.inherits {
            let parent_path = path.parent().unwrap_or(Path::new("")).join(inherits);
            let mut parent = MachineSettings::new();
            parent.load_definition_layer(&parent_path, chain)?;
            self.categories = parent.categories;
            self.machine_settings = parent.machine_settings;
        }

        self.apply_document(path, &doc)?;

        chain.pop();
        Ok(())
    }

    fn apply_document(&mut self, path: &Path, doc: &DefinitionDocument) -> Result<()> {
        for (key, fragment) in &doc.machine_settings {
            if let Some(setting) = self.setting_mut(key) {
                setting.apply(fragment).map_err(|e| invalid(path, e))?;
            } else {
                let mut setting = Setting::new(key.clone()).with_catalog(self.catalog.clone());
                setting.apply(fragment).map_err(|e| invalid(path, e))?;
                self.machine_settings.push(setting);
            }
        }

        for (key, fragment) in &doc.categories {
            if let Some(category) = self.categories.iter_mut().find(|c| c.key() == key) {
                category.apply(fragment).map_err(|e| invalid(path, e))?;
            } else {
                let mut category = SettingsCategory::new(key.clone(), self.catalog.clone());
                category.apply(fragment).map_err(|e| invalid(path, e))?;
                self.categories.push(category);
            }
        }

        for (key, fragment) in &doc.overrides {
            match self.setting_mut(key) {
                Some(setting) => setting.apply(fragment).map_err(|e| invalid(path, e))?,
                None => tracing::debug!(key = %key, "override of unknown setting skipped"),
            }
        }

        Ok(())
    }

    fn ensure_unique_keys(&self, path: &Path) -> Result<()> {
        let mut seen = HashSet::new();
        for setting in self.all_settings(SettingsQuery::new().include_machine(true)) {
            if !seen.insert(setting.key()) {
                return Err(invalid(
                    path,
                    format!("duplicate setting key '{}'", setting.key()),
                ));
            }
        }

        let mut categories = HashSet::new();
        for category in &self.categories {
            if !categories.insert(category.key()) {
                return Err(invalid(
                    path,
                    format!("duplicate category key '{}'", category.key()),
                ));
            }
        }
        Ok(())
    }
}
