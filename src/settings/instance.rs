//! Machine instance files.
//!
//! An instance names a machine and points at the definition it was created
//! from. Setting values are not stored here; they live in profiles.
//!
//! ```toml
//! [General]
//! name = "My Printer"
//! json_file = "ultimaker2.json"
//! version = 1
//! ```

use crate::resources::{ResourceLocator, ResourceScope};
use crate::settings::machine::MachineSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The only instance schema version this crate reads.
pub const INSTANCE_VERSION: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct InstanceFile {
    #[serde(rename = "General")]
    general: GeneralSection,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneralSection {
    name: String,
    json_file: String,
    version: i64,
}

impl MachineSettings {
    /// Load an instance file and the definition it refers to.
    ///
    /// The definition is resolved through `resources` in the machine
    /// definitions scope.
    pub fn load_instance(
        &mut self,
        path: impl AsRef<Path>,
        resources: &dyn ResourceLocator,
    ) -> Result<()> {
        let path = path.as_ref();
        let invalid = |reason: String| Error::InvalidDefinition {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| invalid(format!("invalid TOML: {}", e.message())))?;
        let general = table
            .get("General")
            .and_then(toml::Value::as_table)
            .ok_or_else(|| invalid("missing [General] section".to_string()))?;

        let version = general.get("version").and_then(|v| match v {
            toml::Value::Integer(i) => Some(*i),
            toml::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        if version != Some(INSTANCE_VERSION) {
            return Err(Error::InvalidVersion {
                path: path.to_path_buf(),
                expected: INSTANCE_VERSION,
                found: general
                    .get("version")
                    .map_or_else(|| "nothing".to_string(), toml::Value::to_string),
            });
        }

        let field = |key: &str| {
            general
                .get(key)
                .and_then(toml::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("missing required field '{}'", key)))
        };
        let name = field("name")?;
        let json_file = field("json_file")?;

        let definition = resources
            .resolve(ResourceScope::MachineDefinitions, &json_file)
            .map_err(|e| match e {
                Error::NotFound(what) => invalid(format!("definition not found: {}", what)),
                other => other,
            })?;

        self.load_definition(&definition)?;
        self.name = name;

        tracing::info!(path = %path.display(), name = %self.name, "loaded machine instance");
        Ok(())
    }

    /// Save the instance file: name, definition file name and version.
    pub fn save_instance(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_file = self
            .definition_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file = InstanceFile {
            general: GeneralSection {
                name: self.name.clone(),
                json_file,
                version: INSTANCE_VERSION,
            },
        };
        let content = toml::to_string(&file)
            .map_err(|e| Error::Other(format!("Failed to serialize instance: {}", e)))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
