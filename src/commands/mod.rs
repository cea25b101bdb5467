//! Command implementations for the mdef CLI.
//!
//! Each command loads what it needs, does its work through the library API
//! and returns a result type implementing [`Output`].

use crate::resources::{ResourceLocator, ResourcePaths, ResourceScope};
use crate::settings::{
    MachineSettings, Profile, Setting, SettingValue, SettingsQuery, SharedProfile,
    ValidationIssue, ValidationResult,
};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Resolve a name given on the command line.
///
/// Existing files are used as-is; anything else is looked up in `scope`.
fn resolve(resources: &ResourcePaths, scope: ResourceScope, name: &str) -> Result<PathBuf> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }
    resources.resolve(scope, name)
}

fn open_machine(resources: &ResourcePaths, definition: &str) -> Result<MachineSettings> {
    let path = resolve(resources, ResourceScope::MachineDefinitions, definition)?;
    let mut machine = MachineSettings::new();
    machine.load_definition(&path)?;
    Ok(machine)
}

fn open_profile(resources: &ResourcePaths, profile: &str) -> Result<Profile> {
    let path = resolve(resources, ResourceScope::Profiles, profile)?;
    Profile::load(&path)
}

/// Load a machine and activate a profile on it when one is given.
fn open_machine_with_profile(
    resources: &ResourcePaths,
    definition: &str,
    profile: Option<&str>,
) -> Result<MachineSettings> {
    let mut machine = open_machine(resources, definition)?;
    if let Some(profile) = profile {
        let profile = open_profile(resources, profile)?;
        machine.set_active_profile(Some(profile.into_shared()));
    }
    Ok(machine)
}

fn require_setting<'a>(machine: &'a MachineSettings, key: &str) -> Result<&'a Setting> {
    machine
        .setting(key)
        .ok_or_else(|| Error::NotFound(format!("setting '{}'", key)))
}

// === Show ===

#[derive(Serialize)]
pub struct CategorySummary {
    pub key: String,
    pub label: String,
    pub settings: usize,
    pub visible: bool,
}

#[derive(Serialize)]
pub struct MachineSummary {
    pub id: String,
    pub type_name: String,
    pub version: String,
    pub name: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_mesh: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_texture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<PathBuf>,
    pub machine_settings: usize,
    pub categories: Vec<CategorySummary>,
}

impl MachineSummary {
    fn from_machine(machine: &MachineSettings) -> Self {
        Self {
            id: machine.type_id().to_string(),
            type_name: machine.type_name().to_string(),
            version: machine.type_version().to_string(),
            name: machine.name().to_string(),
            icon: machine.icon().to_string(),
            platform_mesh: machine.platform_mesh().map(str::to_string),
            platform_texture: machine.platform_texture().map(str::to_string),
            definition: machine.definition_path().map(Path::to_path_buf),
            machine_settings: machine
                .machine_settings()
                .iter()
                .map(|s| {
                    let mut flat = Vec::new();
                    s.flatten(&mut flat);
                    flat.len()
                })
                .sum(),
            categories: machine
                .categories()
                .iter()
                .map(|c| CategorySummary {
                    key: c.key().to_string(),
                    label: c.label().to_string(),
                    settings: c.all_settings().len(),
                    visible: c.is_visible(),
                })
                .collect(),
        }
    }
}

impl Output for MachineSummary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} ({})", self.type_name, self.id),
            format!("  Name: {}", self.name),
            format!("  Version: {}", self.version),
            format!("  Icon: {}", self.icon),
        ];
        if let Some(ref mesh) = self.platform_mesh {
            lines.push(format!("  Platform: {}", mesh));
        }
        if let Some(ref texture) = self.platform_texture {
            lines.push(format!("  Platform texture: {}", texture));
        }
        if let Some(ref definition) = self.definition {
            lines.push(format!("  Definition: {}", definition.display()));
        }
        lines.push(format!("  Machine settings: {}", self.machine_settings));
        lines.push(format!("  Categories ({}):", self.categories.len()));
        for category in &self.categories {
            let hidden = if category.visible { "" } else { " [hidden]" };
            lines.push(format!(
                "    {} - {} ({} settings){}",
                category.key, category.label, category.settings, hidden
            ));
        }
        lines.join("\n")
    }
}

/// Show a definition's metadata and categories.
pub fn show(resources: &ResourcePaths, definition: &str) -> Result<MachineSummary> {
    let machine = open_machine(resources, definition)?;
    Ok(MachineSummary::from_machine(&machine))
}

// === List / Get ===

#[derive(Serialize)]
pub struct SettingInfo {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub setting_type: String,
    pub value: Option<SettingValue>,
    pub default: Option<SettingValue>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    pub visible: bool,
    pub validation: ValidationResult,
}

impl SettingInfo {
    fn from_setting(setting: &Setting) -> Self {
        Self {
            key: setting.key().to_string(),
            label: setting.label().to_string(),
            category: setting.category().map(str::to_string),
            setting_type: setting.setting_type().to_string(),
            value: setting.value().cloned(),
            default: setting.default_value().cloned(),
            unit: setting.unit().to_string(),
            description: setting.description().to_string(),
            options: setting.options().iter().map(|(k, _)| k.clone()).collect(),
            min_value: setting.bounds().min_value,
            max_value: setting.bounds().max_value,
            visible: setting.is_visible(),
            validation: setting.validate(),
        }
    }

    fn human_value(value: &Option<SettingValue>) -> String {
        value
            .as_ref()
            .map_or_else(|| "-".to_string(), |v| v.to_string())
    }
}

impl Output for SettingInfo {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("{} ({})", self.key, self.setting_type)];
        if !self.label.is_empty() {
            lines.push(format!("  Label: {}", self.label));
        }
        if let Some(ref category) = self.category {
            lines.push(format!("  Category: {}", category));
        }
        let unit = if self.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", self.unit)
        };
        lines.push(format!("  Value: {}{}", Self::human_value(&self.value), unit));
        lines.push(format!("  Default: {}{}", Self::human_value(&self.default), unit));
        if !self.options.is_empty() {
            lines.push(format!("  Options: {}", self.options.join(", ")));
        }
        if self.min_value.is_some() || self.max_value.is_some() {
            let bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |v| v.to_string());
            lines.push(format!(
                "  Range: {} .. {}",
                bound(self.min_value),
                bound(self.max_value)
            ));
        }
        if !self.description.is_empty() {
            lines.push(format!("  Description: {}", self.description));
        }
        if !self.visible {
            lines.push("  Hidden".to_string());
        }
        if self.validation != ValidationResult::Ok {
            lines.push(format!("  Validation: {}", self.validation));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct SettingsList {
    pub settings: Vec<SettingInfo>,
    pub count: usize,
}

impl Output for SettingsList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.settings.is_empty() {
            return "No settings found.".to_string();
        }

        let mut lines = vec![format!("{} setting(s):", self.count)];
        for setting in &self.settings {
            let marker = match setting.validation {
                ValidationResult::Ok => "",
                r if r.is_error() => " [error]",
                _ => " [warning]",
            };
            lines.push(format!(
                "  {} = {} ({}){}",
                setting.key,
                SettingInfo::human_value(&setting.value),
                setting.setting_type,
                marker
            ));
        }
        lines.join("\n")
    }
}

/// Filters for [`list`].
#[derive(Debug, Default)]
pub struct ListOptions<'a> {
    pub category: Option<&'a str>,
    pub include_machine: bool,
    pub include_hidden: bool,
    pub profile: Option<&'a str>,
}

/// List settings of a definition.
pub fn list(
    resources: &ResourcePaths,
    definition: &str,
    options: ListOptions<'_>,
) -> Result<SettingsList> {
    let machine = open_machine_with_profile(resources, definition, options.profile)?;

    let settings: Vec<&Setting> = match options.category {
        Some(key) => {
            let category = machine
                .category(key)
                .ok_or_else(|| Error::NotFound(format!("category '{}'", key)))?;
            category
                .all_settings()
                .into_iter()
                .filter(|s| options.include_hidden || s.is_visible())
                .collect()
        }
        None => machine.all_settings(
            SettingsQuery::new()
                .include_machine(options.include_machine)
                .visible_only(!options.include_hidden),
        ),
    };

    let settings: Vec<SettingInfo> = settings.into_iter().map(SettingInfo::from_setting).collect();
    Ok(SettingsList {
        count: settings.len(),
        settings,
    })
}

/// Show one setting.
pub fn get(
    resources: &ResourcePaths,
    definition: &str,
    key: &str,
    profile: Option<&str>,
) -> Result<SettingInfo> {
    let machine = open_machine_with_profile(resources, definition, profile)?;
    let setting = require_setting(&machine, key)?;
    Ok(SettingInfo::from_setting(setting))
}

// === Validate ===

#[derive(Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: usize,
    pub warnings: usize,
    pub issues: Vec<ValidationIssue>,
}

impl Output for ValidationReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.issues.is_empty() {
            return "All settings are within range.".to_string();
        }

        let mut lines = vec![format!(
            "{} error(s), {} warning(s):",
            self.errors, self.warnings
        )];
        for issue in &self.issues {
            lines.push(format!(
                "  {}: {} ({})",
                issue.key,
                SettingInfo::human_value(&issue.value),
                issue.result
            ));
        }
        lines.join("\n")
    }
}

/// Validate every setting of a definition, optionally under a profile.
pub fn validate(
    resources: &ResourcePaths,
    definition: &str,
    profile: Option<&str>,
) -> Result<ValidationReport> {
    let machine = open_machine_with_profile(resources, definition, profile)?;
    let issues = machine.validation_report();
    let errors = issues.iter().filter(|i| i.result.is_error()).count();

    Ok(ValidationReport {
        valid: !machine.has_error_value(),
        errors,
        warnings: issues.len() - errors,
        issues,
    })
}

// === Instances ===

/// Load an instance file.
pub fn instance_load(resources: &ResourcePaths, instance: &str) -> Result<MachineSummary> {
    let path = resolve(resources, ResourceScope::MachineInstances, instance)?;
    let mut machine = MachineSettings::new();
    machine.load_instance(&path, resources)?;
    Ok(MachineSummary::from_machine(&machine))
}

#[derive(Serialize)]
pub struct InstanceSaved {
    pub path: PathBuf,
    pub name: String,
    pub json_file: String,
}

impl Output for InstanceSaved {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Saved instance '{}' ({}) to {}",
            self.name,
            self.json_file,
            self.path.display()
        )
    }
}

/// Write an instance file for a definition.
pub fn instance_save(
    resources: &ResourcePaths,
    definition: &str,
    output: &Path,
    name: Option<&str>,
) -> Result<InstanceSaved> {
    let mut machine = open_machine(resources, definition)?;
    let name = name.unwrap_or(machine.type_name()).to_string();
    machine.set_name(name.clone());
    machine.save_instance(output)?;

    Ok(InstanceSaved {
        path: output.to_path_buf(),
        name,
        json_file: machine.catalog().unwrap_or_default().to_string(),
    })
}

// === Profiles ===

#[derive(Serialize)]
pub struct ProfileInfo {
    pub name: String,
    pub settings: BTreeMap<String, SettingValue>,
}

impl Output for ProfileInfo {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.settings.is_empty() {
            return format!("Profile '{}' has no changed settings.", self.name);
        }

        let mut lines = vec![format!(
            "Profile '{}' ({} changed setting(s)):",
            self.name,
            self.settings.len()
        )];
        for (key, value) in &self.settings {
            lines.push(format!("  {} = {}", key, value));
        }
        lines.join("\n")
    }
}

/// Show the values stored in a profile.
pub fn profile_show(resources: &ResourcePaths, profile: &str) -> Result<ProfileInfo> {
    let profile = open_profile(resources, profile)?;
    Ok(ProfileInfo {
        name: profile.name().to_string(),
        settings: profile.changed_settings().clone(),
    })
}

#[derive(Serialize)]
pub struct ProfileUpdated {
    pub profile: PathBuf,
    pub key: String,
    /// Effective value after the update.
    pub value: Option<SettingValue>,
    /// Whether the profile now stores a value for the key.
    pub stored: bool,
}

impl Output for ProfileUpdated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let value = SettingInfo::human_value(&self.value);
        if self.stored {
            format!("Set {} = {} in {}", self.key, value, self.profile.display())
        } else {
            format!(
                "{} uses its default ({}) in {}",
                self.key,
                value,
                self.profile.display()
            )
        }
    }
}

/// Load or create the profile at `path` and activate it on a machine.
fn activate_profile_file(
    resources: &ResourcePaths,
    path: &Path,
    definition: &str,
    key: &str,
) -> Result<(MachineSettings, SharedProfile)> {
    let mut machine = open_machine(resources, definition)?;
    require_setting(&machine, key)?;

    let profile = if path.exists() {
        Profile::load(path)?
    } else {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Profile::new(name)
    };

    let shared = profile.into_shared();
    machine.set_active_profile(Some(Rc::clone(&shared)));
    Ok((machine, shared))
}

/// Set a value in a profile, checked against a definition.
pub fn profile_set(
    resources: &ResourcePaths,
    path: &Path,
    definition: &str,
    key: &str,
    value: &str,
) -> Result<ProfileUpdated> {
    let (mut machine, profile) = activate_profile_file(resources, path, definition, key)?;

    machine.set_setting_value(key, SettingValue::from(value))?;
    profile.borrow().save(path)?;

    let stored = profile.borrow().setting_value(key).is_some();
    Ok(ProfileUpdated {
        profile: path.to_path_buf(),
        key: key.to_string(),
        value: machine.setting_value(key).cloned(),
        stored,
    })
}

/// Remove a value from a profile.
pub fn profile_reset(
    resources: &ResourcePaths,
    path: &Path,
    definition: &str,
    key: &str,
) -> Result<ProfileUpdated> {
    let (mut machine, profile) = activate_profile_file(resources, path, definition, key)?;

    machine.reset_setting_value(key);
    // A stored value equal to the default never changes the machine, so it
    // is not recorded away by the reset above.
    profile.borrow_mut().remove_setting_value(key);
    profile.borrow().save(path)?;

    Ok(ProfileUpdated {
        profile: path.to_path_buf(),
        key: key.to_string(),
        value: machine.setting_value(key).cloned(),
        stored: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ResourcePaths) {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("machines")).unwrap();
        std::fs::write(
            temp.path().join("machines/printer.json"),
            json!({
                "id": "printer", "name": "Test Printer", "version": 1,
                "machine_settings": {"machine_width": {"default": 200}},
                "categories": {
                    "quality": {"label": "Quality", "settings": {
                        "layer_height": {
                            "type": "float", "default": 0.2, "unit": "mm",
                            "min_value": 0.05, "max_value": 0.3, "max_value_warning": 0.25
                        },
                        "infill_pattern": {
                            "type": "enum", "default": "grid",
                            "options": {"grid": "Grid", "lines": "Lines"}
                        },
                        "hidden_tweak": {"default": 1, "visible": false}
                    }}
                }
            })
            .to_string(),
        )
        .unwrap();
        let resources = ResourcePaths::new(vec![temp.path().to_path_buf()]);
        (temp, resources)
    }

    #[test]
    fn test_show_summary() {
        let (_temp, resources) = setup();
        let summary = show(&resources, "printer.json").unwrap();

        assert_eq!(summary.id, "printer");
        assert_eq!(summary.machine_settings, 1);
        assert_eq!(summary.categories.len(), 1);
        assert_eq!(summary.categories[0].settings, 3);
        assert!(summary.to_human().contains("Test Printer (printer)"));
        assert!(summary.to_json().contains("\"id\":\"printer\""));
    }

    #[test]
    fn test_list_filters() {
        let (_temp, resources) = setup();

        let visible = list(&resources, "printer.json", ListOptions::default()).unwrap();
        assert_eq!(visible.count, 2);

        let everything = list(
            &resources,
            "printer.json",
            ListOptions {
                include_machine: true,
                include_hidden: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(everything.count, 4);
        assert_eq!(everything.settings[0].key, "machine_width");

        let missing = list(
            &resources,
            "printer.json",
            ListOptions {
                category: Some("travel"),
                ..Default::default()
            },
        );
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_get_unknown_setting() {
        let (_temp, resources) = setup();
        assert!(matches!(
            get(&resources, "printer.json", "nozzle", None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_profile_set_reset_and_validate() {
        let (temp, resources) = setup();
        let path = temp.path().join("draft.kdl");

        let updated = profile_set(&resources, &path, "printer.json", "layer_height", "0.28").unwrap();
        assert!(updated.stored);
        assert_eq!(updated.value, Some(SettingValue::Float(0.28)));

        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.name(), "draft");
        assert_eq!(
            profile.setting_value("layer_height"),
            Some(&SettingValue::Float(0.28))
        );

        let report = validate(&resources, "printer.json", Some(path.to_str().unwrap())).unwrap();
        assert!(report.valid);
        assert_eq!(report.warnings, 1);

        // Back to the default is not stored
        let updated = profile_set(&resources, &path, "printer.json", "layer_height", "0.2").unwrap();
        assert!(!updated.stored);
        assert!(Profile::load(&path).unwrap().is_empty());

        profile_set(&resources, &path, "printer.json", "infill_pattern", "lines").unwrap();
        profile_reset(&resources, &path, "printer.json", "infill_pattern").unwrap();
        assert!(Profile::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_profile_set_rejects_bad_values() {
        let (temp, resources) = setup();
        let path = temp.path().join("draft.kdl");

        assert!(matches!(
            profile_set(&resources, &path, "printer.json", "infill_pattern", "spiral"),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            profile_set(&resources, &path, "printer.json", "layer_height", "thin"),
            Err(Error::InvalidValue(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_instance_save_and_load() {
        let (temp, resources) = setup();
        let output = temp.path().join("instances").join("mine.toml");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();

        let saved = instance_save(&resources, "printer.json", &output, Some("Mine")).unwrap();
        assert_eq!(saved.json_file, "printer.json");

        let summary = instance_load(&resources, "mine.toml").unwrap();
        assert_eq!(summary.name, "Mine");
        assert_eq!(summary.id, "printer");
    }
}
