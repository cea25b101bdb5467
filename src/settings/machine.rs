//! The machine settings tree: machine-level settings, categories, the active
//! profile binding and change notification.

use crate::Result;
use crate::settings::category::SettingsCategory;
use crate::settings::events::{
    EventCallback, Listeners, SettingChangedEvent, SettingsEvent, SubscriptionId,
};
use crate::settings::profile::SharedProfile;
use crate::settings::setting::Setting;
use crate::settings::validation::ValidationResult;
use crate::settings::value::SettingValue;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Display name used until an instance file names the machine.
pub const DEFAULT_MACHINE_NAME: &str = "Unknown Machine";

/// Icon used when a definition does not name one.
pub const DEFAULT_ICON: &str = "unknown.png";

/// Filter for [`MachineSettings::all_settings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsQuery {
    /// Include machine-level (category-less) settings first.
    pub include_machine: bool,
    /// Only return visible settings.
    pub visible_only: bool,
}

impl SettingsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_machine(mut self, include: bool) -> Self {
        self.include_machine = include;
        self
    }

    pub fn visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }
}

/// A setting whose current value does not validate cleanly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub key: String,
    pub result: ValidationResult,
    pub value: Option<SettingValue>,
}

/// The active profile together with its recording link.
///
/// While `recording` is set, every value change on the machine is written
/// back into the profile. The link is cut while a profile is being applied.
#[derive(Debug, Clone)]
pub struct ProfileBinding {
    profile: SharedProfile,
    recording: bool,
}

impl ProfileBinding {
    pub fn profile(&self) -> &SharedProfile {
        &self.profile
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

/// Settings tree for one machine.
///
/// A profile may be active on several machines at once; nothing prevents
/// that, but changes on either machine are then recorded into the same
/// profile. Keeping one active binding per profile is the caller's job.
#[derive(Debug)]
pub struct MachineSettings {
    pub(crate) type_id: String,
    pub(crate) type_name: String,
    pub(crate) type_version: String,
    pub(crate) name: String,
    pub(crate) icon: String,
    pub(crate) platform_mesh: Option<String>,
    pub(crate) platform_texture: Option<String>,
    pub(crate) definition_path: Option<PathBuf>,
    /// Display catalog (basename of the definition file).
    pub(crate) catalog: Option<String>,
    pub(crate) categories: Vec<SettingsCategory>,
    /// Settings without a category. These are fixed by the definition and
    /// not meant to be edited by users.
    pub(crate) machine_settings: Vec<Setting>,
    active_profile: Option<ProfileBinding>,
    listeners: Listeners,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineSettings {
    pub fn new() -> Self {
        Self {
            type_id: "unknown".to_string(),
            type_name: "Unknown".to_string(),
            type_version: "unknown".to_string(),
            name: DEFAULT_MACHINE_NAME.to_string(),
            icon: DEFAULT_ICON.to_string(),
            platform_mesh: None,
            platform_texture: None,
            definition_path: None,
            catalog: None,
            categories: Vec::new(),
            machine_settings: Vec::new(),
            active_profile: None,
            listeners: Listeners::default(),
        }
    }

    // ==================== Metadata ====================

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_version(&self) -> &str {
        &self.type_version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn platform_mesh(&self) -> Option<&str> {
        self.platform_mesh.as_deref()
    }

    pub fn platform_texture(&self) -> Option<&str> {
        self.platform_texture.as_deref()
    }

    /// Path of the root definition file this machine was loaded from.
    pub fn definition_path(&self) -> Option<&Path> {
        self.definition_path.as_deref()
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    // ==================== Tree structure ====================

    /// Add a category. Fails if a category with the same key exists.
    pub fn add_settings_category(&mut self, category: SettingsCategory) -> Result<()> {
        if self.category(category.key()).is_some() {
            return Err(crate::Error::InvalidInput(format!(
                "duplicate category key '{}'",
                category.key()
            )));
        }
        self.categories.push(category);
        Ok(())
    }

    /// Add a machine-level setting. Fails if the key is already in use.
    pub fn add_setting(&mut self, setting: Setting) -> Result<()> {
        if self.setting(setting.key()).is_some() {
            return Err(crate::Error::InvalidInput(format!(
                "duplicate setting key '{}'",
                setting.key()
            )));
        }
        self.machine_settings.push(setting.with_category(None));
        Ok(())
    }

    pub fn category(&self, key: &str) -> Option<&SettingsCategory> {
        self.categories.iter().find(|c| c.key() == key)
    }

    pub fn categories(&self) -> &[SettingsCategory] {
        &self.categories
    }

    pub fn machine_settings(&self) -> &[Setting] {
        &self.machine_settings
    }

    // ==================== Lookup & query ====================

    /// Find a setting by key anywhere in the tree.
    ///
    /// Categories are searched before machine-level settings; keys are unique
    /// after a successful load so the order is not observable.
    pub fn setting(&self, key: &str) -> Option<&Setting> {
        self.categories
            .iter()
            .find_map(|c| c.setting(key))
            .or_else(|| self.machine_settings.iter().find_map(|s| s.find(key)))
    }

    /// Mutable lookup for structural layering. Value changes go through
    /// [`set_setting_value`](Self::set_setting_value) so they are announced.
    pub(crate) fn setting_mut(&mut self, key: &str) -> Option<&mut Setting> {
        let in_category = self.categories.iter().position(|c| c.setting(key).is_some());
        match in_category {
            Some(index) => self.categories[index].setting_mut(key),
            None => self.machine_settings.iter_mut().find_map(|s| s.find_mut(key)),
        }
    }

    /// All settings in declaration order.
    ///
    /// Machine-level settings come first when requested, followed by each
    /// category's settings with children directly after their parent.
    pub fn all_settings(&self, query: SettingsQuery) -> Vec<&Setting> {
        let mut out = Vec::new();
        if query.include_machine {
            for setting in &self.machine_settings {
                setting.flatten(&mut out);
            }
        }
        for category in &self.categories {
            out.extend(category.all_settings());
        }
        if query.visible_only {
            out.retain(|s| s.is_visible());
        }
        out
    }

    /// Current value of a setting, `None` for unknown keys.
    pub fn setting_value(&self, key: &str) -> Option<&SettingValue> {
        self.setting(key).and_then(|s| s.value())
    }

    /// Check whether any categorized setting is in an error state.
    pub fn has_error_value(&self) -> bool {
        self.all_settings(SettingsQuery::default())
            .iter()
            .any(|s| s.validate().is_error())
    }

    /// Check whether any categorized setting is in a warning state.
    pub fn has_warning_value(&self) -> bool {
        self.all_settings(SettingsQuery::default())
            .iter()
            .any(|s| s.validate().is_warning())
    }

    /// Every categorized setting that does not validate cleanly.
    pub fn validation_report(&self) -> Vec<ValidationIssue> {
        self.all_settings(SettingsQuery::default())
            .into_iter()
            .filter_map(|s| {
                let result = s.validate();
                (result != ValidationResult::Ok).then(|| ValidationIssue {
                    key: s.key().to_string(),
                    result,
                    value: s.value().cloned(),
                })
            })
            .collect()
    }

    // ==================== Value changes ====================

    /// Set a setting's value by key.
    ///
    /// Unknown keys are ignored (`Ok(false)`). A change is recorded into the
    /// active profile, then announced to listeners.
    pub fn set_setting_value(&mut self, key: &str, value: SettingValue) -> Result<bool> {
        let (value, is_default) = {
            let Some(setting) = self.setting_mut(key) else {
                return Ok(false);
            };
            if !setting.set_value(value)? {
                return Ok(false);
            }
            (setting.value().cloned(), setting.is_default())
        };

        self.setting_changed(key, value, is_default);
        Ok(true)
    }

    /// Reset a setting to its default by key. Returns whether it changed.
    pub fn reset_setting_value(&mut self, key: &str) -> bool {
        let value = {
            let Some(setting) = self.setting_mut(key) else {
                return false;
            };
            if !setting.reset() {
                return false;
            }
            setting.value().cloned()
        };

        self.setting_changed(key, value, true);
        true
    }

    fn setting_changed(&mut self, key: &str, value: Option<SettingValue>, is_default: bool) {
        if let Some(binding) = self.active_profile.as_ref().filter(|b| b.recording) {
            let mut profile = binding.profile.borrow_mut();
            match (&value, is_default) {
                (Some(v), false) => profile.set_setting_value(key, v.clone()),
                _ => {
                    profile.remove_setting_value(key);
                }
            }
        }

        self.listeners
            .emit(&SettingsEvent::SettingChanged(SettingChangedEvent {
                key: key.to_string(),
                value,
            }));
    }

    // ==================== Profiles ====================

    pub fn active_profile(&self) -> Option<&SharedProfile> {
        self.active_profile.as_ref().map(|b| &b.profile)
    }

    pub fn profile_binding(&self) -> Option<&ProfileBinding> {
        self.active_profile.as_ref()
    }

    /// Activate a profile, or deactivate with `None`.
    ///
    /// Every setting is reset to its default, then the profile's stored values
    /// are applied. Stored keys unknown to this machine, and stored values the
    /// setting cannot accept, are skipped. Listeners see one `SettingChanged`
    /// per effective change; the profile itself is not written to while it is
    /// being applied.
    pub fn set_active_profile(&mut self, profile: Option<SharedProfile>) {
        if let Some(binding) = self.active_profile.as_mut() {
            binding.recording = false;
        }

        self.reset_all_settings();

        if let Some(ref profile) = profile {
            let stored: Vec<(String, SettingValue)> = profile
                .borrow()
                .changed_settings()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            for (key, value) in stored {
                self.apply_profile_value(&key, value);
            }

            tracing::debug!(profile = %profile.borrow().name(), "activated profile");
        }

        self.active_profile = profile.map(|profile| ProfileBinding {
            profile,
            recording: true,
        });
    }

    fn reset_all_settings(&mut self) {
        let listeners = &mut self.listeners;
        let mut on_setting = |setting: &mut Setting| {
            if setting.reset() {
                listeners.emit(&SettingsEvent::SettingChanged(SettingChangedEvent {
                    key: setting.key().to_string(),
                    value: setting.value().cloned(),
                }));
            }
        };

        for setting in &mut self.machine_settings {
            setting.visit_mut(&mut on_setting);
        }
        for category in &mut self.categories {
            category.visit_settings_mut(&mut on_setting);
        }
    }

    fn apply_profile_value(&mut self, key: &str, value: SettingValue) {
        let changed = match self.setting_mut(key) {
            None => {
                tracing::debug!(key, "profile value for unknown setting skipped");
                return;
            }
            Some(setting) => match setting.set_value(value) {
                Ok(true) => setting.value().cloned(),
                Ok(false) => return,
                Err(e) => {
                    tracing::warn!(key, error = %e, "profile value rejected");
                    return;
                }
            },
        };

        self.listeners
            .emit(&SettingsEvent::SettingChanged(SettingChangedEvent {
                key: key.to_string(),
                value: changed,
            }));
    }

    // ==================== Events ====================

    /// Register a listener for settings events.
    pub fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub(crate) fn emit(&mut self, event: &SettingsEvent) {
        self.listeners.emit(event);
    }

    /// Check whether `profile` is the profile currently active here.
    pub fn is_active_profile(&self, profile: &SharedProfile) -> bool {
        self.active_profile()
            .is_some_and(|active| Rc::ptr_eq(active, profile))
    }
}
