//! Sparse profiles of user-customized setting values.
//!
//! A profile only stores values that differ from a setting's default and is
//! not tied to any one machine: keys a machine does not know are skipped when
//! the profile is activated.
//!
//! # KDL Schema
//!
//! ```kdl
//! name "Fine"
//! setting "layer_height" 0.1
//! setting "adhesion_type" "brim"
//! setting "support_enable" #true
//! ```

use crate::settings::value::SettingValue;
use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// Profile shared between its owner and the machine it is active on.
pub type SharedProfile = Rc<RefCell<Profile>>;

/// A named overlay of setting values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    name: String,
    changed: BTreeMap<String, SettingValue>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changed: BTreeMap::new(),
        }
    }

    /// Wrap the profile for activation on a machine.
    pub fn into_shared(self) -> SharedProfile {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Store a changed value for `key`.
    pub fn set_setting_value(&mut self, key: impl Into<String>, value: SettingValue) {
        self.changed.insert(key.into(), value);
    }

    /// Forget the stored value for `key`. Returns whether one was stored.
    pub fn remove_setting_value(&mut self, key: &str) -> bool {
        self.changed.remove(key).is_some()
    }

    pub fn setting_value(&self, key: &str) -> Option<&SettingValue> {
        self.changed.get(key)
    }

    pub fn changed_settings(&self) -> &BTreeMap<String, SettingValue> {
        &self.changed
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn clear(&mut self) {
        self.changed.clear();
    }

    /// Parse a profile from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        let mut profile = Self::default();

        for node in doc.nodes() {
            match node.name().value() {
                "name" => {
                    if let Some(name) = node.entries().first().and_then(|e| e.value().as_string()) {
                        profile.name = name.to_string();
                    }
                }
                "setting" => {
                    let (key, value) = parse_setting_node(node)?;
                    profile.changed.insert(key, value);
                }
                _ => {
                    // Ignore unknown nodes for forward compatibility
                }
            }
        }

        Ok(profile)
    }

    /// Convert the profile to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        let mut node = KdlNode::new("name");
        node.push(KdlEntry::new(KdlValue::String(self.name.clone())));
        doc.nodes_mut().push(node);

        for (key, value) in &self.changed {
            let mut node = KdlNode::new("setting");
            node.push(KdlEntry::new(KdlValue::String(key.clone())));
            node.push(KdlEntry::new(kdl_value(value)));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Load a profile from a KDL file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Other(format!("Failed to read {}: {}", path.display(), e)))?;

        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Other(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;

        Self::from_kdl(&doc)
    }

    /// Save the profile to a KDL file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut doc = self.to_kdl();
        doc.autoformat();
        std::fs::write(path, doc.to_string())?;
        Ok(())
    }
}

/// Parse `setting "key" <value>`.
fn parse_setting_node(node: &KdlNode) -> Result<(String, SettingValue)> {
    let entries = node.entries();
    let key = entries
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| Error::InvalidInput("setting node must have a key argument".to_string()))?;

    let raw = entries
        .get(1)
        .map(|e| e.value())
        .ok_or_else(|| Error::InvalidInput(format!("setting '{}' has no value", key)))?;

    let value = if let Some(b) = raw.as_bool() {
        SettingValue::Bool(b)
    } else if let Some(i) = raw.as_integer() {
        let i = i64::try_from(i)
            .map_err(|_| Error::InvalidInput(format!("setting '{}': integer out of range", key)))?;
        SettingValue::Int(i)
    } else if let Some(f) = raw.as_float() {
        SettingValue::Float(f)
    } else if let Some(s) = raw.as_string() {
        SettingValue::Text(s.to_string())
    } else {
        return Err(Error::InvalidInput(format!(
            "setting '{}' has an unsupported value",
            key
        )));
    };

    Ok((key.to_string(), value))
}

fn kdl_value(value: &SettingValue) -> KdlValue {
    match value {
        SettingValue::Bool(b) => KdlValue::Bool(*b),
        SettingValue::Int(i) => KdlValue::Integer(*i as i128),
        SettingValue::Float(f) => KdlValue::Float(*f),
        SettingValue::Text(s) => KdlValue::String(s.clone()),
    }
}
