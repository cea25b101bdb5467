//! The machine settings tree and everything that feeds it.
//!
//! - `value` / `validation` - typed values and range checks
//! - `setting` / `category` - the tree nodes and their definition fragments
//! - `machine` - the [`MachineSettings`] aggregate
//! - `definition` - JSON definition files with inheritance and overrides
//! - `instance` - TOML instance files naming a machine
//! - `profile` - sparse value overlays stored as KDL
//! - `events` - change notification

pub mod category;
pub mod definition;
pub mod events;
pub mod instance;
pub mod machine;
pub mod profile;
pub mod setting;
pub mod validation;
pub mod value;

pub use category::{CategoryFragment, SettingsCategory};
pub use definition::{DEFINITION_VERSION, DefinitionDocument};
pub use events::{EventCallback, EventCollector, SettingChangedEvent, SettingsEvent, SubscriptionId};
pub use instance::INSTANCE_VERSION;
pub use machine::{MachineSettings, ProfileBinding, SettingsQuery, ValidationIssue};
pub use profile::{Profile, SharedProfile};
pub use setting::{Setting, SettingFragment};
pub use validation::{ValidationResult, ValueBounds};
pub use value::{SettingType, SettingValue};
