//! Machinedef - machine definitions, settings and profiles for 3D printers.
//!
//! This library provides the core functionality for the `mdef` CLI tool:
//! loading layered machine definitions, naming machines through instance
//! files, and applying sparse user profiles on top of definition defaults.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod resources;
pub mod settings;

pub use resources::{ResourceLocator, ResourcePaths, ResourceScope};
pub use settings::{MachineSettings, Profile, Setting, SettingValue, SettingsCategory};

use std::path::PathBuf;

/// Library-level error type for machinedef operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid definition {}: {reason}", .path.display())]
    InvalidDefinition { path: PathBuf, reason: String },

    #[error("Unsupported version in {}: expected {expected}, found {found}", .path.display())]
    InvalidVersion {
        path: PathBuf,
        expected: i64,
        found: String,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for machinedef operations.
pub type Result<T> = std::result::Result<T, Error>;
