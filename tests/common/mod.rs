//! Common test utilities for machinedef integration tests.
//!
//! Provides `TestEnv`, an isolated resource directory populated with a small
//! base/child definition pair, so tests never touch the user's
//! `~/.local/share/machinedef/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

pub const BASE_DEFINITION: &str = r#"{
    "id": "base_printer",
    "name": "Base Printer",
    "version": 1,
    "icon": "base.png",
    "platform": "base_platform.stl",
    "machine_settings": {
        "machine_width": { "default": 230 },
        "machine_nozzle_size": { "type": "float", "default": 0.4 }
    },
    "categories": {
        "quality": {
            "label": "Quality",
            "settings": {
                "layer_height": {
                    "label": "Layer Height",
                    "unit": "mm",
                    "type": "float",
                    "default": 0.2,
                    "min_value": 0.05,
                    "max_value": 0.3,
                    "max_value_warning": 0.25
                },
                "wall_thickness": {
                    "type": "float",
                    "default": 0.8,
                    "children": {
                        "wall_line_count": { "type": "int", "default": 2, "min_value": 1 }
                    }
                }
            }
        },
        "infill": {
            "label": "Infill",
            "settings": {
                "infill_pattern": {
                    "type": "enum",
                    "default": "grid",
                    "options": { "grid": "Grid", "lines": "Lines", "triangles": "Triangles" }
                },
                "infill_debug": { "type": "boolean", "default": false, "visible": false }
            }
        }
    }
}"#;

pub const CHILD_DEFINITION: &str = r#"{
    "id": "child_printer",
    "name": "Child Printer",
    "version": 1,
    "inherits": "base_printer.json",
    "overrides": {
        "layer_height": { "default": 0.15 },
        "not_a_setting": { "default": 1 }
    }
}"#;

/// A test environment with an isolated resource directory.
///
/// The `mdef()` method returns a `Command` that points `MDEF_RESOURCES` and
/// the XDG data directory at temporary directories per-invocation, making
/// tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub resource_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create an empty test environment.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            resource_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment with the base and child definitions installed.
    pub fn with_definitions() -> Self {
        let env = Self::new();
        env.write_resource("machines/base_printer.json", BASE_DEFINITION);
        env.write_resource("machines/child_printer.json", CHILD_DEFINITION);
        env
    }

    /// Get a Command for the mdef binary with isolated resources.
    pub fn mdef(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mdef"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("MDEF_RESOURCES", self.resource_dir.path());
        cmd.env("XDG_DATA_HOME", self.data_dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Write a file below the resource directory, creating parents.
    pub fn write_resource(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.resource_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Get the path to the resource directory.
    pub fn resource_path(&self) -> &Path {
        self.resource_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn parse_json(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).unwrap()
}
