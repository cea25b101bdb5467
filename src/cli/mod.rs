//! CLI argument definitions for mdef.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\npackage: ",
    env!("CARGO_PKG_NAME"),
    "\ntarget: ",
    env!("MDEF_TARGET"),
    "\ncommit: ",
    env!("MDEF_GIT_COMMIT"),
    "\nbuilt: ",
    env!("MDEF_BUILD_TIMESTAMP")
);

/// Mdef - inspect machine definitions, instances and profiles.
///
/// Definitions and profiles may be given as paths or as names looked up in
/// the resource directories.
#[derive(Parser, Debug)]
#[command(name = "mdef")]
#[command(author, version, long_version = LONG_VERSION, about = "Inspect machine definitions, instances and setting profiles", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Extra resource directory searched before the user data directory.
    /// Repeatable. Can also be set via MDEF_RESOURCES (colon separated).
    #[arg(
        short = 'R',
        long = "resources",
        global = true,
        env = "MDEF_RESOURCES",
        value_delimiter = ':'
    )]
    pub resources: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a machine definition's metadata and categories
    Show {
        /// Definition file path or name (e.g., ultimaker2.json)
        definition: String,
    },

    /// List the settings of a machine definition
    List {
        /// Definition file path or name
        definition: String,

        /// Only list settings of this category
        #[arg(short, long)]
        category: Option<String>,

        /// Include machine-level settings
        #[arg(short, long)]
        machine: bool,

        /// Include hidden settings
        #[arg(short, long)]
        all: bool,

        /// Apply this profile before listing
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Show one setting
    Get {
        /// Definition file path or name
        definition: String,

        /// Setting key (e.g., layer_height)
        key: String,

        /// Apply this profile before reading the value
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Report settings whose values are out of range
    Validate {
        /// Definition file path or name
        definition: String,

        /// Apply this profile before validating
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Machine instance commands
    Instance {
        #[command(subcommand)]
        command: InstanceCommands,
    },

    /// Profile commands
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

/// Machine instance subcommands
#[derive(Subcommand, Debug)]
pub enum InstanceCommands {
    /// Load an instance file and show the machine it names
    Load {
        /// Instance file path or name
        instance: String,
    },

    /// Write an instance file for a definition
    Save {
        /// Definition file path or name
        definition: String,

        /// Instance file to write
        output: PathBuf,

        /// Display name of the machine
        #[arg(short, long)]
        name: Option<String>,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show the values stored in a profile
    Show {
        /// Profile file path or name
        profile: String,
    },

    /// Set a value in a profile (created when missing)
    ///
    /// The value is checked against the definition. Setting a value back to
    /// its default removes it from the profile.
    Set {
        /// Profile file
        profile: PathBuf,

        /// Definition file path or name
        definition: String,

        /// Setting key
        key: String,

        /// New value
        value: String,
    },

    /// Remove a value from a profile, restoring the default
    Reset {
        /// Profile file
        profile: PathBuf,

        /// Definition file path or name
        definition: String,

        /// Setting key
        key: String,
    },
}
