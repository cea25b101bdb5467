//! Mdef CLI - inspect machine definitions, instances and setting profiles.

use clap::Parser;
use machinedef::ResourcePaths;
use machinedef::cli::{Cli, Commands, InstanceCommands, ProfileCommands};
use machinedef::commands::{self, ListOptions, Output};
use machinedef::logging;
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init();

    let human = cli.human_readable;
    let resources = ResourcePaths::with_user_data(cli.resources);
    tracing::debug!(search_paths = ?resources.search_paths(), "resource directories");

    if let Err(e) = run_command(cli.command, &resources, human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn run_command(
    command: Commands,
    resources: &ResourcePaths,
    human: bool,
) -> Result<(), machinedef::Error> {
    match command {
        Commands::Show { definition } => {
            let result = commands::show(resources, &definition)?;
            output(&result, human);
        }

        Commands::List {
            definition,
            category,
            machine,
            all,
            profile,
        } => {
            let options = ListOptions {
                category: category.as_deref(),
                include_machine: machine,
                include_hidden: all,
                profile: profile.as_deref(),
            };
            let result = commands::list(resources, &definition, options)?;
            output(&result, human);
        }

        Commands::Get {
            definition,
            key,
            profile,
        } => {
            let result = commands::get(resources, &definition, &key, profile.as_deref())?;
            output(&result, human);
        }

        Commands::Validate {
            definition,
            profile,
        } => {
            let result = commands::validate(resources, &definition, profile.as_deref())?;
            output(&result, human);
        }

        Commands::Instance { command } => match command {
            InstanceCommands::Load { instance } => {
                let result = commands::instance_load(resources, &instance)?;
                output(&result, human);
            }
            InstanceCommands::Save {
                definition,
                output: path,
                name,
            } => {
                let result =
                    commands::instance_save(resources, &definition, &path, name.as_deref())?;
                output(&result, human);
            }
        },

        Commands::Profile { command } => match command {
            ProfileCommands::Show { profile } => {
                let result = commands::profile_show(resources, &profile)?;
                output(&result, human);
            }
            ProfileCommands::Set {
                profile,
                definition,
                key,
                value,
            } => {
                let result = commands::profile_set(resources, &profile, &definition, &key, &value)?;
                output(&result, human);
            }
            ProfileCommands::Reset {
                profile,
                definition,
                key,
            } => {
                let result = commands::profile_reset(resources, &profile, &definition, &key)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
