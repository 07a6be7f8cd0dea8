//! Opinio CLI
//!
//! 项目脚手架、控制器清单生成和插件管理

#![forbid(unsafe_code)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use opinio_core::logging::{LogLevel, LoggingConfig};
use std::path::PathBuf;

/// Opinio command-line interface
#[derive(Parser, Debug)]
#[command(name = "opinio", author, version, about, long_about = None)]
struct Args {
    /// Project root (the directory containing Cargo.toml)
    #[arg(short, long, env = "OPINIO_ROOT", default_value = ".")]
    root: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scaffold domains and controllers
    New {
        #[command(subcommand)]
        target: NewTarget,
    },

    /// Generate the controller manifest from src/app/domains
    Manifest {
        /// Source directory to scan
        #[arg(long)]
        src: Option<PathBuf>,

        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage enabled plugins
    Plugins {
        #[command(subcommand)]
        action: PluginAction,
    },
}

#[derive(Subcommand, Debug)]
enum NewTarget {
    /// Create a domain with controllers/ and services/ folders
    Domain {
        name: String,

        /// Also create a controller and a service
        #[arg(long)]
        bootstrap: bool,
    },

    /// Create a controller inside an existing domain
    Controller {
        domain: String,

        /// Add list/get/create/update/delete handlers
        #[arg(long)]
        crud: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PluginAction {
    /// List enabled plugins
    List,

    /// Enable a plugin
    Enable {
        name: String,

        /// Publish the plugin's assets from this directory right away
        #[arg(long, value_name = "DIR")]
        publish: Option<PathBuf>,

        /// Overwrite existing files when publishing
        #[arg(short, long, requires = "publish")]
        force: bool,
    },

    /// Disable a plugin
    Disable { name: String },

    /// Copy a plugin's publishable assets into the project
    Publish {
        /// Plugin directory containing publish.toml
        dir: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { LogLevel::Debug } else { LogLevel::Warn };
    LoggingConfig::new().level(level).init()?;

    let root = args.root;
    match args.command {
        Command::New { target } => match target {
            NewTarget::Domain { name, bootstrap } => {
                let created = commands::new::new_domain(&root, &name, bootstrap)?;
                commands::print_created(&root, &created);
                println!("Domain '{}' created.", name);
            }
            NewTarget::Controller { domain, crud } => {
                let created = commands::new::new_controller(&root, &domain, crud)?;
                commands::print_created(&root, &created);
                println!("Controller for domain '{}' created.", domain);
            }
        },
        Command::Manifest { src, out } => {
            let (out, count) = commands::manifest::generate(&root, src, out)?;
            println!("Wrote {} controller module(s) to {}", count, out.display());
        }
        Command::Plugins { action } => match action {
            PluginAction::List => commands::plugins::list(&root)?,
            PluginAction::Enable { name, publish, force } => match publish {
                Some(dir) => {
                    let summary = commands::plugins::enable_and_publish(&root, &name, &dir, force)?;
                    summary.print(&root);
                }
                None => commands::plugins::enable(&root, &name)?,
            },
            PluginAction::Disable { name } => commands::plugins::disable(&root, &name)?,
            PluginAction::Publish { dir, force } => {
                let summary = commands::plugins::publish(&root, &dir, force)?;
                summary.print(&root);
            }
        },
    }

    Ok(())
}
