//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::workspace::DEFAULT_MANIFEST;

/// Assemble and run SIDL interface builds across multiple languages.
#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the workspace manifest.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Run as if started in this directory.
    ///
    /// This affects manifest lookup and the file-state snapshot location.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Restrict the command to one project.
    ///
    /// When omitted every project is processed, dependencies first.
    #[arg(short, long, value_name = "NAME")]
    pub project: Option<String>,

    /// Optional subcommand to execute; defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Build);
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_MANIFEST),
            directory: None,
            verbose: false,
            project: None,
            command: None,
        }
        .with_default_command()
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Copy)]
pub enum Commands {
    /// Compile changed interfaces and refresh the file-state snapshot.
    Build,

    /// List the assembled actions in execution order.
    Plan,

    /// Display the assembled build graph in DOT format for visualisation.
    Graph,
}
