//! CLI argument definitions for Trellis.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    version,
    about = "Resolve the dependencies declared in a dependencies.txt",
    long_about = "Trellis reads the dependencies.txt of a project, resolves them against the \
                  repositories listed in trellis.toml and prints the resulting tree, files \
                  or IDE classpath."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding dependencies.txt and trellis.toml
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved dependency tree
    Tree {
        /// Dependency scope: compile, runtime or test
        #[arg(short, long, default_value = "runtime")]
        scope: String,
        /// Only print how a module (group:name) gets into the tree
        #[arg(long)]
        why: Option<String>,
    },

    /// Print the resolved files, one per line
    Files {
        /// Dependency scope: compile, runtime or test
        #[arg(short, long, default_value = "runtime")]
        scope: String,
    },

    /// Print the IDE classpath: every dependency with its qualifier
    Ide,

    /// List the versions the repositories know for a module
    Versions {
        /// Module id, e.g. com.google.guava:guava
        module: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
