//! Command dispatch and handler modules.

mod files;
mod ide;
mod project;
mod tree;
mod versions;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Tree { scope, why } => tree::exec(&cli.project, &scope, why.as_deref()).await,
        Command::Files { scope } => files::exec(&cli.project, &scope).await,
        Command::Ide => ide::exec(&cli.project).await,
        Command::Versions { module } => versions::exec(&cli.project, &module).await,
    }
}
