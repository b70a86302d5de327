//! Handler for `trellis files`.

use std::path::Path;

use miette::Result;
use trellis_core::qualified::QualifiedDependencySet;

use super::project::{self, Project};

/// Print every resolved file; any resolution error fails the command.
pub async fn exec(dir: &Path, scope: &str) -> Result<()> {
    let project = Project::load(dir)?;
    let set = QualifiedDependencySet::from_set(&project.scope(scope)?);
    let result = project::resolve(&project.resolver()?, &set).await?;
    result.assert_no_error()?;

    for file in &result.files {
        println!("{}", file.display());
    }
    Ok(())
}
