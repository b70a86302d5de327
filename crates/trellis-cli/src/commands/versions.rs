//! Handler for `trellis versions`.

use std::path::Path;

use miette::Result;
use trellis_core::module_id::ModuleId;

use super::project::Project;

pub async fn exec(dir: &Path, module: &str) -> Result<()> {
    let module = ModuleId::parse(module)?;
    let project = Project::load(dir)?;
    let versions = project.resolver()?.search_versions(&module).await?;
    if versions.is_empty() {
        println!("No versions of {module} found.");
    }
    for version in versions {
        println!("{version}");
    }
    Ok(())
}
