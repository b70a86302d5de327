//! Handler for `trellis ide`.

use std::path::Path;

use miette::Result;
use trellis_core::dependency::Dependency;
use trellis_core::qualified::QualifiedDependencySet;

use super::project::{self, Project};

pub async fn exec(dir: &Path) -> Result<()> {
    let project = Project::load(dir)?;
    let deps = &project.dependencies;
    let ide = QualifiedDependencySet::compute_ide_dependencies(
        &deps.compute_compile_deps(),
        &deps.compute_runtime_deps(),
        &deps.compute_test_deps(),
        project.settings.resolution.conflict_strategy,
    )?;
    let result = project::resolve(&project.resolver()?, &ide).await?;

    for entry in ide.entries() {
        let qualifier = entry.qualifier().unwrap_or("compile");
        match &entry.dependency {
            Dependency::Coordinate(dep) => {
                let coordinate = match result.version_of(dep.module_id()) {
                    Some(version) => dep.coordinate.with_version(version.clone()),
                    None => dep.coordinate.clone(),
                };
                println!("{qualifier}: {}", coordinate.to_short_string());
            }
            other => println!("{qualifier}: {other}"),
        }
    }
    Ok(())
}
