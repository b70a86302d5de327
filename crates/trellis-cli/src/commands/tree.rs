//! Handler for `trellis tree`.

use std::path::Path;

use miette::Result;
use trellis_core::module_id::ModuleId;
use trellis_core::qualified::QualifiedDependencySet;

use super::project::{self, Project};

pub async fn exec(dir: &Path, scope: &str, why: Option<&str>) -> Result<()> {
    let project = Project::load(dir)?;
    let set = QualifiedDependencySet::from_set(&project.scope(scope)?);
    let result = project::resolve(&project.resolver()?, &set).await?;

    if let Some(target) = why {
        let module = ModuleId::parse(target)?;
        match result.tree.find_path(&module) {
            Some(path) => {
                println!("Path to {target}:");
                for (i, node) in path.iter().enumerate() {
                    println!("{}{node}", "  ".repeat(i));
                }
            }
            None => println!("Module '{target}' is not in the tree."),
        }
        return Ok(());
    }

    print!("{}", result.tree.to_string_tree());
    Ok(())
}
