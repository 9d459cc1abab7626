use serde::Serialize;

use super::{DataArgs, init_index, load_settings};
use crate::error::Error;
use crate::extract::{DependencyExtractor, GitExtractor};
use crate::store::Index;
use crate::types::{Dependency, Project};

#[derive(Serialize)]
struct ProjectOutput<'a> {
    #[serde(flatten)]
    project: &'a Project,
    dependencies: &'a [Dependency],
}

pub async fn run_project_register(
    name: String,
    git_url: String,
    branch: String,
    data: DataArgs,
) -> anyhow::Result<()> {
    let settings = load_settings(&data)?;
    let index = init_index(&settings)?;

    let project = Project {
        name,
        git_url,
        branch,
    };
    let deps = GitExtractor::new().dependencies(&project).await?;
    index.register_project(&project, &deps)?;

    println!(
        "Registered '{}' with {} dependencies",
        project.name,
        deps.len()
    );
    Ok(())
}

pub fn run_project_show(name: String, json: bool, data: DataArgs) -> anyhow::Result<()> {
    let settings = load_settings(&data)?;
    let index = init_index(&settings)?;

    let (project, deps) = match index.project(&name) {
        Ok(found) => found,
        Err(Error::NotFound) => anyhow::bail!("Project '{name}' not found"),
        Err(e) => return Err(e.into()),
    };

    if json {
        let output = ProjectOutput {
            project: &project,
            dependencies: &deps,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", project.name);
    println!("  git url: {}", project.git_url);
    println!("  branch:  {}", project.branch);
    println!();
    println!("Dependencies ({}):", deps.len());
    for dep in &deps {
        match &dep.source {
            Some(source) => println!("  {} {} (from {source})", dep.name, dep.revision),
            None => println!("  {} {}", dep.name, dep.revision),
        }
    }
    Ok(())
}

pub fn run_project_dependents(dependency: String, data: DataArgs) -> anyhow::Result<()> {
    let settings = load_settings(&data)?;
    let index = init_index(&settings)?;

    let keys = index.projects_for_dependency(&dependency)?;
    if keys.is_empty() {
        println!("No projects depend on {dependency}");
        return Ok(());
    }
    for key in keys {
        println!("{key}");
    }
    Ok(())
}
