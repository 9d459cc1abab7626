use super::{DataArgs, SubmitterArgs, build_submitter, init_index, load_settings};
use crate::error::Error;
use crate::store::Index;
use crate::types::UpdateTarget;

pub async fn run_pr_submit(
    project: String,
    target: UpdateTarget,
    data: DataArgs,
    submitter: SubmitterArgs,
) -> anyhow::Result<()> {
    let mut settings = load_settings(&data)?;
    submitter.apply(&mut settings);
    let index = init_index(&settings)?;

    let project = match index.project(&project) {
        Ok((project, _)) => project,
        Err(Error::NotFound) => anyhow::bail!("Project '{project}' not found"),
        Err(e) => return Err(e.into()),
    };

    build_submitter(&settings)?
        .submit_pr(&project, &target)
        .await?;

    println!("Submitted {target} for '{}'", project.name);
    Ok(())
}
