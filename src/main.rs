use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use depfresh::cli::{
    DataArgs, PrCommands, ProjectCommands, SubmitterArgs, run_listen, run_pr_submit,
    run_project_dependents, run_project_register, run_project_show, run_watch,
};
use depfresh::types::UpdateTarget;

#[derive(Parser)]
#[command(name = "depfresh")]
#[command(about = "Submits dependency updates when upstream projects release", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the public event feed for releases
    Watch {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        submitter: SubmitterArgs,
    },

    /// Listen for release webhooks
    Listen {
        /// Host to bind to (default 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default 4000)
        #[arg(long, short)]
        port: Option<u16>,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        submitter: SubmitterArgs,
    },

    /// Manage watched projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Submit update requests by hand
    Pr {
        #[command(subcommand)]
        command: PrCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("depfresh=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { data, submitter } => run_watch(data, submitter).await?,
        Commands::Listen {
            host,
            port,
            data,
            submitter,
        } => run_listen(host, port, data, submitter).await?,
        Commands::Project { command } => match command {
            ProjectCommands::Register {
                name,
                git_url,
                branch,
                data,
            } => run_project_register(name, git_url, branch, data).await?,
            ProjectCommands::Show { name, json, data } => run_project_show(name, json, data)?,
            ProjectCommands::Dependents { dependency, data } => {
                run_project_dependents(dependency, data)?;
            }
        },
        Commands::Pr { command } => match command {
            PrCommands::Submit {
                project,
                dependency,
                to_version,
                to_revision,
                data,
                submitter,
            } => {
                let target = UpdateTarget {
                    dependency,
                    to_version,
                    to_revision,
                };
                run_pr_submit(project, target, data, submitter).await?;
            }
        },
    }

    Ok(())
}
