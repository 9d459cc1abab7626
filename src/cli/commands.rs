use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::{Settings, SubmitterKind};

#[derive(Args, Clone)]
pub struct DataArgs {
    /// Data directory holding the database and depfresh.toml
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Settings file to use instead of <data-dir>/depfresh.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
pub struct SubmitterArgs {
    /// How update requests are submitted (logonly, nomad)
    #[arg(long)]
    pub submitter: Option<SubmitterKind>,

    /// Nomad HTTP API address
    #[arg(long)]
    pub nomad_address: Option<String>,

    /// Nomad region
    #[arg(long)]
    pub nomad_region: Option<String>,
}

impl SubmitterArgs {
    /// Overrides the settings file with any flags given.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(kind) = self.submitter {
            settings.submitter = kind;
        }
        if let Some(address) = &self.nomad_address {
            settings.nomad.address.clone_from(address);
        }
        if let Some(region) = &self.nomad_region {
            settings.nomad.region.clone_from(region);
        }
    }
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Clone a project and record its dependencies for watching
    Register {
        /// Project name, e.g. github.com/acme/widgets
        name: String,

        /// Clone URL
        #[arg(long)]
        git_url: String,

        /// Branch to read dependencies from
        #[arg(long, default_value = "master")]
        branch: String,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Show a registered project and its dependencies
    Show {
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        data: DataArgs,
    },

    /// List projects that depend on a package or a package beneath it
    Dependents {
        /// Package name, e.g. github.com/foo/bar
        dependency: String,

        #[command(flatten)]
        data: DataArgs,
    },
}

#[derive(Subcommand)]
pub enum PrCommands {
    /// Submit an update for one project and dependency
    Submit {
        /// Registered project name
        #[arg(long)]
        project: String,

        /// Package to update
        #[arg(long)]
        dependency: String,

        /// Version to move to
        #[arg(long)]
        to_version: String,

        /// Revision to move to
        #[arg(long)]
        to_revision: String,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        submitter: SubmitterArgs,
    },
}
