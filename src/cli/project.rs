//! Project subcommands.

use crate::service::{CreateProject, UpdateProject};
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project with a chain of tasks
    Create(ProjectCreateArgs),

    /// Update a project's title, description or status
    Update(ProjectUpdateArgs),

    /// List projects
    List,

    /// Show a project and the state of its tasks
    Show {
        project_id: String,
    },
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project title
    #[arg(long)]
    pub title: String,

    /// Project description
    #[arg(long = "desc", default_value = "")]
    pub description: String,

    /// Tasks as "type:title" pairs, run in the given order
    #[arg(long, num_args = 1..)]
    pub tasks: Vec<String>,
}

impl ProjectCreateArgs {
    pub fn into_request(self) -> CreateProject {
        CreateProject {
            title: self.title,
            description: self.description,
            tasks: self.tasks,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProjectUpdateArgs {
    pub project_id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long = "desc")]
    pub description: Option<String>,

    #[arg(long)]
    pub status: Option<String>,
}

impl ProjectUpdateArgs {
    pub fn into_request(self) -> (String, UpdateProject) {
        (
            self.project_id,
            UpdateProject {
                title: self.title,
                description: self.description,
                status: self.status,
            },
        )
    }
}
