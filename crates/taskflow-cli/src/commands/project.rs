//! Project management commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use taskflow_core::{CreateProjectRequest, Route, UpdateProjectRequest};

use crate::app::App;
use crate::output;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects
    List,

    /// Show one project
    Show {
        /// Project ID
        id: String,
    },

    /// Create a project owned by the signed-in user
    Create(CreateProjectArgs),

    /// Change a project's fields
    Update(UpdateProjectArgs),

    /// Delete a project
    Delete {
        /// Project ID
        id: String,
    },

    /// Project totals
    Stats,
}

#[derive(Args)]
pub struct CreateProjectArgs {
    /// Project name
    pub name: String,

    /// Project description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Display color
    #[arg(short, long, default_value = "#1976d2")]
    pub color: String,
}

#[derive(Args)]
pub struct UpdateProjectArgs {
    /// Project ID
    pub id: String,

    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New display color
    #[arg(short, long)]
    pub color: Option<String>,

    /// Mark completed (true) or active (false)
    #[arg(long)]
    pub completed: Option<bool>,
}

impl UpdateProjectArgs {
    fn into_request(self) -> UpdateProjectRequest {
        let mut request = UpdateProjectRequest::new(self.id);
        if let Some(name) = self.name {
            request = request.name(name);
        }
        if let Some(description) = self.description {
            request = request.description(description);
        }
        if let Some(color) = self.color {
            request = request.color(color);
        }
        if let Some(completed) = self.completed {
            request = request.completed(completed);
        }
        request
    }
}

pub async fn execute(app: &App, cmd: ProjectCommands) -> Result<()> {
    app.guard(Route::Projects)?;
    let _spinner = app.spinner();
    app.projects.load_all().await?;

    match cmd {
        ProjectCommands::List => {
            output::print_projects_table(&app.projects.projects().read());
        }

        ProjectCommands::Show { id } => match app.projects.get_by_id(&id) {
            Some(project) => output::print_project(&project),
            None => bail!("Project not found: {}", id),
        },

        ProjectCommands::Create(args) => {
            let project = app
                .projects
                .create(CreateProjectRequest::new(
                    args.name,
                    args.description,
                    args.color,
                ))
                .await?;

            println!(
                "{} Created project: {} ({})",
                "✓".green().bold(),
                project.name.cyan(),
                project.id.dimmed()
            );
        }

        ProjectCommands::Update(args) => {
            let request = args.into_request();
            if request.is_empty() {
                bail!("Nothing to update. Pass --name, --description, --color or --completed.");
            }
            let project = app.projects.update(request).await?;

            println!(
                "{} Updated project: {} ({})",
                "✓".green().bold(),
                project.name.cyan(),
                project.id.dimmed()
            );
        }

        ProjectCommands::Delete { id } => {
            app.projects.delete(&id).await?;
            println!("{} Deleted project {}", "✓".green().bold(), id.dimmed());
        }

        ProjectCommands::Stats => {
            output::print_stats(&app.projects.stats().read());
        }
    }

    Ok(())
}
