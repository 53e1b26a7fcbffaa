//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::app::App;
use crate::settings::{self, Settings};

pub mod auth;
pub mod project;

/// TaskFlow - projects and sessions from the terminal
#[derive(Parser)]
#[command(name = "taskflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the saved session and settings
    #[arg(long, global = true, env = "TASKFLOW_HOME")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login(auth::LoginArgs),

    /// Create an account and sign in
    Register(auth::RegisterArgs),

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Project management
    #[command(subcommand)]
    Project(project::ProjectCommands),
}

impl Cli {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => settings::default_data_dir(),
        }
    }

    pub async fn execute(self, data_dir: &Path, settings: &Settings) -> Result<()> {
        let app = App::open(data_dir, settings)?;

        match self.command {
            Commands::Login(args) => auth::login(&app, args).await,
            Commands::Register(args) => auth::register(&app, args).await,
            Commands::Logout => auth::logout(&app),
            Commands::Whoami => auth::whoami(&app),
            Commands::Project(cmd) => project::execute(&app, cmd).await,
        }
    }
}
