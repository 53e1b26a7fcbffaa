//! Session commands.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use taskflow_core::navigation::{self, GuardDecision};
use taskflow_core::{Credentials, RegisterRequest, Route, SessionState};
use tokio::sync::broadcast;

use crate::app::App;
use crate::output;

#[derive(Args)]
pub struct LoginArgs {
    /// Account email
    pub email: String,

    /// Account password
    #[arg(short, long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Account email
    pub email: String,

    /// Display name
    #[arg(short, long)]
    pub name: String,

    /// Account password
    #[arg(short, long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn login(app: &App, args: LoginArgs) -> Result<()> {
    if already_signed_in(app, Route::Login) {
        return Ok(());
    }
    let mut intents = app.session.navigation();
    let user = app
        .session
        .login(&Credentials::new(args.email, args.password))
        .await?;

    println!(
        "{} Signed in as {} ({})",
        "✓".green().bold(),
        user.name.cyan(),
        user.email.dimmed()
    );
    report_navigation(&mut intents);
    Ok(())
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    if already_signed_in(app, Route::Register) {
        return Ok(());
    }
    let mut intents = app.session.navigation();
    let user = app
        .session
        .register(&RegisterRequest::new(args.email, args.name, args.password))
        .await?;

    println!(
        "{} Registered {} ({})",
        "✓".green().bold(),
        user.name.cyan(),
        user.id.dimmed()
    );
    report_navigation(&mut intents);
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    if !app.session.is_authenticated().read() {
        println!("{}", "Not signed in.".dimmed());
        return Ok(());
    }
    let mut intents = app.session.navigation();
    app.session.logout();

    println!("{} Signed out", "✓".green().bold());
    report_navigation(&mut intents);
    Ok(())
}

pub fn whoami(app: &App) -> Result<()> {
    match app.session.state() {
        SessionState::Authenticated(user) => output::print_user(&user),
        _ => println!("{}", "Not signed in.".dimmed()),
    }
    Ok(())
}

fn already_signed_in(app: &App, route: Route) -> bool {
    match navigation::evaluate(route, app.session.is_authenticated().read()) {
        GuardDecision::Allow => false,
        GuardDecision::Redirect(_) => {
            if let Some(user) = app.session.current_user().read() {
                println!(
                    "{} Already signed in as {}. Run 'taskflow logout' first.",
                    "!".yellow().bold(),
                    user.email.cyan()
                );
            }
            true
        }
    }
}

fn report_navigation(intents: &mut broadcast::Receiver<taskflow_core::NavigationIntent>) {
    while let Ok(intent) = intents.try_recv() {
        println!("  {} {}", "→".dimmed(), intent.target.to_string().dimmed());
    }
}
