//! Store wiring for one CLI invocation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use taskflow_core::navigation::{self, GuardDecision};
use taskflow_core::{ProjectStore, Route, SessionCodec, SessionStore, Subscription};
use taskflow_remote::MockRemote;
use taskflow_storage::FileStore;
use tracing::debug;

use crate::settings::Settings;

pub const SESSION_FILE: &str = "session.json";

pub struct App {
    pub session: Arc<SessionStore>,
    pub projects: ProjectStore,
}

impl App {
    /// Open the session slot in `data_dir` and restore any saved session.
    pub fn open(data_dir: &Path, settings: &Settings) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let storage = Arc::new(FileStore::new(data_dir.join(SESSION_FILE)));
        let remote = Arc::new(MockRemote::new(settings.remote.clone()));
        let session = Arc::new(SessionStore::new(
            remote.clone(),
            SessionCodec::new(storage),
        ));
        let restored = session.initialize();
        debug!(state = restored.as_str(), "Session restored");

        let projects = ProjectStore::new(remote, Arc::clone(&session), settings.store.clone())?;
        Ok(Self { session, projects })
    }

    /// Run the route guard for `route`.
    pub fn guard(&self, route: Route) -> Result<()> {
        match navigation::evaluate(route, self.session.is_authenticated().read()) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Redirect(Route::Login) => {
                bail!("Not signed in. Run 'taskflow login' first.")
            }
            GuardDecision::Redirect(target) => bail!("{} is not available, go to {}", route, target),
        }
    }

    /// Show a spinner whenever the project store has work in flight.
    pub fn spinner(&self) -> Subscription {
        let mut active: Option<ProgressBar> = None;
        self.projects
            .is_loading()
            .subscribe(move |loading: &bool| match (*loading, active.take()) {
                (true, Some(bar)) => active = Some(bar),
                (true, None) => {
                    let bar = ProgressBar::new_spinner();
                    bar.set_message("Contacting TaskFlow...");
                    bar.enable_steady_tick(Duration::from_millis(80));
                    active = Some(bar);
                }
                (false, Some(bar)) => bar.finish_and_clear(),
                (false, None) => {}
            })
    }
}
