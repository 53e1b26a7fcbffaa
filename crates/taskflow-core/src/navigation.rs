//! Client locations, navigation intents and route guards.
//!
//! The stores never navigate. They emit a `NavigationIntent` and leave the
//! routing collaborator to act on it.

use serde::{Deserialize, Serialize};

/// A location in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Dashboard,
    Login,
    Register,
    Projects,
    Tasks,
}

impl Route {
    /// Where a freshly authenticated user lands.
    pub const LANDING: Route = Route::Dashboard;

    /// Where a signed-out user is sent.
    pub const SIGN_IN: Route = Route::Login;

    /// Resolve a path. Empty and unknown paths resolve to the dashboard.
    pub fn from_path(path: &str) -> Self {
        match path.trim_matches('/') {
            "auth/login" => Self::Login,
            "auth/register" => Self::Register,
            p if p == "projects" || p.starts_with("projects/") => Self::Projects,
            p if p == "tasks" || p.starts_with("tasks/") => Self::Tasks,
            _ => Self::Dashboard,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Login => "/auth/login",
            Self::Register => "/auth/register",
            Self::Projects => "/projects",
            Self::Tasks => "/tasks",
        }
    }

    /// Requires a session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Dashboard | Self::Projects | Self::Tasks)
    }

    /// Only meaningful without a session.
    pub fn is_public_only(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// A request for the routing collaborator to move to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationIntent {
    pub target: Route,
}

impl NavigationIntent {
    pub fn to(target: Route) -> Self {
        Self { target }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

/// Decide whether navigation to `route` may proceed.
pub fn evaluate(route: Route, is_authenticated: bool) -> GuardDecision {
    if route.is_protected() && !is_authenticated {
        GuardDecision::Redirect(Route::SIGN_IN)
    } else if route.is_public_only() && is_authenticated {
        GuardDecision::Redirect(Route::LANDING)
    } else {
        GuardDecision::Allow
    }
}
