//! TaskFlow Core Library
//!
//! Reactive domain state for the TaskFlow client: the session store, the
//! project store, and the dual-channel state cell both are built on.

pub mod config;
pub mod error;
pub mod navigation;
pub mod project;
pub mod remote;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::{OwnershipPolicy, StoreConfig};
pub use error::{TaskflowError, TaskflowResult};
pub use navigation::{GuardDecision, NavigationIntent, Route};
pub use project::model::{
    CollectionState, CreateProjectRequest, NewProject, Project, ProjectStats, UpdateProjectRequest,
};
pub use project::ProjectStore;
pub use remote::RemoteApi;
pub use session::codec::SessionCodec;
pub use session::model::{AuthenticatedUser, CredentialToken, Credentials, RegisterRequest};
pub use session::{SessionState, SessionStore};
pub use state::{Derived, StateCell, Subscription};
