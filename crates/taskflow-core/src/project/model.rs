//! Project domain models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A project as held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Display hint, opaque to the stores.
    pub color: String,
    pub owner_id: String,
    pub member_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_completed: bool,
}

impl Project {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }

    /// Overlay the fields present in `request` and advance `updated_at`.
    /// Identifier, owner, members and `created_at` are never touched.
    pub fn merged_with(&self, request: &UpdateProjectRequest) -> Project {
        let mut merged = self.clone();
        if let Some(name) = &request.name {
            merged.name = name.clone();
        }
        if let Some(description) = &request.description {
            merged.description = description.clone();
        }
        if let Some(color) = &request.color {
            merged.color = color.clone();
        }
        if let Some(is_completed) = request.is_completed {
            merged.is_completed = is_completed;
        }
        merged.updated_at = advance(self.updated_at);
        merged
    }
}

/// `now`, or one millisecond past `previous` if the clock has not moved on.
fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

/// Fields the user supplies when creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    pub color: String,
}

impl CreateProjectRequest {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            color: color.into(),
        }
    }
}

/// What is sent to the collaborator for creation: the request plus ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub color: String,
    pub owner_id: String,
    pub member_ids: Vec<String>,
}

impl NewProject {
    /// The owner is also the sole initial member.
    pub fn owned_by(request: CreateProjectRequest, owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        Self {
            name: request.name,
            description: request.description,
            color: request.color,
            member_ids: vec![owner_id.clone()],
            owner_id,
        }
    }
}

/// Partial update. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl UpdateProjectRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn completed(mut self, is_completed: bool) -> Self {
        self.is_completed = Some(is_completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.color.is_none()
            && self.is_completed.is_none()
    }
}

/// An ordered collection plus an "operation in flight" flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    pub loading: bool,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
        }
    }
}

impl<T> CollectionState<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Dashboard summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

impl ProjectStats {
    pub fn from_projects(projects: &[Project]) -> Self {
        let completed = projects.iter().filter(|p| p.is_completed).count();
        Self {
            total: projects.len(),
            completed,
            active: projects.len() - completed,
        }
    }
}
