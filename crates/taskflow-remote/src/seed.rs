//! Demo data served by a fresh mock.

use chrono::{DateTime, TimeZone, Utc};
use taskflow_core::Project;

/// Id of the demo account every successful login resolves to.
pub const DEMO_USER_ID: &str = "1";
pub const DEMO_USER_NAME: &str = "John Doe";

const AVATAR_BASE: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

pub fn avatar_for(email: &str) -> String {
    format!("{}{}", AVATAR_BASE, email)
}

pub fn demo_account_created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// The two projects the demo account starts with.
pub fn demo_projects() -> Vec<Project> {
    let now = Utc::now();
    let project = |id: &str, name: &str, description: &str, color: &str, created: (u32, u32)| {
        Project {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            owner_id: DEMO_USER_ID.to_string(),
            member_ids: vec![DEMO_USER_ID.to_string()],
            created_at: Utc
                .with_ymd_and_hms(2024, created.0, created.1, 0, 0, 0)
                .single()
                .unwrap_or(now),
            updated_at: now,
            is_completed: false,
        }
    };

    vec![
        project(
            "1",
            "TaskFlow Development",
            "Task management system for the web client",
            "#1976d2",
            (1, 1),
        ),
        project(
            "2",
            "Design System",
            "Component library and design tokens",
            "#388e3c",
            (1, 15),
        ),
    ]
}
