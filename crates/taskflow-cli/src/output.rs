//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use taskflow_core::{AuthenticatedUser, Project, ProjectStats};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Print the signed-in user.
pub fn print_user(user: &AuthenticatedUser) {
    println!("{} {}", user.name.cyan().bold(), format!("({})", user.id).dimmed());
    println!("{}: {}", "Email".bold(), user.email);
    if let Some(avatar) = &user.avatar {
        println!("{}: {}", "Avatar".bold(), avatar.dimmed());
    }
    println!(
        "{}: {}",
        "Member since".bold(),
        user.created_at.format("%Y-%m-%d")
    );
}

/// Print a single project.
pub fn print_project(project: &Project) {
    println!("{} {}", project.name.cyan().bold(), format!("({})", project.id).dimmed());
    println!();

    if !project.description.is_empty() {
        println!("{}", project.description);
        println!();
    }

    println!("{}: {}", "Status".bold(), status(project));
    println!("{}: {}", "Color".bold(), project.color);
    println!("{}: {}", "Owner".bold(), project.owner_id);
    println!("{}: {}", "Members".bold(), project.member_ids.join(", "));
    println!(
        "{}: {}",
        "Created".bold(),
        project.created_at.format("%Y-%m-%d %H:%M")
    );
    println!(
        "{}: {}",
        "Updated".bold(),
        project.updated_at.format("%Y-%m-%d %H:%M")
    );
}

/// Print projects as a table.
pub fn print_projects_table(projects: &[Project]) {
    if projects.is_empty() {
        println!("{}", "No projects found.".dimmed());
        return;
    }

    println!("{:<38} {:<30} {:<10} {:<10}", "ID", "Name", "Status", "Updated");
    println!("{}", "─".repeat(90));

    for project in projects {
        let name = truncate_visual(&project.name, 28);
        let padding = 30usize.saturating_sub(UnicodeWidthStr::width(name.as_str()));
        println!(
            "{:<38} {}{} {:<10} {:<10}",
            project.id,
            name,
            " ".repeat(padding),
            status(project),
            project.updated_at.format("%Y-%m-%d")
        );
    }
}

/// Print the project totals.
pub fn print_stats(stats: &ProjectStats) {
    println!("{}", "Projects".bold());
    println!("  {:<10} {}", "Total", stats.total.to_string().cyan());
    println!("  {:<10} {}", "Active", stats.active.to_string().yellow());
    println!("  {:<10} {}", "Completed", stats.completed.to_string().green());
}

fn status(project: &Project) -> ColoredString {
    if project.is_completed {
        "completed".green()
    } else {
        "active".yellow()
    }
}

/// Truncate to a display width, ending in `..` when shortened.
fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 2 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}
