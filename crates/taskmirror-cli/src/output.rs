//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use taskmirror_core::{Item, Label, Project, Snapshot};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single task
    pub fn print_item(&self, item: &Item, snapshot: &Snapshot) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", item.id);
                println!("Content:     {}", item.content);
                if !item.description.is_empty() {
                    println!("Description: {}", item.description);
                }
                if let Some(project) = item.project_id.as_deref() {
                    println!("Project:     {}", project_name(snapshot, project));
                }
                println!("Priority:    {}", item.priority);
                if let Some(due) = &item.due {
                    println!("Due:         {}", due_summary(due));
                }
                if !item.labels.is_empty() {
                    println!("Labels:      {}", item.labels.join(", "));
                }
                println!("Status:      {}", item_status(item));
                if let Some(added) = item.added_at {
                    println!("Added:       {}", added.format("%Y-%m-%d %H:%M"));
                }
                if let Some(completed) = item.completed_at {
                    println!("Completed:   {}", completed.format("%Y-%m-%d %H:%M"));
                }
            }
            OutputFormat::Json => print_json(item),
            OutputFormat::Quiet => println!("{}", item.id),
        }
    }

    /// Print a list of tasks
    pub fn print_items(&self, items: &[&Item], snapshot: &Snapshot) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No tasks found.");
                    return;
                }
                for item in items {
                    let due = item
                        .due
                        .as_ref()
                        .map(|d| format!(" | due {}", truncate(&due_summary(d), 20)))
                        .unwrap_or_default();
                    let project = item
                        .project_id
                        .as_deref()
                        .map(|p| project_name(snapshot, p))
                        .unwrap_or_default();
                    println!(
                        "{} | {} | {} | {}{}",
                        item.id,
                        item.priority,
                        truncate(&item.content, 40),
                        truncate(&project, 15),
                        due
                    );
                }
                println!("\n{} task(s)", items.len());
            }
            OutputFormat::Json => print_json(&items),
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.id);
                }
            }
        }
    }

    /// Print a single project
    pub fn print_project(&self, project: &Project) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:    {}", project.id);
                println!("Name:  {}", project.name);
                if !project.color.is_empty() {
                    println!("Color: {}", project.color);
                }
            }
            OutputFormat::Json => print_json(project),
            OutputFormat::Quiet => println!("{}", project.id),
        }
    }

    /// Print a list of projects with their open task counts
    pub fn print_projects(&self, projects: &[&Project], snapshot: &Snapshot) {
        match self.format {
            OutputFormat::Human => {
                if projects.is_empty() {
                    println!("No projects found.");
                    return;
                }
                for project in projects {
                    let marker = if project.inbox_project { " (inbox)" } else { "" };
                    println!(
                        "{} | {}{} ({})",
                        project.id,
                        project.name,
                        marker,
                        snapshot.items_in_project(&project.id).len()
                    );
                }
                println!("\n{} project(s)", projects.len());
            }
            OutputFormat::Json => print_json(&projects),
            OutputFormat::Quiet => {
                for project in projects {
                    println!("{}", project.id);
                }
            }
        }
    }

    /// Print a list of labels
    pub fn print_labels(&self, labels: &[&Label]) {
        match self.format {
            OutputFormat::Human => {
                if labels.is_empty() {
                    println!("No labels found.");
                    return;
                }
                for label in labels {
                    println!("{} | {}", label.id, label.name);
                }
                println!("\n{} label(s)", labels.len());
            }
            OutputFormat::Json => print_json(&labels),
            OutputFormat::Quiet => {
                for label in labels {
                    println!("{}", label.name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning that does not abort the command
    pub fn warn(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn project_name(snapshot: &Snapshot, id: &str) -> String {
    snapshot
        .project(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn item_status(item: &Item) -> &'static str {
    if item.is_deleted {
        "deleted"
    } else if item.checked {
        "done"
    } else {
        "open"
    }
}

/// Human form of a due date: the server's natural string when present
fn due_summary(due: &taskmirror_core::DueDate) -> String {
    let mut text = if due.string.is_empty() {
        due.date.clone()
    } else {
        due.string.clone()
    };
    if due.is_recurring {
        text.push_str(" (recurring)");
    }
    text
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmirror_core::DueDate;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("äöüäöüäöüäöü", 5), "äö...");
    }

    #[test]
    fn test_due_summary() {
        let due = DueDate {
            date: "2024-03-04".into(),
            string: "every monday".into(),
            is_recurring: true,
            ..DueDate::default()
        };
        assert_eq!(due_summary(&due), "every monday (recurring)");

        let due = DueDate {
            date: "2024-03-04".into(),
            ..DueDate::default()
        };
        assert_eq!(due_summary(&due), "2024-03-04");
    }

    #[test]
    fn test_item_status() {
        let mut item = Item::new("1", "x");
        assert_eq!(item_status(&item), "open");
        item.checked = true;
        assert_eq!(item_status(&item), "done");
        item.is_deleted = true;
        assert_eq!(item_status(&item), "deleted");
    }
}
