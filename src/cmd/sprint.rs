//! `clickup sprint list|current`

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::Serialize;

use clickup::api::models::Task;
use clickup::auth::Session;
use clickup::sprint::{self, CurrentSprint, Sprint, SprintState, SprintSummary};
use clickup::ui::{self, colors, format};

use super::status::resolve_space;
use super::{print_json, spinner};

/// Sprint folder from the flag, the saved setting, or a lookup in the
/// space. A flag or a lookup result is saved for next time.
fn resolve_folder(session: &mut Session, explicit: Option<&str>) -> Result<String> {
    if let Some(folder) = explicit.map(str::trim).filter(|f| !f.is_empty()) {
        if session.config().sprint_folder != folder {
            remember_folder(session, folder);
        }
        return Ok(folder.to_string());
    }

    let saved = &session.config().sprint_folder;
    if !saved.is_empty() {
        return Ok(saved.clone());
    }

    let space_id = resolve_space(session, None)?;
    let folders = session
        .client()?
        .folders(&space_id)
        .with_context(|| format!("failed to fetch folders for space {}", space_id))?;
    let found = sprint::pick_sprint_folder(&folders)?;
    ui::progress(&format!("Using sprint folder: {}", found.name.bold()));

    let id = found.id.clone();
    remember_folder(session, &id);
    Ok(id)
}

fn remember_folder(session: &mut Session, folder: &str) {
    session.config_mut().sprint_folder = folder.to_string();
    if let Err(e) = session.config().save() {
        tracing::warn!(error = %e, "could not save sprint folder");
    }
}

fn fetch_sprints(session: &mut Session, folder: Option<&str>) -> Result<Vec<Sprint>> {
    let folder_id = resolve_folder(session, folder)?;
    let lists = session
        .client()?
        .folder_lists(&folder_id)
        .with_context(|| format!("failed to fetch sprints in folder {}", folder_id))?;
    Ok(lists.into_iter().map(Sprint::from).collect())
}

fn state_colored(state: SprintState) -> ColoredString {
    match state {
        SprintState::InProgress => colors::success(state.label()),
        SprintState::Upcoming => colors::identifier(state.label()),
        SprintState::Complete | SprintState::Unknown => colors::secondary(state.label()),
    }
}

pub fn cmd_sprint_list(session: &mut Session, folder: Option<&str>, json: bool) -> Result<()> {
    let sprints = fetch_sprints(session, folder)?;
    let now = Utc::now();

    if json {
        let summaries: Vec<SprintSummary> = sprints.iter().map(|s| s.summary(now)).collect();
        return print_json(&summaries);
    }
    if sprints.is_empty() {
        println!("No sprints found in this folder.");
        return Ok(());
    }

    let mut rows = vec![vec![
        "NAME".to_string(),
        "DATES".to_string(),
        "TASKS".to_string(),
    ]];
    rows.extend(sprints.iter().map(|s| {
        vec![
            s.list.name.clone(),
            s.date_range(),
            s.list.task_count().to_string(),
        ]
    }));
    for (i, line) in format::columns(&rows).into_iter().enumerate() {
        if i == 0 {
            println!("  {}  {}", line.bold(), "STATUS".bold());
        } else {
            let sprint = &sprints[i - 1];
            let marker = if sprint.state(now) == SprintState::InProgress {
                colors::success("*")
            } else {
                " ".normal()
            };
            println!("{} {}  {}", marker, line, state_colored(sprint.state(now)));
        }
    }

    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup sprint current", colors::secondary("Current:"));
    Ok(())
}

#[derive(Serialize)]
struct CurrentSprintReport<'a> {
    sprint: SprintSummary,
    active: bool,
    tasks: &'a [Task],
}

pub fn cmd_sprint_current(session: &mut Session, folder: Option<&str>, json: bool) -> Result<()> {
    let sprints = fetch_sprints(session, folder)?;
    let now = Utc::now();

    let pick = sprint::current_sprint(&sprints, now)?;
    let current = pick.sprint();
    if let CurrentSprint::MostRecent(recent) = pick {
        eprintln!(
            "{}",
            colors::warning(&format!(
                "No active sprint found. Showing most recent: {}",
                recent.list.name
            ))
        );
    }

    let pb = spinner(&format!("Fetching tasks in {}...", current.list.name));
    let tasks = sprint::sprint_tasks(session.client()?, &current.list.id);
    pb.finish_and_clear();
    let tasks = tasks.with_context(|| format!("failed to fetch tasks for {}", current.list.name))?;

    if json {
        return print_json(&CurrentSprintReport {
            sprint: current.summary(now),
            active: matches!(pick, CurrentSprint::Active(_)),
            tasks: &tasks,
        });
    }

    println!(
        "{}  {}  {}",
        current.list.name.bold(),
        colors::secondary(&current.date_range()),
        colors::secondary(&format!("{} tasks", tasks.len()))
    );
    if tasks.is_empty() {
        println!("\nNo tasks in this sprint.");
        return Ok(());
    }

    for group in sprint::group_by_status(&tasks) {
        println!(
            "\n{} {}",
            ui::status_colored(&group.status.to_uppercase()),
            colors::secondary(&format!("({})", group.tasks.len()))
        );
        let rows: Vec<Vec<String>> = group.tasks.iter().map(|task| task_row(task)).collect();
        for line in format::columns(&rows) {
            println!("  {}", line);
        }
    }

    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup task view <task-id>", colors::secondary("View:"));
    println!("  {}  clickup status set <status> <task-id>", colors::secondary("Move:"));
    Ok(())
}

/// One board row: ID, name, assignees, priority, points, estimate,
/// tracked time and due date.
fn task_row(task: &Task) -> Vec<String> {
    let assignees = task.assignee_names();
    let due: Option<DateTime<Utc>> = sprint::parse_ms(task.due_date.as_deref());
    vec![
        task.display_id().to_string(),
        format::truncate_title(&task.name, 50),
        if assignees.is_empty() {
            "-".to_string()
        } else {
            assignees.join(", ")
        },
        task.priority_name().unwrap_or("-").to_string(),
        task.points.map(format_points).unwrap_or_default(),
        sprint::format_duration_ms(task.time_estimate.unwrap_or(0)),
        sprint::format_duration_ms(task.time_spent.unwrap_or(0)),
        due.map(sprint::short_date).unwrap_or_default(),
    ]
}

fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{}pt", points as i64)
    } else {
        format!("{}pt", points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_row() {
        let task: Task = serde_json::from_value(json!({
            "id": "86abc",
            "custom_id": "ENG-7",
            "name": "Checkout flow",
            "assignees": [{"id": 1, "username": "alice"}, {"id": 2, "username": "bob"}],
            "priority": {"priority": "high"},
            "points": 3,
            "time_estimate": 5_400_000,
            "time_spent": 1_800_000
        }))
        .unwrap();
        assert_eq!(
            task_row(&task),
            vec!["ENG-7", "Checkout flow", "alice, bob", "high", "3pt", "1h 30m", "30m", ""]
        );
    }

    #[test]
    fn test_task_row_placeholders() {
        let task: Task = serde_json::from_value(json!({"id": "86abc", "name": "Bare"})).unwrap();
        assert_eq!(task_row(&task), vec!["86abc", "Bare", "-", "-", "", "", "", ""]);
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(5.0), "5pt");
        assert_eq!(format_points(0.5), "0.5pt");
    }
}
