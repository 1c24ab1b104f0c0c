//! `clickup task view|search`

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;

use clickup::api::models::Task;
use clickup::auth::Session;
use clickup::fanout::{Deadline, SEARCH_BUDGET};
use clickup::search::{self, SearchEvent, SearchOptions};
use clickup::ui::{self, colors, format};

use super::{print_json, resolve_task, spinner};

pub fn cmd_task_view(session: &Session, task: Option<&str>, json: bool) -> Result<()> {
    let id = resolve_task(session, task)?;
    let task = session
        .client()?
        .get_task(&id)
        .with_context(|| format!("failed to fetch task {}", id.raw()))?;

    if json {
        return print_json(&task);
    }
    print_task(&task);
    Ok(())
}

fn print_task(task: &Task) {
    println!(
        "{} {}",
        task.name.bold(),
        colors::secondary(&format!("#{}", task.display_id()))
    );

    let location: Vec<&str> = [task.space.name.as_str(), task.list.name.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if !location.is_empty() {
        println!("{} {}", "Location:".bold(), location.join(" > "));
    }
    println!("{} {}", "Status:".bold(), ui::status_colored(&task.status.status));
    if let Some(priority) = task.priority_name() {
        println!("{} {}", "Priority:".bold(), priority);
    }
    let assignees = task.assignee_names();
    if !assignees.is_empty() {
        println!("{} {}", "Assignees:".bold(), assignees.join(", "));
    }
    if let Some(ms) = task.date_updated.as_deref().and_then(|d| d.parse::<i64>().ok()) {
        if let Some(when) = Utc.timestamp_millis_opt(ms).single() {
            println!(
                "{} {} ({})",
                "Updated:".bold(),
                when.format("%Y-%m-%d %H:%M"),
                format::relative_time(ms, Utc::now())
            );
        }
    }
    println!("{} {}", "URL:".bold(), colors::identifier(&task.app_url()));

    let fields: Vec<(&str, String)> = task
        .custom_fields
        .iter()
        .filter_map(|field| {
            field
                .value()
                .as_text()
                .map(|text| (field.name.as_str(), text.to_string()))
        })
        .collect();
    if !fields.is_empty() {
        println!("\n{}", "Custom Fields:".bold());
        for (name, value) in fields {
            println!("  {}: {}", name, value);
        }
    }

    let description = task.markdown().trim();
    if !description.is_empty() {
        println!("\n{}", "Description:".bold());
        for line in description.lines() {
            println!("  {}", line);
        }
    }
}

#[derive(Serialize)]
struct SearchHit<'a> {
    id: &'a str,
    name: &'a str,
    status: &'a str,
    #[serde(rename = "match")]
    kind: search::MatchKind,
    url: String,
}

pub fn cmd_task_search(session: &Session, query: &str, comments: bool, json: bool) -> Result<()> {
    let team_id = session.config().require_workspace()?.to_string();
    let client = session.client()?;

    let pb = spinner(&format!("Searching for {:?}...", query));
    let on_event = |event: SearchEvent| match event {
        SearchEvent::PageScanned { page, tasks } => {
            pb.set_message(format!("scanned page {} ({} tasks)...", page, tasks))
        }
        SearchEvent::CheckingComments { tasks } => {
            pb.set_message(format!("checking comments on {} tasks...", tasks))
        }
        SearchEvent::TryingWords => {
            pb.set_message(format!("no exact match for {:?}, trying individual words...", query))
        }
    };
    let options = SearchOptions {
        comments,
        ..SearchOptions::default()
    };
    let report = search::search(
        client,
        &team_id,
        query,
        options,
        Deadline::after(SEARCH_BUDGET),
        &on_event,
    )?;
    pb.finish_and_clear();

    if report.timed_out {
        eprintln!(
            "{}",
            colors::warning("Search timed out; showing what was found so far")
        );
    }

    if json {
        let hits: Vec<SearchHit> = report
            .results
            .iter()
            .map(|scored| SearchHit {
                id: &scored.task.id,
                name: &scored.task.name,
                status: &scored.task.status.status,
                kind: scored.kind,
                url: scored.task.app_url(),
            })
            .collect();
        return print_json(&hits);
    }

    if report.results.is_empty() {
        eprintln!("No tasks found matching {:?}", query);
        return Ok(());
    }

    ui::progress(&format!("Found {} results.", report.results.len()));
    let rows: Vec<Vec<String>> = report
        .results
        .iter()
        .map(|scored| {
            vec![
                scored.task.display_id().to_string(),
                format::truncate_title(&scored.task.name, 60),
                scored.task.status.status.clone(),
                scored.kind.label().to_string(),
            ]
        })
        .collect();
    for line in format::columns(&rows) {
        println!("{}", line);
    }
    Ok(())
}
