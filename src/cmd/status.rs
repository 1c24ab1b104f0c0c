//! `clickup status set|list`

use anyhow::{bail, Context, Result};
use colored::Colorize;

use clickup::auth::Session;
use clickup::config::ConfigError;
use clickup::status_match::match_status;
use clickup::ui::{self, colors};

use super::resolve_task;

pub fn cmd_status_set(session: &Session, target: &str, task: Option<&str>) -> Result<()> {
    let task = resolve_task(session, task)?;
    let client = session.client()?;

    let current = client.get_task(&task)?;
    let available = client
        .space_statuses(&current.space.id)
        .with_context(|| format!("failed to fetch statuses for space {}", current.space.id))?;
    if available.is_empty() {
        bail!("no statuses found for space {}", current.space.id);
    }

    let matched = match_status(target, &available)?;
    client.update_task_status(&task, &matched)?;

    println!(
        "Status changed: {} {} {}",
        ui::status_colored(&format!("'{}'", current.status.status)),
        colors::secondary("→"),
        ui::status_colored(&format!("'{}'", matched)),
    );
    Ok(())
}

/// Space from the flag, the directory default, or the global setting.
pub fn resolve_space(session: &Session, explicit: Option<&str>) -> Result<String> {
    if let Some(space) = explicit.filter(|s| !s.is_empty()) {
        return Ok(space.to_string());
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config = session.config();
    config
        .space_for_dir(&cwd)
        .or(Some(config.space.as_str()).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingSpace.into())
}

pub fn cmd_status_list(session: &Session, space: Option<&str>) -> Result<()> {
    let space_id = resolve_space(session, space)?;
    let space = session
        .client()?
        .space(&space_id)
        .with_context(|| format!("failed to fetch space {}", space_id))?;

    if space.statuses.is_empty() {
        eprintln!("No statuses found for this space.");
        return Ok(());
    }

    println!(
        "Showing {} statuses for space {}\n",
        space.statuses.len(),
        space.name.bold()
    );
    let rows: Vec<Vec<String>> = space
        .statuses
        .iter()
        .map(|s| vec![s.status.clone(), s.kind.clone()])
        .collect();
    for (line, status) in ui::format::columns(&rows).iter().zip(&space.statuses) {
        let name_len = status.status.chars().count();
        let (name, rest) = line.split_at(line.char_indices().nth(name_len).map_or(line.len(), |(i, _)| i));
        println!("  {}{}", ui::status_colored(name), colors::secondary(rest));
    }

    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup status set <status> <task-id>", colors::secondary("Set:"));
    Ok(())
}
