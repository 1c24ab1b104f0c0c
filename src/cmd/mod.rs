//! Command handlers for the clickup CLI.
//!
//! Handlers take the [`Session`] built in `main` and return `anyhow::Result`;
//! API errors are passed through unchanged so `main` can pick the exit code.

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use clickup::auth::Session;
use clickup::taskid::{self, TaskIdentifier};
use clickup::ui::{self, colors};

pub mod auth;
pub mod comment;
pub mod config;
pub mod inbox;
pub mod link;
pub mod space;
pub mod sprint;
pub mod status;
pub mod task;

/// True when stdin is a terminal and the user has not disabled prompts.
pub fn can_prompt(session: &Session) -> bool {
    atty::is(atty::Stream::Stdin) && session.config().prompts_enabled()
}

/// Pick the task a command acts on.
///
/// An explicit ID wins, then the ID in the current branch name, then an
/// interactive prompt. Without a terminal the error carries the branch
/// naming hint.
pub fn resolve_task(session: &Session, explicit: Option<&str>) -> Result<TaskIdentifier> {
    if let Some(text) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(taskid::parse_user_input(text));
    }

    let branch = session.repo().map(|repo| repo.branch.clone());
    if let Some(found) = session.repo().and_then(|repo| repo.task.clone()) {
        ui::progress(&format!(
            "Detected task {} from branch {}",
            colors::identifier(found.raw()),
            colors::identifier(branch.as_deref().unwrap_or_default())
        ));
        return Ok(found);
    }

    if can_prompt(session) {
        let typed: String = dialoguer::Input::new()
            .with_prompt("Task ID")
            .interact_text()?;
        let typed = typed.trim();
        if !typed.is_empty() {
            return Ok(taskid::parse_user_input(typed));
        }
    }

    match branch {
        Some(branch) => bail!(
            "{}\nOr pass the task explicitly with --task <id>",
            taskid::branch_naming_suggestion(&branch)
        ),
        None => bail!("no task given and not inside a git repository\n\nPass the task explicitly with --task <id>"),
    }
}

/// Spinner on stderr; hidden in quiet mode or when stderr is not a terminal.
pub fn spinner(message: &str) -> ProgressBar {
    if clickup::ui::is_quiet() || !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `owner/repo` from the flag, else from the origin remote.
pub fn resolve_repo(session: &Session, explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| session.repo().and_then(|repo| repo.full_name()))
}
