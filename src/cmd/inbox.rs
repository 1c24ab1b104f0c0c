//! `clickup inbox`

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

use clickup::auth::Session;
use clickup::fanout::{Deadline, SEARCH_BUDGET};
use clickup::inbox::{self, InboxQuery};
use clickup::ui::{self, colors, format};

use super::{print_json, spinner};

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("1 {}", word)
    } else {
        format!("{} {}s", count, word)
    }
}

pub fn cmd_inbox(session: &Session, days: u32, limit: usize, json: bool) -> Result<()> {
    let team_id = session.config().require_workspace()?.to_string();
    let client = session.client()?;
    let deadline = Deadline::after(SEARCH_BUDGET);

    ui::progress("Fetching your user info...");
    let user = client.current_user().context("failed to get user info")?;

    ui::progress(&format!(
        "Scanning tasks updated in the last {} for @{}...",
        plural(days as usize, "day"),
        user.username
    ));
    let query = InboxQuery {
        days,
        task_limit: limit,
    };
    let tasks = inbox::recent_tasks(client, &team_id, query, Utc::now(), deadline)
        .context("failed to fetch tasks")?;
    if tasks.is_empty() {
        eprintln!("No recently updated tasks found.");
        return Ok(());
    }

    let pb = spinner(&format!("Checking comments on {}...", plural(tasks.len(), "task")));
    let report = inbox::collect_mentions(client, &tasks, &user.username, deadline);
    pb.finish_and_clear();
    if report.timed_out {
        eprintln!(
            "{}",
            colors::warning("Scan timed out; some tasks were not checked")
        );
    }

    if json {
        return print_json(&report.mentions);
    }

    if report.mentions.is_empty() {
        println!("No @mentions found in the last {}.", plural(days as usize, "day"));
        return Ok(());
    }

    ui::progress(&format!(
        "\nShowing {} from the last {}\n",
        plural(report.mentions.len(), "mention"),
        plural(days as usize, "day")
    ));

    let now = Utc::now();
    for (i, mention) in report.mentions.iter().enumerate() {
        let when = match mention.date.parse::<i64>() {
            Ok(ms) => format::relative_time(ms, now),
            Err(_) => mention.date.clone(),
        };
        println!(
            "{} commented on {}  {}",
            mention.author.bold(),
            colors::identifier(&format!("#{}", mention.task_id)),
            colors::secondary(&when)
        );
        println!("{}", mention.task_name);
        println!("\n  {}", mention.comment_text.trim());
        for url in &mention.attachments {
            println!("  {} {}", colors::secondary("attachment:"), url);
        }
        if i + 1 < report.mentions.len() {
            println!();
        }
    }

    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup task view <task-id>", colors::secondary("View:"));
    println!("  {}  clickup inbox --json", colors::secondary("JSON:"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "day"), "1 day");
        assert_eq!(plural(7, "day"), "7 days");
        assert_eq!(plural(0, "mention"), "0 mentions");
    }
}
