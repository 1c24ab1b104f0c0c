//! Recent @mentions of the current user.
//!
//! ClickUp has no public inbox endpoint, so the inbox is approximated by
//! reading the comments of recently updated tasks and keeping those that
//! mention the user's handle.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

use crate::api::models::Task;
use crate::api::{ApiError, ClickUpClient, TaskQuery, Transport};
use crate::fanout::{run_bounded, Deadline, DEFAULT_CONCURRENCY};
use crate::taskid::TaskIdentifier;

pub const DEFAULT_DAYS: u32 = 7;
pub const DEFAULT_TASK_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mention {
    pub task_id: String,
    pub task_name: String,
    pub comment_id: String,
    pub comment_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    pub author: String,
    /// Milliseconds since the epoch, as ClickUp sends it.
    pub date: String,
    #[serde(skip)]
    pub date_ms: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct InboxQuery {
    pub days: u32,
    pub task_limit: usize,
}

impl Default for InboxQuery {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            task_limit: DEFAULT_TASK_LIMIT,
        }
    }
}

#[derive(Debug, Default)]
pub struct InboxReport {
    /// Tasks whose comments were read.
    pub tasks_scanned: usize,
    /// Oldest first.
    pub mentions: Vec<Mention>,
    pub timed_out: bool,
}

/// `@handle` or `@ handle`, ignoring case. `username` must be lowercase.
pub fn contains_mention(text: &str, username: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains(&format!("@{}", username)) || lower.contains(&format!("@ {}", username))
}

/// Tasks updated since `days` ago, across pages until `task_limit` is reached.
pub fn recent_tasks<T: Transport>(
    client: &ClickUpClient<T>,
    team_id: &str,
    query: InboxQuery,
    now: DateTime<Utc>,
    deadline: Deadline,
) -> Result<Vec<Task>, ApiError> {
    let cutoff = now - ChronoDuration::days(i64::from(query.days));
    let mut request = TaskQuery {
        include_closed: true,
        subtasks: true,
        date_updated_gt: Some(cutoff.timestamp_millis()),
        ..TaskQuery::default()
    };

    let mut tasks = Vec::new();
    while tasks.len() < query.task_limit {
        let page = client.team_tasks(team_id, &request, Some(deadline))?;
        if page.tasks.is_empty() {
            break;
        }
        let last_page = page.last_page == Some(true);
        tasks.extend(page.tasks);
        if last_page {
            break;
        }
        request.page += 1;
    }
    tasks.truncate(query.task_limit);
    Ok(tasks)
}

/// Read the comments of `tasks` and keep the mentions of `username` written
/// by someone else. Tasks whose comments cannot be fetched are skipped.
pub fn collect_mentions<T: Transport>(
    client: &ClickUpClient<T>,
    tasks: &[Task],
    username: &str,
    deadline: Deadline,
) -> InboxReport {
    let username = username.to_lowercase();
    let fetched = run_bounded(tasks, DEFAULT_CONCURRENCY, Some(deadline), |task| {
        client.task_comments(&TaskIdentifier::native(&task.id), Some(deadline))
    });
    let timed_out = fetched.timed_out;

    let mut mentions = Vec::new();
    for (task, comments) in tasks.iter().zip(fetched.results) {
        let comments = match comments {
            Some(Ok(comments)) => comments,
            Some(Err(e)) => {
                tracing::debug!(task = %task.id, error = %e, "skipping task comments");
                continue;
            }
            None => continue,
        };

        for comment in comments {
            if !contains_mention(&comment.comment_text, &username)
                || comment.user.username.to_lowercase() == username
            {
                continue;
            }
            mentions.push(Mention {
                task_id: task.id.clone(),
                task_name: task.name.clone(),
                attachments: comment.attachment_urls(),
                author: comment.user.username.clone(),
                date_ms: comment.timestamp_ms().unwrap_or(0),
                comment_id: comment.id,
                comment_text: comment.comment_text,
                date: comment.date,
            });
        }
    }

    mentions.sort_by_key(|m| m.date_ms);
    InboxReport {
        tasks_scanned: tasks.len(),
        mentions,
        timed_out,
    }
}
