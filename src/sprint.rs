//! Sprints: the dated lists inside a sprint folder.
//!
//! A space keeps its sprints in a folder whose name mentions "sprint"; every
//! list in that folder is one sprint, bounded by the list's start and due
//! dates.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::api::models::{Folder, Task, TaskList};
use crate::api::{ApiError, ClickUpClient, Transport};

/// Upper bound on list pages fetched for one sprint.
pub const MAX_TASK_PAGES: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SprintError {
    #[error("no sprint folders found in this space\n\nPass the folder explicitly with --folder <id>")]
    NoFolders,

    #[error("multiple sprint folders found:\n{}\n\nUse --folder <id> to select one", .0.join("\n"))]
    AmbiguousFolders(Vec<String>),

    #[error("no sprints with dates found in this folder")]
    NoDatedSprints,
}

/// Folder names containing "sprint" but not "archive", ignoring case.
pub fn is_sprint_folder(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("sprint") && !name.contains("archive")
}

/// The single sprint folder among `folders`.
pub fn pick_sprint_folder(folders: &[Folder]) -> Result<&Folder, SprintError> {
    let candidates: Vec<&Folder> = folders.iter().filter(|f| is_sprint_folder(&f.name)).collect();
    match candidates.as_slice() {
        [] => Err(SprintError::NoFolders),
        [only] => Ok(only),
        many => Err(SprintError::AmbiguousFolders(
            many.iter()
                .map(|f| format!("  {} ({})", f.name, f.id))
                .collect(),
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SprintState {
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "upcoming")]
    Upcoming,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SprintState {
    pub fn classify(
        start: Option<DateTime<Utc>>,
        due: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match (start, due) {
            (None, None) => SprintState::Unknown,
            (_, Some(due)) if now > due => SprintState::Complete,
            (Some(start), Some(_)) if now >= start => SprintState::InProgress,
            (Some(start), _) if now < start => SprintState::Upcoming,
            _ => SprintState::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SprintState::Complete => "complete",
            SprintState::InProgress => "in progress",
            SprintState::Upcoming => "upcoming",
            SprintState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A sprint list with its dates parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprint {
    pub list: TaskList,
    pub start: Option<DateTime<Utc>>,
    pub due: Option<DateTime<Utc>>,
}

impl From<TaskList> for Sprint {
    fn from(list: TaskList) -> Self {
        let start = parse_ms(list.start_date.as_deref());
        let due = parse_ms(list.due_date.as_deref());
        Self { list, start, due }
    }
}

impl Sprint {
    pub fn state(&self, now: DateTime<Utc>) -> SprintState {
        SprintState::classify(self.start, self.due, now)
    }

    fn contains(&self, now: DateTime<Utc>) -> bool {
        matches!((self.start, self.due), (Some(start), Some(due)) if start <= now && now <= due)
    }

    pub fn date_range(&self) -> String {
        format_date_range(self.start, self.due)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SprintSummary {
        SprintSummary {
            id: self.list.id.clone(),
            name: self.list.name.clone(),
            task_count: self.list.task_count(),
            start_date: self.list.start_date.clone().unwrap_or_default(),
            due_date: self.list.due_date.clone().unwrap_or_default(),
            status: self.state(now),
        }
    }
}

/// JSON shape of `sprint list --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintSummary {
    pub id: String,
    pub name: String,
    pub task_count: u64,
    pub start_date: String,
    pub due_date: String,
    pub status: SprintState,
}

/// The sprint to show as current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentSprint<'a> {
    /// Today falls inside its dates.
    Active(&'a Sprint),
    /// Nothing is running; this one started last.
    MostRecent(&'a Sprint),
}

impl<'a> CurrentSprint<'a> {
    pub fn sprint(self) -> &'a Sprint {
        match self {
            CurrentSprint::Active(sprint) | CurrentSprint::MostRecent(sprint) => sprint,
        }
    }
}

/// First sprint whose dates contain `now`, else the one with the latest
/// start date.
pub fn current_sprint(sprints: &[Sprint], now: DateTime<Utc>) -> Result<CurrentSprint<'_>, SprintError> {
    if let Some(active) = sprints.iter().find(|s| s.contains(now)) {
        return Ok(CurrentSprint::Active(active));
    }

    let mut latest: Option<(&Sprint, DateTime<Utc>)> = None;
    for sprint in sprints {
        if let Some(start) = sprint.start {
            if latest.map_or(true, |(_, best)| start > best) {
                latest = Some((sprint, start));
            }
        }
    }
    latest
        .map(|(sprint, _)| CurrentSprint::MostRecent(sprint))
        .ok_or(SprintError::NoDatedSprints)
}

/// Every task of a sprint list, closed tasks and subtasks included.
pub fn sprint_tasks<T: Transport>(
    client: &ClickUpClient<T>,
    list_id: &str,
) -> Result<Vec<Task>, ApiError> {
    let mut tasks = Vec::new();
    for page in 0..MAX_TASK_PAGES {
        let batch = client.list_tasks(list_id, page)?;
        if batch.tasks.is_empty() {
            break;
        }
        let last_page = batch.last_page == Some(true);
        tasks.extend(batch.tasks);
        if last_page {
            break;
        }
    }
    tracing::debug!(list = list_id, count = tasks.len(), "fetched sprint tasks");
    Ok(tasks)
}

/// Tasks sharing a status, in the order the statuses first appear.
#[derive(Debug)]
pub struct StatusGroup<'a> {
    pub status: &'a str,
    pub tasks: Vec<&'a Task>,
}

pub fn group_by_status(tasks: &[Task]) -> Vec<StatusGroup<'_>> {
    let mut groups: Vec<StatusGroup<'_>> = Vec::new();
    for task in tasks {
        let status = task.status.status.as_str();
        match groups.iter_mut().find(|g| g.status == status) {
            Some(group) => group.tasks.push(task),
            None => groups.push(StatusGroup {
                status,
                tasks: vec![task],
            }),
        }
    }
    groups
}

/// Epoch milliseconds as ClickUp sends them; empty and zero mean unset.
pub fn parse_ms(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|ms| *ms > 0)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// "Jan 02" in local time.
pub fn short_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %d").to_string()
}

pub fn format_date_range(start: Option<DateTime<Utc>>, due: Option<DateTime<Utc>>) -> String {
    match (start, due) {
        (None, None) => "-".to_string(),
        (None, Some(due)) => format!("ends {}", short_date(due)),
        (Some(start), None) => format!("started {}", short_date(start)),
        (Some(start), Some(due)) => format!("{} - {}", short_date(start), short_date(due)),
    }
}

/// Tracked or estimated time: "2h 5m", "2h", "45m", "< 1m", or empty
/// when there is none.
pub fn format_duration_ms(ms: i64) -> String {
    if ms <= 0 {
        return String::new();
    }
    let minutes = ms / 60_000;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    match (hours, minutes) {
        (0, 0) => "< 1m".to_string(),
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}
