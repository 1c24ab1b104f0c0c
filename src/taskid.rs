//! Task identifier detection from git branch names and user input.
//!
//! ClickUp tasks are addressed either by their native ID (`CU-86d1u2bz4`,
//! sent to the API without the `CU-` prefix) or by an organization-defined
//! custom ID such as `PROJ-42`, which is sent verbatim.

use regex::Regex;
use std::fmt::{self, Display, Formatter};
use std::sync::OnceLock;

/// Branch naming prefixes stripped before looking for an identifier.
const BRANCH_PREFIXES: &[&str] = &[
    "feature/", "fix/", "hotfix/", "bugfix/", "release/", "chore/", "docs/", "refactor/",
    "test/", "ci/",
];

/// Uppercase words that look like custom ID prefixes but are branch conventions.
const EXCLUDED_PREFIXES: &[&str] = &[
    "FEATURE", "BUGFIX", "RELEASE", "HOTFIX", "FIX", "CHORE", "DOCS", "REFACTOR", "TEST",
];

fn default_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)CU-([0-9a-z]+)").expect("valid CU- pattern"))
}

fn custom_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([A-Z][A-Z0-9]+-\d+)").expect("valid custom ID pattern"))
}

/// A task identifier found in a branch name or typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentifier {
    raw: String,
    id: String,
    is_custom_id: bool,
}

impl TaskIdentifier {
    /// Wrap an ID the API handed back, which is always the native one.
    pub fn native(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            raw: id.clone(),
            id,
            is_custom_id: false,
        }
    }

    /// The exact matched text, e.g. `CU-ae27de` or `PROJ-42`.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The value to send to the API.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True for organization-defined `PREFIX-number` IDs.
    pub fn is_custom_id(&self) -> bool {
        self.is_custom_id
    }
}

impl Display for TaskIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Outcome of matching the custom `PREFIX-number` pattern.
enum CustomMatch {
    Found(TaskIdentifier),
    Excluded,
    Missing,
}

fn match_default(text: &str) -> Option<TaskIdentifier> {
    let caps = default_id_pattern().captures(text)?;
    let whole = caps.get(0)?;
    let id = caps.get(1)?;
    Some(TaskIdentifier {
        raw: whole.as_str().to_string(),
        id: id.as_str().to_string(),
        is_custom_id: false,
    })
}

fn match_custom(text: &str) -> CustomMatch {
    let Some(found) = custom_id_pattern().find(text) else {
        return CustomMatch::Missing;
    };
    let raw = found.as_str();
    let prefix = raw.split('-').next().unwrap_or_default();
    if EXCLUDED_PREFIXES.contains(&prefix) {
        return CustomMatch::Excluded;
    }
    CustomMatch::Found(TaskIdentifier {
        raw: raw.to_string(),
        id: raw.to_string(),
        is_custom_id: true,
    })
}

fn strip_branch_prefix(branch: &str) -> &str {
    BRANCH_PREFIXES
        .iter()
        .find_map(|prefix| branch.strip_prefix(prefix))
        .unwrap_or(branch)
}

/// Find a task identifier in a git branch name.
///
/// `CU-` identifiers win over custom ones; within a pattern the leftmost
/// match wins. A custom match whose prefix is a branch convention such as
/// `FEATURE-123` means "no identifier".
pub fn extract_from_branch(branch: &str) -> Option<TaskIdentifier> {
    let cleaned = strip_branch_prefix(branch);

    if let Some(found) = match_default(cleaned) {
        return Some(found);
    }

    match match_custom(cleaned) {
        CustomMatch::Found(found) => Some(found),
        CustomMatch::Excluded | CustomMatch::Missing => None,
    }
}

/// Normalize a task identifier typed on the command line.
///
/// Never fails: input matching neither pattern is assumed to be a raw
/// ClickUp task ID and is passed through unchanged.
pub fn parse_user_input(text: &str) -> TaskIdentifier {
    if let Some(found) = match_default(text) {
        return found;
    }

    if let CustomMatch::Found(found) = match_custom(text) {
        return found;
    }

    TaskIdentifier {
        raw: text.to_string(),
        id: text.to_string(),
        is_custom_id: false,
    }
}

/// Hint shown when a branch carries no recognizable task ID.
pub fn branch_naming_suggestion(branch: &str) -> String {
    format!(
        "No ClickUp task ID found in branch \"{}\".\n\n\
         Tip: Include the task ID in your branch name for auto-detection:\n  \
         git checkout -b CU-abc123-my-feature-branch\n  \
         git checkout -b PROJ-42-my-feature-branch\n",
        branch
    )
}
