//! Git queries: current branch, GitHub remote and commit lookups.
//!
//! Everything shells out to `git` in the working directory (or the directory
//! passed to the `_in` variants).

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

use crate::taskid::{self, TaskIdentifier};

/// Run a git command with arguments and return stdout on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute or exits with non-zero status.
fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    let output = command
        .args(args)
        .output()
        .context(format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn is_inside_work_tree(dir: Option<&Path>) -> bool {
    run_git(dir, &["rev-parse", "--is-inside-work-tree"]).is_ok()
}

/// Get the current branch name ("HEAD" when detached).
pub fn current_branch(dir: Option<&Path>) -> Result<String> {
    run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn remote_url(dir: Option<&Path>, remote: &str) -> Result<String> {
    run_git(dir, &["remote", "get-url", remote])
}

/// Full SHA of a commit reference.
pub fn resolve_commit(dir: Option<&Path>, reference: &str) -> Result<String> {
    run_git(dir, &["rev-parse", reference])
}

/// First line of a commit message.
pub fn commit_subject(dir: Option<&Path>, reference: &str) -> Result<String> {
    run_git(dir, &["log", "-1", "--format=%s", reference])
}

/// Split a GitHub remote URL (SSH or HTTPS) into owner and repository.
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    if parts.next().is_some() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// What the working directory tells us about the task being worked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    pub branch: String,
    pub remote_url: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub task: Option<TaskIdentifier>,
}

impl RepoContext {
    pub fn detect() -> Result<Self> {
        Self::detect_at(None)
    }

    pub fn detect_in(dir: &Path) -> Result<Self> {
        Self::detect_at(Some(dir))
    }

    fn detect_at(dir: Option<&Path>) -> Result<Self> {
        if !is_inside_work_tree(dir) {
            anyhow::bail!("not inside a git repository");
        }

        let branch = current_branch(dir).context("failed to detect branch")?;
        let task = taskid::extract_from_branch(&branch);
        let remote_url = remote_url(dir, "origin").ok();
        let (owner, repo) = match remote_url.as_deref().and_then(parse_github_url) {
            Some((owner, repo)) => (Some(owner), Some(repo)),
            None => (None, None),
        };

        Ok(Self {
            branch,
            remote_url,
            owner,
            repo,
            task,
        })
    }

    /// `owner/repo` when the origin is on GitHub.
    pub fn full_name(&self) -> Option<String> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Some(format!("{}/{}", owner, repo)),
            _ => None,
        }
    }

    pub fn commit_url(&self, sha: &str) -> Option<String> {
        self.full_name()
            .map(|name| format!("https://github.com/{}/commit/{}", name, sha))
    }
}
