//! Pull request lookups through the GitHub CLI (`gh`).

use serde::Deserialize;
use std::io;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhError {
    #[error(
        "the GitHub CLI (gh) is not installed or not in PATH\n\n\
         Install it from https://cli.github.com/ and authenticate with 'gh auth login'"
    )]
    NotInstalled,

    #[error("{context}: {detail}")]
    Failed { context: String, detail: String },

    #[error("failed to parse gh output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no PR found for task {task}\n\nProvide a PR number as an argument, e.g.: clickup link pr 42 --task {task}")]
    NoPullRequest { task: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
}

impl PullRequest {
    /// `owner/repo` taken from the PR URL.
    pub fn repo(&self) -> Option<String> {
        infer_repo_from_url(&self.url)
    }
}

#[derive(Debug, Deserialize)]
struct ListedPullRequest {
    #[serde(flatten)]
    pr: PullRequest,
    #[serde(default, rename = "headRefName")]
    head_ref_name: String,
}

const PR_FIELDS: &str = "number,title,body,url";

/// Thin wrapper over the `gh` executable.
pub struct GhCli {
    program: String,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GhCli {
    pub fn new() -> Self {
        Self::with_program("gh")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str], context: &str) -> Result<Vec<u8>, GhError> {
        tracing::debug!(args = ?args, "running gh");
        let output = match Command::new(&self.program).args(args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(GhError::NotInstalled),
            Err(e) => {
                return Err(GhError::Failed {
                    context: context.to_string(),
                    detail: e.to_string(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GhError::Failed {
                context: context.to_string(),
                detail: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }
        Ok(output.stdout)
    }

    /// Fetch a PR by number, or the PR of the current branch when `number` is `None`.
    pub fn view(&self, number: Option<u64>, repo: Option<&str>) -> Result<PullRequest, GhError> {
        let number_arg = number.map(|n| n.to_string());
        let mut args = vec!["pr", "view"];
        if let Some(n) = number_arg.as_deref() {
            args.push(n);
        }
        args.extend(["--json", PR_FIELDS]);
        if let Some(repo) = repo {
            args.extend(["--repo", repo]);
        }

        let context = match number {
            Some(n) => format!("failed to fetch PR #{}", n),
            None => "failed to detect current PR.\n\n\
                     Make sure you have an open PR for the current branch, \
                     or provide a PR number as an argument"
                .to_string(),
        };
        let out = self.run(&args, &context)?;
        Ok(serde_json::from_slice(&out)?)
    }

    /// Find the PR for a task: one whose head branch mentions the task ID
    /// wins, otherwise the first search hit.
    pub fn find_for_task(&self, task_id: &str, repo: Option<&str>) -> Result<PullRequest, GhError> {
        let mut args = vec![
            "pr",
            "list",
            "--search",
            task_id,
            "--state",
            "all",
            "--json",
            "number,title,body,url,headRefName",
            "--limit",
            "10",
        ];
        if let Some(repo) = repo {
            args.extend(["--repo", repo]);
        }

        let out = self.run(&args, &format!("failed to search PRs for task {}", task_id))?;
        let listed: Vec<ListedPullRequest> = serde_json::from_slice(&out)?;

        let preferred = listed
            .iter()
            .position(|item| item.head_ref_name.contains(task_id))
            .unwrap_or(0);
        listed
            .into_iter()
            .nth(preferred)
            .map(|item| item.pr)
            .ok_or_else(|| GhError::NoPullRequest {
                task: task_id.to_string(),
            })
    }

    pub fn edit_body(&self, number: u64, body: &str, repo: Option<&str>) -> Result<(), GhError> {
        let number_arg = number.to_string();
        let mut args = vec!["pr", "edit", number_arg.as_str(), "--body", body];
        if let Some(repo) = repo {
            args.extend(["--repo", repo]);
        }
        self.run(&args, &format!("failed to update PR #{}", number))?;
        Ok(())
    }
}

/// `owner/repo` from a `https://github.com/owner/repo/...` URL.
pub fn infer_repo_from_url(url: &str) -> Option<String> {
    let path = url.strip_prefix("https://github.com/")?;
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let owner = parts.next()?;
    let repo = parts.next()?;
    Some(format!("{}/{}", owner, repo))
}
