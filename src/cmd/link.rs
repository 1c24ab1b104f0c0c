//! `clickup link pr|branch|commit|sync`
//!
//! Each command records a GitHub artifact on the task (description block or
//! the configured link field) and posts a comment announcing it. `sync` also
//! writes the task into the PR body.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;

use clickup::auth::Session;
use clickup::git;
use clickup::github::{GhCli, GhError, PullRequest};
use clickup::link_block::LinkEntry;
use clickup::links::{self, LinkDestination};
use clickup::taskid::TaskIdentifier;
use clickup::ui::{self, colors};

use super::{resolve_repo, resolve_task};
use crate::cli::LinkTarget;

fn link_field(session: &Session) -> Option<String> {
    let cwd = std::env::current_dir().ok()?;
    session.config().link_field_for_dir(&cwd).map(str::to_string)
}

fn record(session: &Session, task: &TaskIdentifier, entry: &LinkEntry) -> Result<()> {
    let field = link_field(session);
    let outcome = links::upsert_link(session.client()?, task, field.as_deref(), entry)?;
    match &outcome {
        LinkDestination::Description { changed: false } | LinkDestination::Field { changed: false, .. } => {
            ui::progress("Link already present, nothing to update");
        }
        LinkDestination::Description { changed: true } => {
            tracing::debug!(task = %task, "description link updated");
        }
        LinkDestination::Field { name, changed: true } => {
            ui::progress(&format!("Updated field {}", colors::identifier(name)));
        }
    }
    Ok(())
}

/// PR by number, else the PR of the current branch, else a PR mentioning the task.
fn find_pull_request(
    gh: &GhCli,
    number: Option<u64>,
    task: &TaskIdentifier,
    repo: Option<&str>,
) -> Result<PullRequest, GhError> {
    if number.is_some() {
        return gh.view(number, repo);
    }
    match gh.view(None, repo) {
        Ok(pr) => Ok(pr),
        Err(GhError::NotInstalled) => Err(GhError::NotInstalled),
        Err(e) => {
            tracing::debug!(error = %e, "no PR for current branch, searching by task");
            gh.find_for_task(task.raw(), repo)
        }
    }
}

pub fn cmd_link_pr(session: &Session, number: Option<u64>, target: &LinkTarget) -> Result<()> {
    let task = resolve_task(session, target.task.as_deref())?;
    let repo = resolve_repo(session, target.repo.as_deref());

    let pr = find_pull_request(&GhCli::new(), number, &task, target.repo.as_deref())?;
    let repo = repo
        .or_else(|| pr.repo())
        .ok_or_else(|| anyhow!("could not determine the GitHub repository\n\nPass it with --repo owner/repo"))?;

    let entry = LinkEntry::pull_request(&repo, pr.number, &pr.title, &pr.url);
    record(session, &task, &entry)?;
    session.client()?.post_rich_comment(
        &task,
        &links::pull_request_comment(&repo, pr.number, &pr.title, &pr.url),
    )?;

    println!(
        "{} Linked PR #{} to task {}",
        colors::success("!"),
        pr.number,
        task.raw().bold()
    );
    Ok(())
}

pub fn cmd_link_branch(session: &Session, target: &LinkTarget) -> Result<()> {
    let task = resolve_task(session, target.task.as_deref())?;
    let context = session
        .repo()
        .ok_or_else(|| anyhow!("not inside a git repository\n\nRun this from the repository whose branch you want to link"))?;
    let repo = resolve_repo(session, target.repo.as_deref())
        .or_else(|| context.remote_url.clone())
        .unwrap_or_else(|| "local repository".to_string());

    let entry = LinkEntry::branch(&context.branch, &repo);
    record(session, &task, &entry)?;
    session
        .client()?
        .post_rich_comment(&task, &links::branch_comment(&context.branch, &repo))?;

    println!(
        "{} Linked branch {} to task {}",
        colors::success("!"),
        colors::identifier(&context.branch),
        task.raw().bold()
    );
    Ok(())
}

pub fn cmd_link_commit(session: &Session, sha: Option<&str>, target: &LinkTarget) -> Result<()> {
    let task = resolve_task(session, target.task.as_deref())?;
    let reference = sha.unwrap_or("HEAD");

    let full = git::resolve_commit(None, reference)
        .with_context(|| format!("could not resolve commit {:?}", reference))?;
    let subject = git::commit_subject(None, &full)
        .with_context(|| format!("could not get commit message for {:?}", reference))?;
    let short: String = full.chars().take(7).collect();

    let url = match target.repo.as_deref() {
        Some(repo) => format!("https://github.com/{}/commit/{}", repo, full),
        None => session
            .repo()
            .and_then(|context| context.commit_url(&full))
            .ok_or_else(|| anyhow!("could not determine the GitHub repository\n\nPass it with --repo owner/repo"))?,
    };

    let entry = LinkEntry::commit(&short, &subject, &url);
    record(session, &task, &entry)?;
    session
        .client()?
        .post_comment(&task, &links::commit_comment(&short, &url, &subject))?;

    println!(
        "{} Linked commit {} to task {}",
        colors::success("!"),
        colors::identifier(&short),
        task.raw().bold()
    );
    Ok(())
}

pub fn cmd_link_sync(session: &Session, number: Option<u64>, target: &LinkTarget) -> Result<()> {
    let task = resolve_task(session, target.task.as_deref())?;
    ui::progress(&format!("Syncing task {} with GitHub PR...", task.raw().bold()));

    let client = session.client()?;
    let details = client.get_task(&task).context("failed to fetch task")?;

    let gh = GhCli::new();
    let pr = find_pull_request(&gh, number, &task, target.repo.as_deref())?;
    let task_entry = LinkEntry::task(&details.app_url(), &details.name, &details.status.status);

    match links::sync_pull_request_body(&pr.body, &task_entry) {
        Some(body) => {
            gh.edit_body(pr.number, &body, target.repo.as_deref())
                .context("failed to update PR body")?;
            println!(
                "{} Updated PR #{} body with ClickUp task info",
                colors::success("!"),
                pr.number
            );
        }
        None => println!("PR #{} body already up to date", pr.number),
    }

    let repo = target
        .repo
        .clone()
        .or_else(|| pr.repo())
        .or_else(|| resolve_repo(session, None))
        .ok_or_else(|| anyhow!("could not determine the GitHub repository\n\nPass it with --repo owner/repo"))?;
    let pr_entry = LinkEntry::pull_request(&repo, pr.number, &pr.title, &pr.url);
    record(session, &task, &pr_entry)?;
    client.post_rich_comment(
        &task,
        &links::pull_request_comment(&repo, pr.number, &pr.title, &pr.url),
    )?;

    println!(
        "{} Linked PR #{} to task {}",
        colors::success("!"),
        pr.number,
        task.raw().bold()
    );
    Ok(())
}
