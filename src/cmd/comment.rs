//! `clickup comment add|list`

use anyhow::{bail, Context, Result};
use chrono::Utc;
use colored::Colorize;

use clickup::auth::Session;
use clickup::ui::{colors, format};

use super::{can_prompt, print_json, resolve_task};

/// Trimmed comment text, refusing an empty one.
fn comment_body(text: &str) -> Result<String> {
    let body = text.trim();
    if body.is_empty() {
        bail!("comment body cannot be empty");
    }
    Ok(body.to_string())
}

/// Open the configured editor (or `$VISUAL`/`$EDITOR`) on `initial`.
fn compose_in_editor(command: Option<&str>, initial: &str) -> Result<String> {
    let mut editor = dialoguer::Editor::new();
    editor.extension(".md").require_save(false);
    if let Some(command) = command {
        editor.executable(command);
    }
    let written = editor
        .edit(initial)
        .with_context(|| format!("failed to run editor {}", command.unwrap_or("from $EDITOR")))?;
    Ok(written.unwrap_or_default())
}

pub fn cmd_comment_add(
    session: &Session,
    task: Option<&str>,
    body: Option<&str>,
    use_editor: bool,
) -> Result<()> {
    let id = resolve_task(session, task)?;
    let initial = body.unwrap_or_default();

    let text = if use_editor || initial.trim().is_empty() {
        if !can_prompt(session) {
            bail!("comment body cannot be empty\n\nPass the comment as an argument, or run in a terminal to write it in your editor");
        }
        compose_in_editor(session.config().editor_command(), initial)?
    } else {
        initial.to_string()
    };
    let text = comment_body(&text)?;

    session
        .client()?
        .post_comment(&id, &text)
        .with_context(|| format!("failed to add comment to task {}", id.raw()))?;

    println!("Comment added to task {}", colors::identifier(id.raw()));
    println!();
    println!("{}", colors::secondary("---"));
    println!("{}", colors::secondary("Quick actions:"));
    println!("  {}  clickup task view {}", colors::secondary("View:"), id.raw());
    println!("  {}  clickup comment list {}", colors::secondary("List:"), id.raw());
    Ok(())
}

pub fn cmd_comment_list(session: &Session, task: Option<&str>, json: bool) -> Result<()> {
    let id = resolve_task(session, task)?;
    let comments = session
        .client()?
        .task_comments(&id, None)
        .with_context(|| format!("failed to fetch comments for task {}", id.raw()))?;

    if json {
        return print_json(&comments);
    }
    if comments.is_empty() {
        println!("No comments on task {}.", id.raw());
        return Ok(());
    }

    let now = Utc::now();
    for (i, comment) in comments.iter().enumerate() {
        let when = comment
            .timestamp_ms()
            .map(|ms| format::relative_time(ms, now))
            .unwrap_or_default();
        println!("{}  {}", comment.user.username.bold(), colors::secondary(&when));
        for line in comment.comment_text.trim().lines() {
            println!("  {}", line);
        }
        for url in comment.attachment_urls() {
            println!("  {} {}", colors::secondary("attachment:"), url);
        }
        if i + 1 < comments.len() {
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_body_is_trimmed() {
        assert_eq!(comment_body("\n  Looks good\n\n").unwrap(), "Looks good");
        assert_eq!(comment_body("line one\n\nline two\n").unwrap(), "line one\n\nline two");
    }

    #[test]
    fn test_empty_comment_is_rejected() {
        for text in ["", "   ", "\n\n"] {
            let err = comment_body(text).unwrap_err();
            assert_eq!(err.to_string(), "comment body cannot be empty");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_editor_output_becomes_the_body() {
        let editor = r#"sh -c 'printf "Shipped in v2\n" >> "$0"'"#;
        let written = compose_in_editor(Some(editor), "Draft: ").unwrap();
        assert_eq!(comment_body(&written).unwrap(), "Draft: Shipped in v2");
    }

    #[cfg(unix)]
    #[test]
    fn test_editor_that_clears_the_file_gives_empty_body() {
        let written = compose_in_editor(Some(r#"sh -c ': > "$0"'"#), "something").unwrap();
        assert!(comment_body(&written).is_err());
    }
}
