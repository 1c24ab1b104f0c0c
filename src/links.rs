//! Where GitHub links end up on a task, and the messages announcing them.
//!
//! A link goes into the task description's links block unless a link field
//! is configured, in which case it is written to that custom field instead.

use serde_json::json;
use thiserror::Error;

use crate::api::models::{CommentBlock, CustomFieldValue, Task};
use crate::api::{ApiError, ClickUpClient, Transport};
use crate::link_block::{self, BlockStyle, LinkEntry};
use crate::taskid::TaskIdentifier;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("custom field {field:?} not found on task {task}\n\nAvailable custom fields: {available}")]
    FieldNotFound {
        field: String,
        task: String,
        available: String,
    },

    #[error("custom field {field:?} has type {kind:?} which is not supported for link storage (use url, text, or short_text)")]
    UnsupportedField { field: String, kind: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Where an upsert wrote, and whether anything changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDestination {
    Description { changed: bool },
    Field { name: String, changed: bool },
}

impl LinkDestination {
    pub fn changed(&self) -> bool {
        match self {
            LinkDestination::Description { changed } | LinkDestination::Field { changed, .. } => {
                *changed
            }
        }
    }
}

/// Record `entry` on the task, in `link_field` when given, else in the description.
pub fn upsert_link<T: Transport>(
    client: &ClickUpClient<T>,
    task: &TaskIdentifier,
    link_field: Option<&str>,
    entry: &LinkEntry,
) -> Result<LinkDestination, LinkError> {
    match link_field.filter(|name| !name.is_empty()) {
        Some(name) => upsert_field_link(client, task, name, entry),
        None => Ok(upsert_description_link(client, task, entry)?),
    }
}

pub fn upsert_description_link<T: Transport>(
    client: &ClickUpClient<T>,
    task: &TaskIdentifier,
    entry: &LinkEntry,
) -> Result<LinkDestination, ApiError> {
    let current = client.markdown_description(task)?;
    let updated = link_block::upsert(&BlockStyle::description_links(), &current, entry);
    let changed = updated != current;
    if changed {
        client.update_markdown_description(task, &updated)?;
    }
    tracing::debug!(task = %task, changed, "description links upserted");
    Ok(LinkDestination::Description { changed })
}

fn upsert_field_link<T: Transport>(
    client: &ClickUpClient<T>,
    task: &TaskIdentifier,
    field_name: &str,
    entry: &LinkEntry,
) -> Result<LinkDestination, LinkError> {
    let fetched = client.get_task(task)?;
    let field = fetched
        .custom_field(field_name)
        .ok_or_else(|| LinkError::FieldNotFound {
            field: field_name.to_string(),
            task: task.to_string(),
            available: custom_field_names(&fetched),
        })?;

    let (current, updated) = match field.value() {
        CustomFieldValue::Url(current) => match link_block::extract_url(entry.line()) {
            Some(url) => (current, CustomFieldValue::Url(Some(url.to_string()))),
            None => return Ok(upsert_description_link(client, task, entry)?),
        },
        CustomFieldValue::Text(current) => {
            let text = link_block::upsert(&BlockStyle::Bare, current.as_deref().unwrap_or(""), entry);
            (current, CustomFieldValue::Text(Some(text)))
        }
        CustomFieldValue::ShortText(current) => {
            let text = link_block::upsert(&BlockStyle::Bare, current.as_deref().unwrap_or(""), entry);
            (current, CustomFieldValue::ShortText(Some(text)))
        }
        _ => {
            return Err(LinkError::UnsupportedField {
                field: field.name.clone(),
                kind: field.kind.clone(),
            })
        }
    };

    let changed = current.as_deref() != updated.as_text();
    if changed {
        client.set_custom_field(&TaskIdentifier::native(&fetched.id), &field.id, &updated)?;
    }
    tracing::debug!(task = %task, field = %field.name, changed, "link field upserted");
    Ok(LinkDestination::Field {
        name: field.name.clone(),
        changed,
    })
}

fn custom_field_names(task: &Task) -> String {
    if task.custom_fields.is_empty() {
        return "(none)".to_string();
    }
    task.custom_fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The PR body with the task's entry in the ClickUp block, or `None` when
/// it is already there.
pub fn sync_pull_request_body(body: &str, entry: &LinkEntry) -> Option<String> {
    let updated = link_block::upsert(&BlockStyle::pull_request_body(), body, entry);
    (updated != body).then_some(updated)
}

pub fn pull_request_comment(repo: &str, number: u64, title: &str, url: &str) -> Vec<CommentBlock> {
    vec![
        CommentBlock::text("🔗 "),
        CommentBlock::styled("GitHub PR linked", json!({ "bold": true })),
        CommentBlock::text(": "),
        CommentBlock::styled(
            format!("{}#{} - {}", repo, number, title),
            json!({ "link": url }),
        ),
        CommentBlock::text("\n"),
    ]
}

pub fn branch_comment(branch: &str, repo: &str) -> Vec<CommentBlock> {
    vec![
        CommentBlock::text("🔗 "),
        CommentBlock::styled("Branch linked", json!({ "bold": true })),
        CommentBlock::text(": "),
        CommentBlock::styled(branch, json!({ "code": true })),
        CommentBlock::text(format!(" in {}", repo)),
        CommentBlock::text("\n"),
    ]
}

pub fn commit_comment(short_sha: &str, url: &str, subject: &str) -> String {
    format!("🔗 **Commit linked**: [`{}`]({}) - {}", short_sha, url, subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AuthenticatedTransport, HttpRequest, HttpResponse, Method};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Scripted {
        responses: Mutex<VecDeque<HttpResponse>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Scripted {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.sent.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ApiError::Network("no scripted response left".into()))
        }
    }

    fn client(responses: Vec<&str>) -> (ClickUpClient<Arc<Scripted>>, Arc<Scripted>) {
        let scripted = Arc::new(Scripted {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|body| HttpResponse::new(200, body))
                    .collect(),
            ),
            sent: Mutex::new(Vec::new()),
        });
        let client = ClickUpClient::new(AuthenticatedTransport::new(Arc::clone(&scripted), "tok"))
            .with_base_url("http://fake/api/v2");
        (client, scripted)
    }

    fn sent_json(scripted: &Scripted, index: usize) -> serde_json::Value {
        let sent = scripted.sent.lock().unwrap();
        serde_json::from_slice(sent[index].body().unwrap()).unwrap()
    }

    fn pr_entry() -> LinkEntry {
        LinkEntry::pull_request("acme/w", 42, "Add login", "https://github.com/acme/w/pull/42")
    }

    #[test]
    fn test_description_link_written() {
        let (client, scripted) = client(vec![
            r#"{"id":"abc","name":"Login","markdown_description":"Intro"}"#,
            "{}",
        ]);
        let task = TaskIdentifier::native("abc");
        let outcome = upsert_link(&client, &task, None, &pr_entry()).unwrap();
        assert_eq!(outcome, LinkDestination::Description { changed: true });

        let body = sent_json(&scripted, 1);
        let markdown = body["markdown_description"].as_str().unwrap();
        assert!(markdown.starts_with("**GitHub** _(clickup-cli)_\n- [acme/w#42"));
        assert!(markdown.ends_with("\n\nIntro"));
    }

    #[test]
    fn test_description_link_unchanged_skips_write() {
        let existing = link_block::upsert(&BlockStyle::description_links(), "Intro", &pr_entry());
        let task_json = json!({"id": "abc", "name": "Login", "markdown_description": existing}).to_string();
        let (client, scripted) = client(vec![task_json.as_str()]);

        let outcome = upsert_link(&client, &TaskIdentifier::native("abc"), None, &pr_entry()).unwrap();
        assert!(!outcome.changed());
        assert_eq!(scripted.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_url_field_gets_bare_url() {
        let task = r#"{"id":"abc","name":"Login","custom_fields":[
            {"id":"f1","name":"GitHub PR","type":"url"}]}"#;
        let (client, scripted) = client(vec![task, "{}"]);

        let outcome =
            upsert_link(&client, &TaskIdentifier::native("abc"), Some("github pr"), &pr_entry()).unwrap();
        assert_eq!(
            outcome,
            LinkDestination::Field {
                name: "GitHub PR".into(),
                changed: true
            }
        );

        let sent = scripted.sent.lock().unwrap();
        assert_eq!(sent[1].method(), Method::Post);
        assert_eq!(sent[1].url(), "http://fake/api/v2/task/abc/field/f1");
        drop(sent);
        assert_eq!(
            sent_json(&scripted, 1),
            json!({"value": "https://github.com/acme/w/pull/42"})
        );
    }

    #[test]
    fn test_url_field_without_url_falls_back_to_description() {
        let task = r#"{"id":"abc","name":"Login","custom_fields":[
            {"id":"f1","name":"Links","type":"url"}]}"#;
        let (client, _) = client(vec![task, r#"{"id":"abc","name":"Login"}"#, "{}"]);

        let outcome = upsert_link(
            &client,
            &TaskIdentifier::native("abc"),
            Some("Links"),
            &LinkEntry::branch("feature/x", "acme/w"),
        )
        .unwrap();
        assert_eq!(outcome, LinkDestination::Description { changed: true });
    }

    #[test]
    fn test_text_field_upserts_line() {
        let task = r#"{"id":"abc","name":"Login","custom_fields":[
            {"id":"f2","name":"Links","type":"text","value":"Branch: `feature/x` in acme/w"}]}"#;
        let (client, scripted) = client(vec![task, "{}"]);

        upsert_link(&client, &TaskIdentifier::native("abc"), Some("Links"), &pr_entry()).unwrap();
        let value = sent_json(&scripted, 1)["value"].as_str().unwrap().to_string();
        assert_eq!(
            value,
            format!("Branch: `feature/x` in acme/w\n{}", pr_entry().line())
        );
    }

    #[test]
    fn test_missing_field_lists_available() {
        let task = r#"{"id":"abc","name":"Login","custom_fields":[
            {"id":"f1","name":"Sprint","type":"number"}]}"#;
        let (client, _) = client(vec![task]);
        let err = upsert_link(&client, &TaskIdentifier::native("abc"), Some("Links"), &pr_entry())
            .unwrap_err();
        assert!(err.to_string().contains("Available custom fields: Sprint"));

        let (client, _) = self::client(vec![r#"{"id":"abc","name":"Login"}"#]);
        let err = upsert_link(&client, &TaskIdentifier::native("abc"), Some("Links"), &pr_entry())
            .unwrap_err();
        assert!(err.to_string().ends_with("(none)"));
    }

    #[test]
    fn test_unsupported_field_kind() {
        let task = r#"{"id":"abc","name":"Login","custom_fields":[
            {"id":"f1","name":"Links","type":"drop_down"}]}"#;
        let (client, _) = client(vec![task]);
        let err = upsert_link(&client, &TaskIdentifier::native("abc"), Some("Links"), &pr_entry())
            .unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedField { ref kind, .. } if kind == "drop_down"));
    }

    #[test]
    fn test_sync_pull_request_body() {
        let entry = LinkEntry::task("https://app.clickup.com/t/abc", "Login", "in progress");
        let body = sync_pull_request_body("Fixes the login form.", &entry).unwrap();
        assert!(body.starts_with("<!-- clickup-cli:start -->\n## ClickUp\n"));
        assert!(body.ends_with("<!-- clickup-cli:end -->\n\nFixes the login form."));
        assert_eq!(sync_pull_request_body(&body, &entry), None);
    }

    #[test]
    fn test_comment_builders() {
        let blocks = pull_request_comment("acme/w", 42, "Add login", "https://github.com/acme/w/pull/42");
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[3].text.as_deref(), Some("acme/w#42 - Add login"));
        assert_eq!(
            blocks[3].attributes,
            Some(json!({"link": "https://github.com/acme/w/pull/42"}))
        );

        let blocks = branch_comment("feature/x", "acme/w");
        assert_eq!(blocks[3].attributes, Some(json!({"code": true})));

        assert_eq!(
            commit_comment("abc1234", "https://github.com/acme/w/commit/abc1234ff", "Fix bug"),
            "🔗 **Commit linked**: [`abc1234`](https://github.com/acme/w/commit/abc1234ff) - Fix bug"
        );
    }
}
