//! Wire types for the subset of the ClickUp v2 API this tool uses.
//!
//! Fields the commands never read are left out; serde ignores them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

/// A ClickUp workspace. The API still calls these teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamsEnvelope {
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpacesEnvelope {
    pub spaces: Vec<Space>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default)]
    pub priority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub custom_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markdown_description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub space: Reference,
    #[serde(default)]
    pub list: Reference,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub date_updated: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub points: Option<f64>,
    /// Milliseconds.
    #[serde(default)]
    pub time_estimate: Option<i64>,
    /// Milliseconds.
    #[serde(default)]
    pub time_spent: Option<i64>,
}

impl Task {
    /// The identifier people recognise: the custom ID when the workspace
    /// uses them, otherwise the native ID.
    pub fn display_id(&self) -> &str {
        self.custom_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.id)
    }

    /// Markdown source of the description, falling back to plain text.
    pub fn markdown(&self) -> &str {
        self.markdown_description
            .as_deref()
            .filter(|md| !md.is_empty())
            .or(self.description.as_deref())
            .unwrap_or("")
    }

    pub fn assignee_names(&self) -> Vec<&str> {
        self.assignees.iter().map(|a| a.username.as_str()).collect()
    }

    pub fn priority_name(&self) -> Option<&str> {
        self.priority
            .as_ref()
            .map(|p| p.priority.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Case-insensitive lookup of a custom field by name.
    pub fn custom_field(&self, name: &str) -> Option<&CustomField> {
        self.custom_fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }

    pub fn app_url(&self) -> String {
        if self.url.is_empty() {
            format!("https://app.clickup.com/t/{}", self.id)
        } else {
            self.url.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FoldersEnvelope {
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// A list inside a folder. Sprint folders hold one list per sprint, dated
/// by `start_date` and `due_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub name: String,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    /// A number or a numeric string, depending on the endpoint.
    #[serde(default)]
    pub task_count: Option<Value>,
}

impl TaskList {
    pub fn task_count(&self) -> u64 {
        match &self.task_count {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListsEnvelope {
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

/// One page of `GET /team/{id}/task` or `GET /list/{id}/task`.
#[derive(Debug, Default, Deserialize)]
pub struct TasksPage {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub last_page: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl CustomField {
    pub fn value(&self) -> CustomFieldValue {
        CustomFieldValue::from_raw(&self.kind, self.value.as_ref())
    }
}

/// The custom field kinds this tool can read and write.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomFieldValue {
    Url(Option<String>),
    Text(Option<String>),
    ShortText(Option<String>),
    Number(Option<f64>),
    Checkbox(bool),
    Unsupported(String),
}

impl CustomFieldValue {
    pub fn from_raw(kind: &str, raw: Option<&Value>) -> Self {
        let text = || raw.and_then(Value::as_str).map(str::to_string);
        match kind {
            "url" => CustomFieldValue::Url(text()),
            "text" => CustomFieldValue::Text(text()),
            "short_text" => CustomFieldValue::ShortText(text()),
            "number" => CustomFieldValue::Number(raw.and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            })),
            "checkbox" => CustomFieldValue::Checkbox(match raw {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => s == "true",
                _ => false,
            }),
            other => CustomFieldValue::Unsupported(other.to_string()),
        }
    }

    /// Current text for the string-like kinds.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CustomFieldValue::Url(v) | CustomFieldValue::Text(v) | CustomFieldValue::ShortText(v) => {
                v.as_deref()
            }
            _ => None,
        }
    }

    /// JSON payload for `POST /task/{id}/field/{field_id}`.
    pub fn to_payload(&self) -> Value {
        let value = match self {
            CustomFieldValue::Url(v) | CustomFieldValue::Text(v) | CustomFieldValue::ShortText(v) => {
                v.clone().map(Value::String).unwrap_or(Value::Null)
            }
            CustomFieldValue::Number(n) => n
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CustomFieldValue::Checkbox(b) => Value::Bool(*b),
            CustomFieldValue::Unsupported(_) => Value::Null,
        };
        serde_json::json!({ "value": value })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentBlock {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<MediaObject>,
}

impl CommentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, attributes: Value) -> Self {
        Self {
            text: Some(text.into()),
            attributes: Some(attributes),
            ..Self::default()
        }
    }

    /// URL of an embedded image or frame, if this block is one.
    pub fn attachment_url(&self) -> Option<&str> {
        let media = match self.kind.as_deref() {
            Some("image") => self.image.as_ref(),
            Some("frame") => self.frame.as_ref(),
            _ => None,
        }?;
        Some(media.url.as_str()).filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub comment_text: String,
    #[serde(default)]
    pub comment: Vec<CommentBlock>,
    #[serde(default)]
    pub user: User,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub date: String,
}

impl Comment {
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.date.parse().ok()
    }

    pub fn attachment_urls(&self) -> Vec<String> {
        self.comment
            .iter()
            .filter_map(CommentBlock::attachment_url)
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsEnvelope {
    #[serde(default)]
    pub comments: Vec<Comment>,
}
