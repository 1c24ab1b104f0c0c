//! Typed ClickUp operations on top of [`AuthenticatedTransport`].

use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::errors::ApiError;
use super::models::{
    Comment, CommentBlock, CommentsEnvelope, CustomFieldValue, Folder, FoldersEnvelope,
    ListsEnvelope, Space, SpacesEnvelope, Task, TaskList, TasksPage, Team, TeamsEnvelope, User,
    UserEnvelope,
};
use super::transport::{AuthenticatedTransport, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::fanout::Deadline;
use crate::taskid::TaskIdentifier;

pub const API_BASE: &str = "https://api.clickup.com/api/v2";

/// Filters for `GET /team/{team_id}/task`.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub page: u32,
    pub include_closed: bool,
    pub subtasks: bool,
    /// Only tasks updated after this many milliseconds since the epoch.
    pub date_updated_gt: Option<i64>,
    pub space_ids: Vec<String>,
    pub order_by: Option<String>,
}

pub struct ClickUpClient<T: Transport = UreqTransport> {
    transport: AuthenticatedTransport<T>,
    base_url: String,
    team_id: Option<String>,
}

impl ClickUpClient<UreqTransport> {
    pub fn with_token(token: &str) -> Self {
        Self::new(AuthenticatedTransport::new(UreqTransport::new(), token))
    }
}

impl<T: Transport> ClickUpClient<T> {
    pub fn new(transport: AuthenticatedTransport<T>) -> Self {
        Self {
            transport,
            base_url: API_BASE.to_string(),
            team_id: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Workspace used to resolve custom task IDs.
    pub fn with_team(mut self, team_id: Option<String>) -> Self {
        self.team_id = team_id.filter(|id| !id.is_empty());
        self
    }

    pub fn transport(&self) -> &AuthenticatedTransport<T> {
        &self.transport
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))
            .map_err(|e| ApiError::InvalidRequest(format!("bad URL for {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    /// URL for a task endpoint, adding the custom-ID parameters when needed.
    fn task_url(
        &self,
        task: &TaskIdentifier,
        suffix: &str,
        query: &[(&str, &str)],
    ) -> Result<String, ApiError> {
        let path = format!("task/{}{}", encode_segment(task.id()), suffix);
        if !task.is_custom_id() {
            return self.url(&path, query);
        }

        let team = self
            .team_id
            .as_deref()
            .ok_or_else(|| ApiError::MissingWorkspace(task.id().to_string()))?;
        let mut params = vec![("custom_task_ids", "true"), ("team_id", team)];
        params.extend_from_slice(query);
        self.url(&path, &params)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.transport.execute(request)?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response));
        }
        Ok(response)
    }

    fn get_json<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        self.send(request)?.json()
    }

    pub fn current_user(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.get_json(HttpRequest::get(self.url("user", &[])?))?;
        Ok(envelope.user)
    }

    pub fn teams(&self) -> Result<Vec<Team>, ApiError> {
        let envelope: TeamsEnvelope = self.get_json(HttpRequest::get(self.url("team", &[])?))?;
        Ok(envelope.teams)
    }

    pub fn spaces(&self, team_id: &str) -> Result<Vec<Space>, ApiError> {
        let url = self.url(
            &format!("team/{}/space", encode_segment(team_id)),
            &[("archived", "false")],
        )?;
        let envelope: SpacesEnvelope = self.get_json(HttpRequest::get(url))?;
        Ok(envelope.spaces)
    }

    pub fn space(&self, space_id: &str) -> Result<Space, ApiError> {
        self.get_json(HttpRequest::get(
            self.url(&format!("space/{}", encode_segment(space_id)), &[])?,
        ))
    }

    /// Status names configured for a space, in board order.
    pub fn space_statuses(&self, space_id: &str) -> Result<Vec<String>, ApiError> {
        Ok(self
            .space(space_id)?
            .statuses
            .into_iter()
            .map(|s| s.status)
            .collect())
    }

    pub fn get_task(&self, task: &TaskIdentifier) -> Result<Task, ApiError> {
        let url = self.task_url(task, "", &[("include_markdown_description", "true")])?;
        self.get_json(HttpRequest::get(url))
    }

    pub fn update_task_status(&self, task: &TaskIdentifier, status: &str) -> Result<Task, ApiError> {
        let request = HttpRequest::put(self.task_url(task, "", &[])?)
            .with_json(&json!({ "status": status }))?;
        self.get_json(request)
    }

    /// Markdown source of the task description.
    pub fn markdown_description(&self, task: &TaskIdentifier) -> Result<String, ApiError> {
        Ok(self.get_task(task)?.markdown().to_string())
    }

    /// Replace the description; ClickUp renders it as rich text.
    pub fn update_markdown_description(
        &self,
        task: &TaskIdentifier,
        markdown: &str,
    ) -> Result<(), ApiError> {
        let request = HttpRequest::put(self.task_url(task, "", &[])?)
            .with_json(&json!({ "markdown_description": markdown }))?;
        self.send(request).map(drop)
    }

    pub fn task_comments(
        &self,
        task: &TaskIdentifier,
        deadline: Option<Deadline>,
    ) -> Result<Vec<Comment>, ApiError> {
        let request = HttpRequest::get(self.task_url(task, "/comment", &[])?).with_deadline(deadline);
        let envelope: CommentsEnvelope = self.get_json(request)?;
        Ok(envelope.comments)
    }

    pub fn post_comment(&self, task: &TaskIdentifier, text: &str) -> Result<(), ApiError> {
        let request = HttpRequest::post(self.task_url(task, "/comment", &[])?)
            .with_json(&json!({ "comment_text": text, "notify_all": false }))?;
        self.send(request).map(drop)
    }

    pub fn post_rich_comment(
        &self,
        task: &TaskIdentifier,
        blocks: &[CommentBlock],
    ) -> Result<(), ApiError> {
        let request = HttpRequest::post(self.task_url(task, "/comment", &[])?)
            .with_json(&json!({ "comment": blocks, "notify_all": false }))?;
        self.send(request).map(drop)
    }

    /// One page of tasks across a workspace.
    pub fn team_tasks(
        &self,
        team_id: &str,
        query: &TaskQuery,
        deadline: Option<Deadline>,
    ) -> Result<TasksPage, ApiError> {
        let page = query.page.to_string();
        let updated = query.date_updated_gt.map(|ms| ms.to_string());

        let mut params: Vec<(&str, &str)> = vec![("page", page.as_str())];
        if query.include_closed {
            params.push(("include_closed", "true"));
        }
        if query.subtasks {
            params.push(("subtasks", "true"));
        }
        if let Some(updated) = &updated {
            params.push(("date_updated_gt", updated.as_str()));
        }
        if let Some(order_by) = &query.order_by {
            params.push(("order_by", order_by.as_str()));
        }
        for space in &query.space_ids {
            params.push(("space_ids[]", space.as_str()));
        }

        let url = self.url(&format!("team/{}/task", encode_segment(team_id)), &params)?;
        self.get_json(HttpRequest::get(url).with_deadline(deadline))
    }

    pub fn folders(&self, space_id: &str) -> Result<Vec<Folder>, ApiError> {
        let url = self.url(
            &format!("space/{}/folder", encode_segment(space_id)),
            &[("archived", "false")],
        )?;
        let envelope: FoldersEnvelope = self.get_json(HttpRequest::get(url))?;
        Ok(envelope.folders)
    }

    pub fn folder_lists(&self, folder_id: &str) -> Result<Vec<TaskList>, ApiError> {
        let url = self.url(
            &format!("folder/{}/list", encode_segment(folder_id)),
            &[("archived", "false")],
        )?;
        let envelope: ListsEnvelope = self.get_json(HttpRequest::get(url))?;
        Ok(envelope.lists)
    }

    /// One page of a list's tasks, closed tasks and subtasks included.
    pub fn list_tasks(&self, list_id: &str, page: u32) -> Result<TasksPage, ApiError> {
        let page = page.to_string();
        let url = self.url(
            &format!("list/{}/task", encode_segment(list_id)),
            &[
                ("page", page.as_str()),
                ("include_closed", "true"),
                ("subtasks", "true"),
            ],
        )?;
        self.get_json(HttpRequest::get(url))
    }

    pub fn set_custom_field(
        &self,
        task: &TaskIdentifier,
        field_id: &str,
        value: &CustomFieldValue,
    ) -> Result<(), ApiError> {
        let suffix = format!("/field/{}", encode_segment(field_id));
        let request =
            HttpRequest::post(self.task_url(task, &suffix, &[])?).with_json(&value.to_payload())?;
        self.send(request).map(drop)
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
