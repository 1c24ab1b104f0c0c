//! Authentication: stored credentials, token validation, OAuth login and the
//! per-process [`Session`] that commands get their API client from.

pub mod oauth;
pub mod store;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::api::models::{User, UserEnvelope};
use crate::api::{ApiError, ClickUpClient, HttpRequest, Transport, UreqTransport, API_BASE};
use crate::config::Config;
use crate::git::RepoContext;

pub use oauth::{AuthorizationState, OAuthAuthorizer, OAuthError, PendingAuthorization};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

pub const CLIENT_ID_ENV: &str = "CLICKUP_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CLICKUP_CLIENT_SECRET";

/// The account a token belongs to.
pub type AuthUser = User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Token,
    OAuth,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Token => write!(f, "token"),
            AuthMethod::OAuth => write!(f, "oauth"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub method: AuthMethod,
}

/// OAuth app credentials from the environment; empty when unset.
pub fn oauth_app_credentials() -> (String, String) {
    (
        std::env::var(CLIENT_ID_ENV).unwrap_or_default(),
        std::env::var(CLIENT_SECRET_ENV).unwrap_or_default(),
    )
}

/// Check a token against `GET /user` and return its owner.
pub fn validate_token(token: &str) -> Result<AuthUser> {
    validate_token_at(API_BASE, token)
}

pub fn validate_token_at(base_url: &str, token: &str) -> Result<AuthUser> {
    let request = HttpRequest::get(format!("{}/user", base_url.trim_end_matches('/')))
        .with_header("Authorization", token);
    let response = UreqTransport::new()
        .send(&request)
        .context("failed to validate token")?;

    match response.status() {
        200 => {}
        401 => bail!("invalid or expired token"),
        status => bail!("unexpected response status: {}", status),
    }

    let envelope: UserEnvelope = response
        .json()
        .context("failed to decode user response")?;
    Ok(envelope.user)
}

/// Everything a command needs that should be resolved at most once per run.
pub struct Session {
    config: Config,
    store: Box<dyn CredentialStore>,
    base_url: String,
    credential: OnceLock<Option<Credential>>,
    client: OnceLock<ClickUpClient>,
    repo: OnceLock<Option<RepoContext>>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Box::new(FileCredentialStore::new()))
    }

    pub fn with_store(config: Config, store: Box<dyn CredentialStore>) -> Self {
        Self {
            config,
            store,
            base_url: API_BASE.to_string(),
            credential: OnceLock::new(),
            client: OnceLock::new(),
            repo: OnceLock::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// The stored credential, read from the store on first use.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential
            .get_or_init(|| match self.store.get() {
                Ok(credential) => credential,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read stored credentials");
                    None
                }
            })
            .as_ref()
    }

    pub fn client(&self) -> Result<&ClickUpClient, ApiError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let credential = self.credential().ok_or(ApiError::NotAuthenticated)?;
        let workspace = Some(self.config.workspace.clone()).filter(|w| !w.is_empty());
        let client = ClickUpClient::with_token(&credential.token)
            .with_base_url(self.base_url.clone())
            .with_team(workspace);
        Ok(self.client.get_or_init(|| client))
    }

    /// Git branch and GitHub remote of the working directory, if any.
    pub fn repo(&self) -> Option<&RepoContext> {
        self.repo
            .get_or_init(|| match RepoContext::detect() {
                Ok(context) => Some(context),
                Err(e) => {
                    tracing::debug!(error = %e, "no git context");
                    None
                }
            })
            .as_ref()
    }

    /// Forget the stored credential after the service rejected it.
    pub fn invalidate(&self) -> Result<()> {
        tracing::debug!("clearing rejected credentials");
        self.store.clear()
    }
}
