//! Browser-based OAuth login through a short-lived local callback server.
//!
//! The flow binds `127.0.0.1:0`, sends the user to ClickUp's authorize page
//! with `http://localhost:<port>/callback` as redirect, and exchanges the
//! returned code for an access token. Exactly one outcome is ever reported:
//! a token, a failure, or a timeout. The listener is shut down before
//! [`PendingAuthorization::wait`] returns in every case.
//!
//! There is no refresh token handling; an expired OAuth token means logging
//! in again.

use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tiny_http::{Header, Response, Server};
use url::Url;

use crate::api::transport::{HttpRequest, Transport, UreqTransport};

pub const AUTHORIZE_URL: &str = "https://app.clickup.com/api";
pub const TOKEN_URL: &str = "https://api.clickup.com/api/v2/oauth/token";
pub const CALLBACK_PATH: &str = "/callback";

/// How long to wait for the browser to come back.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long shutdown may wait for the callback thread.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error(
        "OAuth client_id and client_secret are required\n\n\
         Register an OAuth app at https://clickup.com/integrations and set them with\n  \
         CLICKUP_CLIENT_ID / CLICKUP_CLIENT_SECRET,\n\
         or run 'clickup auth login --with-token' to use a personal API token instead"
    )]
    MissingCredentials,

    #[error("failed to start local callback server: {0}")]
    Listener(String),

    #[error("authorization failed: {0}")]
    Failed(String),

    #[error("authorization timed out after {} seconds", .0.as_secs())]
    TimedOut(Duration),
}

/// Progress of one authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    Idle,
    ListenerStarted,
    AwaitingCallback,
    Succeeded,
    Failed,
    TimedOut,
}

type SharedState = Arc<Mutex<AuthorizationState>>;

fn set_state(state: &SharedState, next: AuthorizationState) {
    let mut current = state.lock().unwrap_or_else(|p| p.into_inner());
    tracing::debug!(from = ?*current, to = ?next, "oauth state change");
    *current = next;
}

pub struct OAuthAuthorizer {
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    timeout: Duration,
    shutdown_grace: Duration,
    state: SharedState,
}

impl OAuthAuthorizer {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            timeout: CALLBACK_TIMEOUT,
            shutdown_grace: SHUTDOWN_GRACE,
            state: Arc::new(Mutex::new(AuthorizationState::Idle)),
        }
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn state(&self) -> AuthorizationState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Bind the callback listener and start serving it.
    pub fn start(&self) -> Result<PendingAuthorization, OAuthError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(OAuthError::MissingCredentials);
        }

        let server =
            Server::http("127.0.0.1:0").map_err(|e| OAuthError::Listener(e.to_string()))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| OAuthError::Listener("listener has no TCP address".to_string()))?;
        let server = Arc::new(server);
        set_state(&self.state, AuthorizationState::ListenerStarted);

        let redirect_uri = format!("http://localhost:{}{}", port, CALLBACK_PATH);
        let authorize_url = build_authorize_url(&self.authorize_url, &self.client_id, &redirect_uri)?;

        let exchange = TokenExchange {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            token_url: self.token_url.clone(),
        };
        let (sender, receiver) = mpsc::sync_channel(1);
        let thread_server = Arc::downgrade(&server);
        let handle = thread::Builder::new()
            .name("oauth-callback".to_string())
            .spawn(move || serve_callbacks(&thread_server, &exchange, &sender))
            .map_err(|e| OAuthError::Listener(e.to_string()))?;

        tracing::debug!(port, "oauth callback listener started");
        set_state(&self.state, AuthorizationState::AwaitingCallback);

        Ok(PendingAuthorization {
            server: Some(server),
            handle: Some(handle),
            receiver,
            authorize_url,
            redirect_uri,
            port,
            timeout: self.timeout,
            shutdown_grace: self.shutdown_grace,
            state: Arc::clone(&self.state),
        })
    }

    /// Run the whole flow: start the listener, point the browser at the
    /// authorize page and wait for the token.
    pub fn authorize(&self) -> Result<String, OAuthError> {
        let pending = self.start()?;

        eprintln!("Opening browser for ClickUp authorization...");
        eprintln!(
            "If the browser doesn't open, visit this URL:\n  {}\n",
            pending.authorize_url()
        );
        if let Err(e) = open_browser(pending.authorize_url()) {
            tracing::debug!(error = %e, "could not launch browser");
        }
        eprintln!("Waiting for authorization...");

        pending.wait()
    }
}

fn build_authorize_url(base: &str, client_id: &str, redirect_uri: &str) -> Result<String, OAuthError> {
    let mut url = Url::parse(base)
        .map_err(|e| OAuthError::Failed(format!("invalid authorize URL {}: {}", base, e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri);
    Ok(url.into())
}

/// A running callback listener waiting for the browser.
pub struct PendingAuthorization {
    server: Option<Arc<Server>>,
    handle: Option<JoinHandle<()>>,
    receiver: Receiver<Result<String, String>>,
    authorize_url: String,
    redirect_uri: String,
    port: u16,
    timeout: Duration,
    shutdown_grace: Duration,
    state: SharedState,
}

impl PendingAuthorization {
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Block until the callback delivers an outcome or the timeout passes.
    pub fn wait(mut self) -> Result<String, OAuthError> {
        let outcome = match self.receiver.recv_timeout(self.timeout) {
            Ok(Ok(token)) => {
                set_state(&self.state, AuthorizationState::Succeeded);
                Ok(token)
            }
            Ok(Err(message)) => {
                set_state(&self.state, AuthorizationState::Failed);
                Err(OAuthError::Failed(message))
            }
            Err(RecvTimeoutError::Timeout) => {
                set_state(&self.state, AuthorizationState::TimedOut);
                Err(OAuthError::TimedOut(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                set_state(&self.state, AuthorizationState::Failed);
                Err(OAuthError::Failed("callback server stopped unexpectedly".to_string()))
            }
        };

        self.shutdown();
        outcome
    }

    fn shutdown(&mut self) {
        let Some(server) = self.server.take() else {
            return;
        };
        server.unblock();

        if let Some(handle) = self.handle.take() {
            let started = Instant::now();
            while !handle.is_finished() && started.elapsed() < self.shutdown_grace {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::warn!("oauth callback thread still busy after shutdown grace period");
            }
        }

        // The callback thread only upgrades its handle while waiting in
        // recv, so this is the last strong reference and closes the socket.
        drop(server);
        tracing::debug!(port = self.port, "oauth callback listener stopped");
    }
}

impl Drop for PendingAuthorization {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct TokenExchange {
    client_id: String,
    client_secret: String,
    token_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    error: String,
}

impl TokenExchange {
    fn exchange(&self, code: &str) -> Result<String, String> {
        let request = HttpRequest::post(&self.token_url).with_form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
        ]);
        let response = UreqTransport::new()
            .send(&request)
            .map_err(|e| format!("token exchange request failed: {}", e))?;

        let parsed: TokenResponse = response.json().map_err(|_| {
            format!(
                "failed to decode token response (HTTP {})",
                response.status()
            )
        })?;

        if !parsed.error.is_empty() {
            return Err(format!("token exchange error: {}", parsed.error));
        }
        if parsed.access_token.is_empty() {
            return Err("no access token in response".to_string());
        }
        Ok(parsed.access_token)
    }
}

fn serve_callbacks(
    server: &Weak<Server>,
    exchange: &TokenExchange,
    sender: &SyncSender<Result<String, String>>,
) {
    let mut delivered = false;

    loop {
        let Some(live) = server.upgrade() else {
            break;
        };
        // recv fails once the server is unblocked during shutdown
        let Ok(request) = live.recv() else {
            break;
        };
        drop(live);

        let Some(query) = callback_query(request.url()) else {
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
            continue;
        };

        if delivered {
            let _ = request.respond(html_response(
                "Already handled",
                "This login attempt has already completed. You can close this tab.",
            ));
            continue;
        }

        let outcome = match query.code {
            Some(code) => exchange.exchange(&code),
            None => Err(query
                .error
                .unwrap_or_else(|| "no authorization code received".to_string())),
        };

        let page = match &outcome {
            Ok(_) => html_response(
                "✓ Authenticated with ClickUp!",
                "You can close this tab and return to the terminal.",
            ),
            Err(message) => html_response(
                "Authorization failed",
                &format!("{}</p><p>You can close this tab.", escape_html(message)),
            ),
        };
        let _ = request.respond(page);

        delivered = true;
        // capacity 1 and a single send: this never blocks
        let _ = sender.try_send(outcome);
    }
}

struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// Parse the query of a request to the callback route; `None` for any other path.
fn callback_query(raw_url: &str) -> Option<CallbackQuery> {
    let url = Url::parse(&format!("http://localhost{}", raw_url)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut query = CallbackQuery {
        code: None,
        error: None,
    };
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => query.code = Some(value.into_owned()),
            "error" if !value.is_empty() => query.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(query)
}

fn html_response(title: &str, body_html: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let html = format!(
        "<html><body><h2>{}</h2><p>{}</p></body></html>",
        escape_html(title),
        body_html
    );
    let response = Response::from_string(html);
    match "Content-Type: text/html; charset=utf-8".parse::<Header>() {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Ask the desktop to open `url` in the default browser.
pub fn open_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials() {
        assert_eq!(
            OAuthAuthorizer::new("", "secret").start().err(),
            Some(OAuthError::MissingCredentials)
        );
        assert_eq!(
            OAuthAuthorizer::new("id", "").start().err(),
            Some(OAuthError::MissingCredentials)
        );
        assert!(OAuthError::MissingCredentials
            .to_string()
            .contains("--with-token"));
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let url = build_authorize_url(AUTHORIZE_URL, "my id", "http://localhost:4567/callback").unwrap();
        assert_eq!(
            url,
            "https://app.clickup.com/api?client_id=my+id&redirect_uri=http%3A%2F%2Flocalhost%3A4567%2Fcallback"
        );
    }

    #[test]
    fn test_start_reports_redirect_and_state() {
        let authorizer = OAuthAuthorizer::new("id", "secret").with_timeout(Duration::from_millis(10));
        assert_eq!(authorizer.state(), AuthorizationState::Idle);

        let pending = authorizer.start().unwrap();
        assert_eq!(authorizer.state(), AuthorizationState::AwaitingCallback);
        assert_eq!(
            pending.redirect_uri(),
            format!("http://localhost:{}/callback", pending.port())
        );
        assert!(pending.authorize_url().contains("client_id=id"));

        assert_eq!(
            pending.wait(),
            Err(OAuthError::TimedOut(Duration::from_millis(10)))
        );
        assert_eq!(authorizer.state(), AuthorizationState::TimedOut);
    }

    #[test]
    fn test_callback_query() {
        let query = callback_query("/callback?code=abc&state=x").unwrap();
        assert_eq!(query.code.as_deref(), Some("abc"));
        assert_eq!(query.error, None);

        let query = callback_query("/callback?error=access_denied").unwrap();
        assert_eq!(query.code, None);
        assert_eq!(query.error.as_deref(), Some("access_denied"));

        let query = callback_query("/callback?code=").unwrap();
        assert_eq!(query.code, None);

        assert!(callback_query("/favicon.ico").is_none());
        assert!(callback_query("/callback/extra").is_none());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>\"x\" & 'y'</script>"),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }
}
