use serde::Deserialize;
use thiserror::Error;

use super::transport::HttpResponse;

/// Errors surfaced by the ClickUp API layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("ClickUp API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// The stored credential was rejected and must be replaced.
    #[error("your ClickUp session has expired or the token was revoked\n\nRun 'clickup auth login' to re-authenticate")]
    AuthExpired { detail: String },

    #[error("not logged in to ClickUp\n\nRun 'clickup auth login' to authenticate")]
    NotAuthenticated,

    #[error("network error: {0}")]
    Network(String),

    #[error("request abandoned: time budget exhausted")]
    Cancelled,

    #[error("unexpected response from ClickUp: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("custom task ID {0} needs a workspace\n\nRun 'clickup space select' or 'clickup config set workspace <id>'")]
    MissingWorkspace(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    err: String,
    #[serde(default)]
    message: String,
}

impl ApiError {
    /// Build a status error from a non-2xx response, preferring the message
    /// the service put in the body.
    pub fn from_response(response: &HttpResponse) -> Self {
        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap_or_default();
        let mut message = if body.message.is_empty() {
            body.err
        } else {
            body.message
        };

        if message.is_empty() {
            message = match response.status() {
                403 => "You don't have permission to perform this action.".to_string(),
                404 => "Resource not found. Check the ID and try again.".to_string(),
                429 => "Rate limit exceeded. Please wait and try again.".to_string(),
                _ => response.text().trim().to_string(),
            };
        }

        ApiError::Status {
            status: response.status(),
            message,
        }
    }

    /// True when the user has to log in (again) before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. } | ApiError::NotAuthenticated)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_prefers_message() {
        let response = HttpResponse::new(400, br#"{"err":"Bad","message":"Task name invalid"}"#.to_vec());
        let err = ApiError::from_response(&response);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "ClickUp API error (HTTP 400): Task name invalid");
    }

    #[test]
    fn test_from_response_falls_back_to_err() {
        let response = HttpResponse::new(500, br#"{"err":"Internal","ECODE":"X_001"}"#.to_vec());
        assert!(ApiError::from_response(&response).to_string().ends_with("Internal"));
    }

    #[test]
    fn test_from_response_friendly_defaults() {
        let not_found = ApiError::from_response(&HttpResponse::new(404, Vec::new()));
        assert!(not_found.to_string().contains("Resource not found"));

        let forbidden = ApiError::from_response(&HttpResponse::new(403, b"{}".to_vec()));
        assert!(forbidden.to_string().contains("permission"));

        let limited = ApiError::from_response(&HttpResponse::new(429, Vec::new()));
        assert!(limited.to_string().contains("Rate limit exceeded"));
    }

    #[test]
    fn test_from_response_plain_text_body() {
        let response = HttpResponse::new(502, b"Bad Gateway\n".to_vec());
        assert!(ApiError::from_response(&response).to_string().ends_with("Bad Gateway"));
    }

    #[test]
    fn test_requires_login() {
        assert!(ApiError::NotAuthenticated.requires_login());
        assert!(ApiError::AuthExpired { detail: String::new() }.requires_login());
        assert!(!ApiError::Cancelled.requires_login());
        assert!(!ApiError::Status { status: 401, message: "ECODE".into() }.requires_login());
    }
}
