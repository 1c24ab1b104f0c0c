//! Integration tests for the authenticated transport against a local server

mod common;

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clickup::api::{
    ApiError, AuthenticatedTransport, ClickUpClient, HttpRequest, UreqTransport,
};
use clickup::taskid::parse_user_input;
use common::{Canned, FakeServer};

fn transport() -> AuthenticatedTransport<UreqTransport> {
    AuthenticatedTransport::new(UreqTransport::new(), "pk_test")
}

fn reset_in(secs: u64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    (now + secs).to_string()
}

#[test]
fn test_signs_requests() {
    let server = FakeServer::start(vec![Canned::json(200, "{}")]);
    let response = transport()
        .execute(HttpRequest::get(format!("{}/user", server.url())))
        .unwrap();
    assert_eq!(response.status(), 200);

    let seen = server.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].header("Authorization"), Some("pk_test"));
    assert!(seen[0].header("User-Agent").unwrap().starts_with("clickup-cli/"));
}

#[test]
fn test_429_is_retried_once_after_reset() {
    let server = FakeServer::start(vec![
        Canned::json(429, r#"{"err":"Rate limit reached"}"#)
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RateLimit-Reset", &reset_in(1)),
        Canned::json(200, r#"{"ok":true}"#).with_header("X-RateLimit-Remaining", "99"),
    ]);

    let transport = transport();
    let started = Instant::now();
    let response = transport
        .execute(HttpRequest::get(format!("{}/task/x", server.url())))
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(server.requests().len(), 2);
    // The reset header has whole-second resolution.
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(transport.rate_limiter().snapshot().remaining, 99);
}

#[test]
fn test_second_429_is_returned() {
    let server = FakeServer::start(vec![
        Canned::json(429, r#"{"err":"slow down"}"#),
        Canned::json(429, r#"{"err":"slow down"}"#),
        Canned::json(200, "{}"),
    ]);

    let response = transport()
        .execute(HttpRequest::get(format!("{}/task/x", server.url())))
        .unwrap();
    assert_eq!(response.status(), 429);
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn test_401_without_marker_is_auth_expired() {
    let server = FakeServer::start(vec![Canned::json(401, r#"{"err":"Token invalid"}"#)]);
    let err = transport()
        .execute(HttpRequest::get(format!("{}/user", server.url())))
        .unwrap_err();
    assert!(matches!(err, ApiError::AuthExpired { .. }));
    assert!(err.requires_login());
}

#[test]
fn test_401_with_permission_marker_is_a_status_error() {
    let server = FakeServer::start(vec![Canned::json(
        401,
        r#"{"err":"Team not authorized","ECODE":"OAUTH_027"}"#,
    )]);
    let err = transport()
        .execute(HttpRequest::get(format!("{}/team/1/task", server.url())))
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.requires_login());
}

#[test]
fn test_client_reports_service_message() {
    let server = FakeServer::start(vec![Canned::json(404, r#"{"err":"Task not found"}"#)]);
    let client = ClickUpClient::new(transport()).with_base_url(server.url());
    let err = client.get_task(&parse_user_input("CU-abc")).unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("Task not found"));
    assert!(server.requests()[0].url.starts_with("/task/abc?"));
}

#[test]
fn test_custom_id_lookup_adds_team() {
    let server = FakeServer::start(vec![Canned::json(
        200,
        r#"{"id":"86abc","custom_id":"ENG-7","name":"Login"}"#,
    )]);
    let client = ClickUpClient::new(transport())
        .with_base_url(server.url())
        .with_team(Some("42".to_string()));
    let task = client.get_task(&parse_user_input("ENG-7")).unwrap();
    assert_eq!(task.display_id(), "ENG-7");

    let url = &server.requests()[0].url;
    assert!(url.starts_with("/task/ENG-7?"));
    assert!(url.contains("custom_task_ids=true"));
    assert!(url.contains("team_id=42"));
}
