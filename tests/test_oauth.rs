//! Integration tests for the OAuth callback listener and token exchange

mod common;

use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use clickup::auth::{AuthorizationState, OAuthAuthorizer, OAuthError};
use common::{Canned, FakeServer};

fn authorizer(token_server: &FakeServer) -> OAuthAuthorizer {
    OAuthAuthorizer::new("client-1", "secret-1")
        .with_token_url(format!("{}/oauth/token", token_server.url()))
        .with_timeout(Duration::from_secs(10))
}

/// Hit the local callback listener the way the browser would.
fn callback(port: u16, path_and_query: &str) -> (u16, String) {
    let url = format!("http://127.0.0.1:{}{}", port, path_and_query);
    match ureq::get(&url).call() {
        Ok(response) => (response.status(), response.into_string().unwrap_or_default()),
        Err(ureq::Error::Status(status, response)) => {
            (status, response.into_string().unwrap_or_default())
        }
        Err(e) => panic!("callback request failed: {}", e),
    }
}

#[test]
fn test_code_is_exchanged_for_token() {
    let token_server = FakeServer::start(vec![Canned::json(200, r#"{"access_token":"tok-123"}"#)]);
    let authorizer = authorizer(&token_server);
    let pending = authorizer.start().unwrap();
    assert_eq!(authorizer.state(), AuthorizationState::AwaitingCallback);

    let (status, page) = callback(pending.port(), "/callback?code=abc");
    assert_eq!(status, 200);
    assert!(page.contains("Authenticated with ClickUp"));

    assert_eq!(pending.wait().unwrap(), "tok-123");
    assert_eq!(authorizer.state(), AuthorizationState::Succeeded);

    let exchange = &token_server.requests()[0];
    assert_eq!(exchange.method, "POST");
    assert_eq!(exchange.url, "/oauth/token");
    assert!(exchange.body.contains("client_id=client-1"));
    assert!(exchange.body.contains("client_secret=secret-1"));
    assert!(exchange.body.contains("code=abc"));
}

#[test]
fn test_error_callback_fails_authorization() {
    let token_server = FakeServer::start(Vec::new());
    let authorizer = authorizer(&token_server);
    let pending = authorizer.start().unwrap();

    let (status, page) = callback(pending.port(), "/callback?error=access_denied");
    assert_eq!(status, 200);
    assert!(page.contains("Authorization failed"));

    assert_eq!(
        pending.wait().unwrap_err(),
        OAuthError::Failed("access_denied".to_string())
    );
    assert_eq!(authorizer.state(), AuthorizationState::Failed);
    assert!(token_server.requests().is_empty());
}

#[test]
fn test_token_endpoint_error_is_reported() {
    let token_server = FakeServer::start(vec![Canned::json(400, r#"{"error":"invalid_grant"}"#)]);
    let authorizer = authorizer(&token_server);
    let pending = authorizer.start().unwrap();

    callback(pending.port(), "/callback?code=stale");
    assert_eq!(
        pending.wait().unwrap_err(),
        OAuthError::Failed("token exchange error: invalid_grant".to_string())
    );
}

#[test]
fn test_other_paths_get_404_and_later_callbacks_are_ignored() {
    let token_server = FakeServer::start(vec![Canned::json(200, r#"{"access_token":"first"}"#)]);
    let authorizer = authorizer(&token_server);
    let pending = authorizer.start().unwrap();

    let (status, _) = callback(pending.port(), "/favicon.ico");
    assert_eq!(status, 404);

    callback(pending.port(), "/callback?code=one");
    let (status, page) = callback(pending.port(), "/callback?code=two");
    assert_eq!(status, 200);
    assert!(page.contains("Already handled"));

    assert_eq!(pending.wait().unwrap(), "first");
    assert_eq!(token_server.requests().len(), 1);
}

/// True once the port can be bound again, polling for at most `limit`.
fn rebinds_within(port: u16, limit: Duration) -> bool {
    let started = Instant::now();
    loop {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(_) => return true,
            Err(_) if started.elapsed() < limit => thread::sleep(Duration::from_millis(20)),
            Err(_) => return false,
        }
    }
}

#[test]
fn test_timeout_releases_the_port() {
    let token_server = FakeServer::start(Vec::new());
    let authorizer = OAuthAuthorizer::new("client-1", "secret-1")
        .with_token_url(format!("{}/oauth/token", token_server.url()))
        .with_timeout(Duration::from_millis(200));
    let pending = authorizer.start().unwrap();
    let port = pending.port();

    let err = pending.wait().unwrap_err();
    assert_eq!(err, OAuthError::TimedOut(Duration::from_millis(200)));
    assert_eq!(authorizer.state(), AuthorizationState::TimedOut);

    assert!(
        rebinds_within(port, Duration::from_secs(2)),
        "port {} still in use after timeout",
        port
    );
}

#[test]
fn test_timeout_during_slow_exchange_releases_the_port() {
    let token_server = FakeServer::start(vec![
        Canned::json(200, r#"{"access_token":"late"}"#).with_delay(Duration::from_secs(3)),
    ]);
    let authorizer = OAuthAuthorizer::new("client-1", "secret-1")
        .with_token_url(format!("{}/oauth/token", token_server.url()))
        .with_timeout(Duration::from_millis(300))
        .with_shutdown_grace(Duration::from_millis(100));
    let pending = authorizer.start().unwrap();
    let port = pending.port();

    let browser = thread::spawn(move || {
        let url = format!("http://127.0.0.1:{}/callback?code=slow", port);
        let _ = ureq::get(&url).call();
    });

    // Wait until the token exchange is in flight.
    let started = Instant::now();
    while token_server.requests().is_empty() && started.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(token_server.requests().len(), 1);

    let err = pending.wait().unwrap_err();
    assert_eq!(err, OAuthError::TimedOut(Duration::from_millis(300)));

    // Well before the 3s exchange finishes.
    assert!(
        rebinds_within(port, Duration::from_secs(1)),
        "port {} still bound while the exchange was running",
        port
    );
    let _ = browser.join();
}
