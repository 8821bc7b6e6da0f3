//! Integration tests for the HTTP remote store against a mock server.

use secrecy::SecretString;
use mockito::{Matcher, Server};
use wreckvault::errors::{AppError, AuthError, RemoteError};
use wreckvault::remote::{HttpRemote, RemoteStore};
use wreckvault::vault::RecordPayload;

const RECORD_JSON: &str = r#"{
    "id": 11,
    "user_id": 7,
    "service_name": "Mail",
    "account_username": null,
    "encrypted_blob": "wv1$c2FsdHNhbHRzYWx0c2FsdA==$bm9uY2Vib2R5",
    "iv": "embedded",
    "website_url": null,
    "created_at": "2024-01-15T10:00:00Z",
    "updated_at": "2024-01-15T10:00:00Z"
}"#;

fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

fn payload() -> RecordPayload {
    RecordPayload {
        service_name: "Mail".to_string(),
        account_username: String::new(),
        encrypted_blob: "ciphertext".to_string(),
        iv: "embedded".to_string(),
        website_url: None,
    }
}

#[test]
fn test_login_returns_user() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/auth/login")
        .match_body(Matcher::PartialJsonString(
            r#"{"username": "alice", "password": "correcthorse"}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "Login successful", "user": {"id": 7, "username": "alice"}}"#)
        .create();

    let remote = HttpRemote::new(format!("{}/api/", server.url()));
    let user = remote
        .login("alice", &secret("correcthorse"))
        .expect("login");

    assert_eq!(user.id, 7);
    assert_eq!(user.username, "alice");
    assert_eq!(user.created_at, None);
    mock.assert();
}

#[test]
fn test_rejected_login_carries_server_message() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/auth/login")
        .with_status(401)
        .with_body(r#"{"error": "Invalid credentials"}"#)
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let err = remote
        .login("alice", &secret("wrongpass"))
        .expect_err("rejected");

    assert!(matches!(err, AppError::Auth(AuthError::Rejected(ref m)) if m == "Invalid credentials"));
    assert!(!err.is_retryable());
}

#[test]
fn test_rejected_registration_without_body_uses_fallback() {
    let mut server = Server::new();
    server
        .mock("POST", "/api/auth/register")
        .with_status(400)
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let err = remote
        .register("alice", &secret("correcthorse"))
        .expect_err("rejected");

    assert_eq!(err.to_string(), "Authentication failed: Registration failed");
}

#[test]
fn test_list_sends_identity_and_parses_records() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/vault")
        .match_header("x-user-id", "7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!("[{}]", RECORD_JSON))
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let records = remote.list_records(7).expect("list");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 11);
    assert_eq!(records[0].service_name, "Mail");
    assert_eq!(records[0].account_username, "");
    assert_eq!(records[0].website_url, None);
    assert!(records[0].encrypted_blob.starts_with("wv1$"));
    mock.assert();
}

#[test]
fn test_create_posts_payload() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/vault")
        .match_header("x-user-id", "7")
        .match_body(Matcher::PartialJsonString(
            r#"{"service_name": "Mail", "encrypted_blob": "ciphertext", "iv": "embedded"}"#
                .to_string(),
        ))
        .with_status(201)
        .with_body(RECORD_JSON)
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let record = remote.create_record(7, &payload()).expect("create");

    assert_eq!(record.id, 11);
    mock.assert();
}

#[test]
fn test_update_missing_record_is_not_found() {
    let mut server = Server::new();
    server
        .mock("PUT", "/api/vault/99")
        .with_status(404)
        .with_body(r#"{"error": "Entry not found"}"#)
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let err = remote
        .update_record(7, 99, &payload())
        .expect_err("missing");

    assert!(matches!(err, AppError::Remote(RemoteError::NotFound(99))));
}

#[test]
fn test_delete_sends_identity() {
    let mut server = Server::new();
    let mock = server
        .mock("DELETE", "/api/vault/11")
        .match_header("x-user-id", "7")
        .with_status(200)
        .with_body(r#"{"message": "Entry deleted"}"#)
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    remote.delete_record(7, 11).expect("delete");
    mock.assert();
}

#[test]
fn test_server_error_is_retryable_status() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/vault")
        .with_status(500)
        .with_body(r#"{"error": "database is locked"}"#)
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let err = remote.list_records(7).expect_err("server error");

    match &err {
        AppError::Remote(RemoteError::Status { status, message }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "database is locked");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
    assert!(err.is_retryable());
}

#[test]
fn test_malformed_body_is_invalid_response() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/vault")
        .with_status(200)
        .with_body("<html>proxy login</html>")
        .create();

    let remote = HttpRemote::new(format!("{}/api", server.url()));
    let err = remote.list_records(7).expect_err("bad body");

    assert!(matches!(
        err,
        AppError::Remote(RemoteError::InvalidResponse(_))
    ));
}
