//! HTTP client for the vault REST API.
//!
//! Vault requests carry the caller identity in the `x-user-id` header; the
//! server scopes every query to that owner.

use crate::constants::USER_ID_HEADER;
use crate::errors::{AppResult, AuthError, RemoteError};
use crate::remote::{RemoteStore, User};
use crate::vault::{EncryptedRecord, RecordPayload};
use secrecy::{ExposeSecret, SecretString};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Request body for login and registration.
#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response from login and registration.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: User,
}

/// Error body returned by the server on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the remote vault API.
pub struct HttpRemote {
    base_url: String,
    client: Client,
}

impl HttpRemote {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the API including the `/api` prefix
    ///   (e.g., "http://localhost:5000/api")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        request
            .send()
            .map_err(|e| RemoteError::Unavailable(e).into())
    }

    fn authenticate(
        &self,
        path: &str,
        username: &str,
        password: &SecretString,
        fallback: &str,
    ) -> AppResult<User> {
        debug!("POST {}", path);

        let body = Credentials {
            username,
            password: password.expose_secret(),
        };
        let response = self.send(self.client.post(self.url(path)).json(&body))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let message = error_message(response).unwrap_or_else(|| fallback.to_string());
            return Err(AuthError::Rejected(message).into());
        }
        let auth: AuthResponse = parse(check_status(response)?)?;
        Ok(auth.user)
    }
}

impl RemoteStore for HttpRemote {
    fn register(&self, username: &str, password: &SecretString) -> AppResult<User> {
        self.authenticate("/auth/register", username, password, "Registration failed")
    }

    fn login(&self, username: &str, password: &SecretString) -> AppResult<User> {
        self.authenticate("/auth/login", username, password, "Login failed")
    }

    fn list_records(&self, user_id: i64) -> AppResult<Vec<EncryptedRecord>> {
        debug!("GET /vault");

        let response = self.send(
            self.client
                .get(self.url("/vault"))
                .header(USER_ID_HEADER, user_id.to_string()),
        )?;

        let records: Vec<EncryptedRecord> = parse(check_status(response)?)?;
        debug!("Fetched {} encrypted records", records.len());
        Ok(records)
    }

    fn create_record(&self, user_id: i64, payload: &RecordPayload) -> AppResult<EncryptedRecord> {
        debug!("POST /vault");

        let response = self.send(
            self.client
                .post(self.url("/vault"))
                .header(USER_ID_HEADER, user_id.to_string())
                .json(payload),
        )?;

        parse(check_status(response)?)
    }

    fn update_record(
        &self,
        user_id: i64,
        id: i64,
        payload: &RecordPayload,
    ) -> AppResult<EncryptedRecord> {
        debug!("PUT /vault/{}", id);

        let response = self.send(
            self.client
                .put(self.url(&format!("/vault/{}", id)))
                .header(USER_ID_HEADER, user_id.to_string())
                .json(payload),
        )?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(id).into());
        }
        parse(check_status(response)?)
    }

    fn delete_record(&self, user_id: i64, id: i64) -> AppResult<()> {
        debug!("DELETE /vault/{}", id);

        let response = self.send(
            self.client
                .delete(self.url(&format!("/vault/{}", id)))
                .header(USER_ID_HEADER, user_id.to_string()),
        )?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(id).into());
        }
        check_status(response)?;
        Ok(())
    }
}

/// Turn a non-success response into `RemoteError::Status`.
fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = error_message(response).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    }
    .into())
}

fn error_message(response: Response) -> Option<String> {
    let text = response.text().unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .or_else(|| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}

fn parse<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    response.json().map_err(|e| {
        RemoteError::InvalidResponse(format!("Failed to parse response body: {}", e)).into()
    })
}
