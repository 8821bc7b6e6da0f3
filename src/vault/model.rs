//! Plaintext and ciphertext forms of a vault entry.

use crate::constants::DECRYPTION_ERROR_PLACEHOLDER;
use crate::errors::{AppError, AppResult};
use secrecy::{ExposeSecret, SecretString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Decrypted secret of a cached entry.
///
/// `DecryptionFailed` is distinct from an empty secret: it marks an entry whose
/// ciphertext could not be opened with the session passphrase.
pub enum SecretValue {
    /// Plaintext secret held in memory only.
    Plain(SecretString),
    /// The stored ciphertext did not decrypt.
    DecryptionFailed,
}

impl SecretValue {
    /// Wrap a plaintext secret.
    pub fn plain(value: impl Into<String>) -> Self {
        SecretValue::Plain(SecretString::new(value.into()))
    }

    /// The plaintext, or `None` for an undecryptable entry.
    pub fn expose(&self) -> Option<&str> {
        match self {
            SecretValue::Plain(secret) => Some(secret.expose_secret().as_str()),
            SecretValue::DecryptionFailed => None,
        }
    }

    /// Returns true for the decryption failure sentinel.
    pub fn is_failed(&self) -> bool {
        matches!(self, SecretValue::DecryptionFailed)
    }

    /// Text to show the user: the plaintext or a visible placeholder.
    pub fn display(&self) -> &str {
        self.expose().unwrap_or(DECRYPTION_ERROR_PLACEHOLDER)
    }
}

impl Clone for SecretValue {
    fn clone(&self) -> Self {
        match self {
            SecretValue::Plain(secret) => SecretValue::plain(secret.expose_secret().clone()),
            SecretValue::DecryptionFailed => SecretValue::DecryptionFailed,
        }
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Plain(_) => f.write_str("Plain([REDACTED])"),
            SecretValue::DecryptionFailed => f.write_str("DecryptionFailed"),
        }
    }
}

/// A decrypted vault entry as held in the local cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    /// Server-assigned identifier, immutable after creation.
    pub id: i64,
    pub service_name: String,
    pub account_username: String,
    pub secret: SecretValue,
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Combine server metadata with a known plaintext secret.
    pub(crate) fn from_record(record: EncryptedRecord, secret: SecretValue) -> Self {
        Self {
            id: record.id,
            service_name: record.service_name,
            account_username: record.account_username,
            secret,
            website_url: record.website_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Case-insensitive match on service name or account username.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.service_name.to_lowercase().contains(&query)
            || self.account_username.to_lowercase().contains(&query)
    }
}

/// The persisted form of a vault entry; the only form sent over the wire.
///
/// Unknown fields in the server response (`user_id`, `iv`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub id: i64,
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub account_username: String,
    /// Sealed `wv1$` ciphertext, salt and nonce included.
    pub encrypted_blob: String,
    #[serde(default)]
    pub website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPayload {
    pub service_name: String,
    pub account_username: String,
    pub encrypted_blob: String,
    /// Constant marker for the legacy column; see `EMBEDDED_IV_MARKER`.
    pub iv: String,
    pub website_url: Option<String>,
}

/// Plaintext input for adding or updating an entry.
///
/// # Example
///
/// ```
/// use wreckvault::vault::NewCredential;
///
/// let entry = NewCredential::new("Mail", "p@ss")
///     .with_account_username("alice@example.com")
///     .with_website_url("https://mail.example.com");
/// assert!(entry.validate().is_ok());
/// ```
pub struct NewCredential {
    pub service_name: String,
    pub account_username: String,
    pub secret: SecretString,
    pub website_url: Option<String>,
}

impl NewCredential {
    /// Create an entry with an empty account username and no website.
    pub fn new(service_name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_username: String::new(),
            secret: SecretString::new(secret.into()),
            website_url: None,
        }
    }

    pub fn with_account_username(mut self, account_username: impl Into<String>) -> Self {
        self.account_username = account_username.into();
        self
    }

    /// Set the website; an empty string clears it.
    pub fn with_website_url(mut self, website_url: impl Into<String>) -> Self {
        let url = website_url.into();
        self.website_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    /// Reject entries the server or the cipher would refuse.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank service name or an empty secret.
    pub fn validate(&self) -> AppResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(AppError::Validation("service name is required".to_string()));
        }
        if self.secret.expose_secret().is_empty() {
            return Err(AppError::Validation("secret is required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewCredential")
            .field("service_name", &self.service_name)
            .field("account_username", &self.account_username)
            .field("secret", &"[REDACTED]")
            .field("website_url", &self.website_url)
            .finish()
    }
}
