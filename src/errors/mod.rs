//! Error handling utilities for the wreckvault application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! Every failure is recoverable at the operation boundary. Remote failures leave
//! the local cache untouched and can be retried; see [`AppError::is_retryable`].

use thiserror::Error;

/// Represents specific error cases that can occur during cryptographic operations
/// and session key handling.
///
/// # Examples
///
/// ```
/// use wreckvault::errors::CryptoError;
///
/// let error = CryptoError::VaultLocked;
/// let message = format!("{}", error);
/// assert!(message.contains("locked"));
/// assert!(message.contains("log in"));
/// ```
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No passphrase is held; the caller must log in first.
    #[error("Vault locked. Please log in again to unlock it with your master password.")]
    VaultLocked,

    /// The session was closed by the inactivity timer.
    #[error("Vault auto-locked after inactivity. Please log in again.\n\nNote: the inactivity window is configurable with `wreckvault auto-lock <minutes>`.")]
    AutoLocked,

    /// Plaintext or passphrase was empty.
    #[error("Cannot {0} with an empty value or empty passphrase")]
    EmptyInput(&'static str),

    /// Error during encryption operation.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Wrong passphrase, or a sealed blob that fails authentication.
    #[error("Decryption failed: wrong passphrase or corrupted data")]
    DecryptionFailed,

    /// Deriving the encryption key from the passphrase failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Ciphertext does not carry the expected version tag.
    #[error("Unsupported encryption format")]
    UnsupportedFormat,

    /// Ciphertext decrypted but the payload is unreadable.
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Reading the passphrase from the terminal failed.
    #[error("Failed to read passphrase: {0}")]
    PassphrasePrompt(String),

    /// Passphrase and its confirmation differ.
    #[error("Passphrases do not match. Please try again.")]
    PassphraseMismatch,

    /// The passphrase entered was empty.
    #[error("Passphrase cannot be empty")]
    EmptyPassphrase,
}

/// Authentication failures reported by the remote auth endpoints.
///
/// # Examples
///
/// ```
/// use wreckvault::errors::AuthError;
///
/// let error = AuthError::Rejected("Invalid credentials".to_string());
/// assert!(format!("{}", error).contains("Invalid credentials"));
/// ```
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server refused the credentials or the registration.
    #[error("{0}")]
    Rejected(String),
}

/// Represents failures while talking to the remote encrypted store.
///
/// All variants are safe to retry: a failed call never mutates local state.
///
/// # Examples
///
/// ```
/// use wreckvault::errors::RemoteError;
///
/// let error = RemoteError::NotFound(42);
/// assert!(format!("{}", error).contains("42"));
/// ```
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server could not be reached.
    #[error("Vault server unreachable: {0}. Check WRECKVAULT_SERVER and your network connection.")]
    Unavailable(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Vault server returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error text from the response body
        message: String,
    },

    /// The entry does not exist or is not owned by the caller.
    #[error("Vault entry {0} not found")]
    NotFound(i64),

    /// The response body did not match the expected shape.
    #[error("Invalid response from vault server: {0}")]
    InvalidResponse(String),
}

/// Whole-file import failures. Per-record problems are counted, not raised.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Top-level structure is not an array of records.
    #[error("Invalid import format: {0}")]
    Malformed(String),
}

/// Represents all possible errors that can occur in the wreckvault application.
///
/// # Examples
///
/// Creating a configuration error:
/// ```
/// use wreckvault::errors::AppError;
///
/// let error = AppError::Config("Missing server URL".to_string());
/// assert_eq!(format!("{}", error), "Configuration error: Missing server URL");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors for local files.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to cryptographic operations and the session key.
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Login or registration was refused.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Errors talking to the remote vault store.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Malformed import input.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// User input that cannot become a vault entry.
    #[error("Invalid entry: {0}")]
    Validation(String),

    /// The user declined a confirmation prompt.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl AppError {
    /// Returns true when repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Remote(_))
    }

    /// Returns true when the error means the session no longer holds a key.
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            AppError::Crypto(CryptoError::VaultLocked) | AppError::Crypto(CryptoError::AutoLocked)
        )
    }
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
///
/// # Examples
///
/// ```
/// use wreckvault::errors::{AppResult, AppError};
///
/// fn might_fail() -> AppResult<String> {
///     if false {
///         return Err(AppError::Config("Something went wrong".to_string()));
///     }
///     Ok("Operation succeeded".to_string())
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;
