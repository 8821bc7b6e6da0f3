//! Remote encrypted store collaborator.
//!
//! The remote store authenticates users and persists [`EncryptedRecord`]s keyed
//! by owner. It never sees a plaintext secret. Ownership is enforced on the
//! server side; the client only asserts its identity.
//!
//! # Module Structure
//!
//! - `http`: client for the REST API (`/auth/*`, `/vault`)
//! - `memory`: in-process store with the same semantics, for tests and offline use
//!
//! [`EncryptedRecord`]: crate::vault::EncryptedRecord

pub mod http;
pub mod memory;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

use crate::errors::AppResult;
use crate::vault::{EncryptedRecord, RecordPayload};
use secrecy::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated identity as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Operations the client needs from the remote store.
///
/// Implementations return `AuthError` for refused credentials and `RemoteError`
/// for everything else; a failed call must not have partially applied.
pub trait RemoteStore {
    /// Create an account. The password is hashed server-side.
    fn register(&self, username: &str, password: &SecretString) -> AppResult<User>;

    /// Verify credentials and return the identity.
    fn login(&self, username: &str, password: &SecretString) -> AppResult<User>;

    /// All records owned by `user_id`, newest-created first.
    fn list_records(&self, user_id: i64) -> AppResult<Vec<EncryptedRecord>>;

    /// Insert a record; the store assigns the id.
    fn create_record(&self, user_id: i64, payload: &RecordPayload) -> AppResult<EncryptedRecord>;

    /// Replace a record owned by `user_id`.
    ///
    /// Returns `RemoteError::NotFound` if `id` is missing or owned by someone else.
    fn update_record(
        &self,
        user_id: i64,
        id: i64,
        payload: &RecordPayload,
    ) -> AppResult<EncryptedRecord>;

    /// Delete a record owned by `user_id`.
    fn delete_record(&self, user_id: i64, id: i64) -> AppResult<()>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for &R {
    fn register(&self, username: &str, password: &SecretString) -> AppResult<User> {
        (**self).register(username, password)
    }

    fn login(&self, username: &str, password: &SecretString) -> AppResult<User> {
        (**self).login(username, password)
    }

    fn list_records(&self, user_id: i64) -> AppResult<Vec<EncryptedRecord>> {
        (**self).list_records(user_id)
    }

    fn create_record(&self, user_id: i64, payload: &RecordPayload) -> AppResult<EncryptedRecord> {
        (**self).create_record(user_id, payload)
    }

    fn update_record(
        &self,
        user_id: i64,
        id: i64,
        payload: &RecordPayload,
    ) -> AppResult<EncryptedRecord> {
        (**self).update_record(user_id, id, payload)
    }

    fn delete_record(&self, user_id: i64, id: i64) -> AppResult<()> {
        (**self).delete_record(user_id, id)
    }
}
