//! In-process remote store.
//!
//! Mirrors the server's behavior closely enough to drive the client in tests:
//! argon2-hashed account passwords, owner-scoped records, server-assigned ids,
//! and the same refusal messages.

use crate::errors::{AppResult, AuthError, RemoteError};
use crate::remote::{RemoteStore, User};
use crate::vault::{EncryptedRecord, RecordPayload};
use secrecy::{ExposeSecret, SecretString};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

struct Account {
    user: User,
    password_hash: String,
}

struct StoredRecord {
    owner: i64,
    record: EncryptedRecord,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    records: Vec<StoredRecord>,
    next_user_id: i64,
    next_record_id: i64,
    offline: bool,
}

/// Remote store held in memory.
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every vault call fail as if the server were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Overwrite the stored ciphertext of a record. Returns false if absent.
    pub fn tamper_blob(&self, id: i64, blob: &str) -> bool {
        let mut state = self.lock();
        match state.records.iter_mut().find(|r| r.record.id == id) {
            Some(stored) => {
                stored.record.encrypted_blob = blob.to_string();
                true
            }
            None => false,
        }
    }

    /// Number of records owned by `user_id`.
    pub fn record_count(&self, user_id: i64) -> usize {
        self.lock()
            .records
            .iter()
            .filter(|r| r.owner == user_id)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn online(&self) -> AppResult<MutexGuard<'_, State>> {
        let state = self.lock();
        if state.offline {
            return Err(RemoteError::Status {
                status: 503,
                message: "Service unavailable".to_string(),
            }
            .into());
        }
        Ok(state)
    }
}

fn hash_password(password: &SecretString) -> AppResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| RemoteError::InvalidResponse(format!("salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| RemoteError::InvalidResponse(format!("password hash: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &SecretString, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.expose_secret().as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

impl RemoteStore for MemoryRemote {
    fn register(&self, username: &str, password: &SecretString) -> AppResult<User> {
        if username.is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::Rejected("Username and password required".to_string()).into());
        }

        let mut state = self.lock();
        if state.accounts.iter().any(|a| a.user.username == username) {
            return Err(AuthError::Rejected("Username already exists".to_string()).into());
        }

        let password_hash = hash_password(password)?;
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: username.to_string(),
            created_at: Some(Utc::now()),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password_hash,
        });
        debug!("Registered in-memory account {}", user.id);
        Ok(user)
    }

    fn login(&self, username: &str, password: &SecretString) -> AppResult<User> {
        let state = self.lock();
        state
            .accounts
            .iter()
            .find(|a| a.user.username == username)
            .filter(|a| verify_password(password, &a.password_hash))
            .map(|a| a.user.clone())
            .ok_or_else(|| AuthError::Rejected("Invalid credentials".to_string()).into())
    }

    fn list_records(&self, user_id: i64) -> AppResult<Vec<EncryptedRecord>> {
        let state = self.online()?;
        let mut records: Vec<EncryptedRecord> = state
            .records
            .iter()
            .filter(|r| r.owner == user_id)
            .map(|r| r.record.clone())
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    fn create_record(&self, user_id: i64, payload: &RecordPayload) -> AppResult<EncryptedRecord> {
        let mut state = self.online()?;
        state.next_record_id += 1;
        let now = Utc::now();
        let record = EncryptedRecord {
            id: state.next_record_id,
            service_name: payload.service_name.clone(),
            account_username: payload.account_username.clone(),
            encrypted_blob: payload.encrypted_blob.clone(),
            website_url: payload.website_url.clone(),
            created_at: now,
            updated_at: now,
        };
        state.records.push(StoredRecord {
            owner: user_id,
            record: record.clone(),
        });
        Ok(record)
    }

    fn update_record(
        &self,
        user_id: i64,
        id: i64,
        payload: &RecordPayload,
    ) -> AppResult<EncryptedRecord> {
        let mut state = self.online()?;
        let stored = state
            .records
            .iter_mut()
            .find(|r| r.owner == user_id && r.record.id == id)
            .ok_or(RemoteError::NotFound(id))?;

        stored.record.service_name = payload.service_name.clone();
        stored.record.account_username = payload.account_username.clone();
        stored.record.encrypted_blob = payload.encrypted_blob.clone();
        stored.record.website_url = payload.website_url.clone();
        stored.record.updated_at = Utc::now();
        Ok(stored.record.clone())
    }

    fn delete_record(&self, user_id: i64, id: i64) -> AppResult<()> {
        let mut state = self.online()?;
        // Deleting an absent id succeeds, matching the server.
        state
            .records
            .retain(|r| !(r.owner == user_id && r.record.id == id));
        Ok(())
    }
}
