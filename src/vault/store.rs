//! Client-resident cache of decrypted entries, synchronized with a remote store.
//!
//! Every mutation goes to the remote store first and is applied to the cache
//! only after that call succeeds. A failed call leaves the cache exactly as it
//! was.

use crate::constants::EMBEDDED_IV_MARKER;
use crate::crypto::{SessionKey, SessionManager};
use crate::errors::AppResult;
use crate::remote::RemoteStore;
use crate::vault::model::{Credential, NewCredential, RecordPayload, SecretValue};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

/// Outcome of [`VaultStore::fetch_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Entries now in the cache.
    pub total: usize,
    /// Entries whose secret did not decrypt.
    pub failed: usize,
}

/// Vault entry store.
///
/// # Example
///
/// ```
/// use wreckvault::crypto::SessionManager;
/// use wreckvault::remote::MemoryRemote;
/// use wreckvault::vault::{NewCredential, VaultStore};
/// use secrecy::SecretString;
///
/// let remote = MemoryRemote::new();
/// let mut session = SessionManager::new(15);
/// session.register(&remote, "alice", SecretString::new("correcthorse".into())).unwrap();
///
/// let mut vault = VaultStore::new(&remote);
/// vault.add(&mut session, NewCredential::new("Mail", "p@ss")).unwrap();
/// vault.fetch_all(&mut session).unwrap();
/// assert_eq!(vault.entries()[0].secret.expose(), Some("p@ss"));
/// ```
pub struct VaultStore<R> {
    remote: R,
    entries: Vec<Credential>,
}

impl<R: RemoteStore> VaultStore<R> {
    /// Create an empty store backed by `remote`.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            entries: Vec::new(),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Cached entries in display order.
    pub fn entries(&self) -> &[Credential] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&Credential> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Cached entries whose service name or account username contains `query`,
    /// ignoring case. An empty query matches everything.
    pub fn search<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a Credential> + 'a {
        self.entries.iter().filter(move |entry| entry.matches(query))
    }

    /// Drop every cached plaintext.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("Clearing {} cached entries", self.entries.len());
        }
        self.entries.clear();
    }

    /// Replace the cache with every record owned by the session user.
    ///
    /// Records that fail to decrypt stay in the cache with
    /// [`SecretValue::DecryptionFailed`]. Records sealed in the same session
    /// share a salt, so their key is derived only once.
    ///
    /// # Errors
    ///
    /// A locked session clears the cache and returns `VaultLocked` or
    /// `AutoLocked`. A remote failure leaves the cache unchanged.
    pub fn fetch_all(&mut self, session: &mut SessionManager) -> AppResult<FetchReport> {
        let key = self.key(session)?;
        let records = self.remote.list_records(key.user_id)?;

        let mut failed = 0;
        let entries: Vec<Credential> = records
            .into_iter()
            .map(|record| {
                let secret = match key.keys.decrypt(&record.encrypted_blob) {
                    Ok(plaintext) => SecretValue::plain(plaintext),
                    Err(e) => {
                        warn!("Entry {} could not be decrypted: {}", record.id, e);
                        failed += 1;
                        SecretValue::DecryptionFailed
                    }
                };
                Credential::from_record(record, secret)
            })
            .collect();

        self.entries = entries;
        info!(
            "Fetched {} entries ({} undecryptable)",
            self.entries.len(),
            failed
        );
        Ok(FetchReport {
            total: self.entries.len(),
            failed,
        })
    }

    /// Encrypt and store a new entry, then prepend it to the cache.
    ///
    /// The cached secret is the plaintext given here; the new ciphertext is
    /// not decrypted again.
    pub fn add(&mut self, session: &mut SessionManager, entry: NewCredential) -> AppResult<&Credential> {
        entry.validate()?;
        let key = self.key(session)?;
        let payload = seal(&entry, &key)?;

        let record = self.remote.create_record(key.user_id, &payload)?;
        debug!("Created entry {} for {}", record.id, record.service_name);

        let credential = Credential::from_record(record, SecretValue::Plain(entry.secret));
        self.entries.insert(0, credential);
        Ok(&self.entries[0])
    }

    /// Re-encrypt and replace an existing entry, keeping its cache position.
    ///
    /// # Errors
    ///
    /// `RemoteError::NotFound` when `id` is missing or belongs to another user.
    pub fn update(
        &mut self,
        session: &mut SessionManager,
        id: i64,
        entry: NewCredential,
    ) -> AppResult<&Credential> {
        entry.validate()?;
        let key = self.key(session)?;
        let payload = seal(&entry, &key)?;

        let record = self.remote.update_record(key.user_id, id, &payload)?;
        debug!("Updated entry {}", record.id);

        let credential = Credential::from_record(record, SecretValue::Plain(entry.secret));
        let index = match self.entries.iter().position(|cached| cached.id == id) {
            Some(index) => {
                self.entries[index] = credential;
                index
            }
            None => {
                // Updated remotely but never fetched here.
                self.entries.insert(0, credential);
                0
            }
        };
        Ok(&self.entries[index])
    }

    /// Delete an entry remotely, then drop it from the cache.
    pub fn delete(&mut self, session: &mut SessionManager, id: i64) -> AppResult<()> {
        let key = self.key(session)?;
        self.remote.delete_record(key.user_id, id)?;

        self.entries.retain(|cached| cached.id != id);
        debug!("Deleted entry {}", id);
        Ok(())
    }

    fn key<'s>(&mut self, session: &'s mut SessionManager) -> AppResult<SessionKey<'s>> {
        match session.key() {
            Ok(key) => Ok(key),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }
}

fn seal(entry: &NewCredential, key: &SessionKey<'_>) -> AppResult<RecordPayload> {
    let encrypted_blob = key.keys.encrypt(entry.secret.expose_secret())?;
    Ok(RecordPayload {
        service_name: entry.service_name.trim().to_string(),
        account_username: entry.account_username.clone(),
        encrypted_blob,
        iv: EMBEDDED_IV_MARKER.to_string(),
        website_url: entry.website_url.clone(),
    })
}
