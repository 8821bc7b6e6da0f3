//! Plaintext export and bulk import of vault entries.
//!
//! Export writes every decrypted secret in the clear. Callers must get an
//! explicit confirmation from the user before calling [`write_export`].

use crate::constants::{EXPORT_DATE_FORMAT, EXPORT_FILE_PREFIX};
use crate::crypto::SessionManager;
use crate::errors::{AppResult, ImportError};
use crate::remote::RemoteStore;
use crate::secure_fs::restrict_file;
use crate::vault::{Credential, NewCredential, VaultStore};
use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

/// One exported entry, secret in plaintext.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub service_name: String,
    pub account_username: String,
    pub password: String,
    pub website_url: Option<String>,
    pub exported_at: DateTime<Utc>,
}

impl fmt::Debug for ExportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRecord")
            .field("service_name", &self.service_name)
            .field("account_username", &self.account_username)
            .field("password", &"[REDACTED]")
            .field("website_url", &self.website_url)
            .field("exported_at", &self.exported_at)
            .finish()
    }
}

impl Drop for ExportRecord {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Result of [`export_all`].
///
/// An entry whose secret did not decrypt is not written with the
/// `*** DECRYPTION ERROR ***` placeholder as its password. It is left out of
/// `records` and counted in `skipped`, so a later import never stores the
/// placeholder as a real secret.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    /// Entries with a readable secret, in cache order.
    pub records: Vec<ExportRecord>,
    /// Entries left out because their secret did not decrypt.
    pub skipped: usize,
}

/// Report of a completed export file write.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Where the file was written
    pub path: PathBuf,
    /// Number of entries in the file
    pub count: usize,
    /// Entries left out because they did not decrypt
    pub skipped: usize,
    /// BLAKE3 checksum of the written file
    pub checksum: String,
    /// Duration taken to serialize and write
    pub duration: Duration,
}

/// Counts from an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Every element of the input array.
    pub attempted: usize,
    /// Elements that became vault entries.
    pub succeeded: usize,
    /// Elements missing a service name or secret, or of the wrong shape.
    pub skipped: usize,
    /// Well-formed elements the remote store refused.
    pub failed: usize,
}

/// Fields read from one import element. Everything is optional so that
/// incomplete records are counted instead of aborting the whole import.
///
/// The secret is read from `password`, falling back to `secret` when
/// `password` is missing or empty.
#[derive(Deserialize)]
struct ImportRecord {
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    account_username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    website_url: Option<String>,
}

impl Drop for ImportRecord {
    fn drop(&mut self) {
        for value in [self.password.as_mut(), self.secret.as_mut()].into_iter().flatten() {
            value.zeroize();
        }
    }
}

impl ImportRecord {
    fn to_entry(&self) -> Option<NewCredential> {
        let service_name = self.service_name.as_deref().filter(|s| !s.trim().is_empty())?;
        let password = [self.password.as_deref(), self.secret.as_deref()]
            .into_iter()
            .flatten()
            .find(|p| !p.is_empty())?;

        let mut entry = NewCredential::new(service_name, password)
            .with_account_username(self.account_username.clone().unwrap_or_default());
        if let Some(url) = &self.website_url {
            entry = entry.with_website_url(url.clone());
        }
        Some(entry)
    }
}

/// Produce the plaintext form of every readable cached entry.
///
/// Entries that failed to decrypt are counted in `skipped` rather than
/// exported with a placeholder secret. See [`ExportBundle`].
pub fn export_all(entries: &[Credential]) -> ExportBundle {
    let exported_at = Utc::now();
    let mut skipped = 0;
    let records = entries
        .iter()
        .filter_map(|entry| match entry.secret.expose() {
            Some(secret) => Some(ExportRecord {
                service_name: entry.service_name.clone(),
                account_username: entry.account_username.clone(),
                password: secret.to_string(),
                website_url: entry.website_url.clone(),
                exported_at,
            }),
            None => {
                warn!("Skipping undecryptable entry {} in export", entry.id);
                skipped += 1;
                None
            }
        })
        .collect();

    ExportBundle { records, skipped }
}

/// Default export file name for `now`, e.g. `wreckvault-export-2024-01-15.json`.
pub fn default_export_file_name(now: DateTime<Utc>) -> String {
    format!(
        "{}{}.json",
        EXPORT_FILE_PREFIX,
        now.format(EXPORT_DATE_FORMAT)
    )
}

/// Writes an export bundle as pretty-printed JSON.
///
/// # Flow
///
/// 1. Serialize the records to a JSON array
/// 2. Write to an owner-only temporary file next to `path`
/// 3. Rename over `path`
/// 4. Checksum the written bytes
///
/// A failed write never leaves a partial file at `path`.
pub fn write_export(bundle: &ExportBundle, path: &Path) -> AppResult<ExportReport> {
    let start_time = Instant::now();
    info!("Writing plaintext export of {} entries", bundle.records.len());

    let json = Zeroizing::new(serde_json::to_string_pretty(&bundle.records)?);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut temp = NamedTempFile::new_in(&dir)?;
    restrict_file(temp.as_file())?;
    temp.write_all(json.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    let mut hasher = Hasher::new();
    hasher.update(json.as_bytes());
    let checksum = hasher.finalize().to_hex().to_string();
    debug!("Export checksum: {}", checksum);

    Ok(ExportReport {
        path: path.to_path_buf(),
        count: bundle.records.len(),
        skipped: bundle.skipped,
        checksum,
        duration: start_time.elapsed(),
    })
}

/// Parse an import document.
///
/// # Errors
///
/// Returns `ImportError::Malformed` for invalid JSON.
pub fn parse_import(contents: &str) -> AppResult<Value> {
    serde_json::from_str(contents)
        .map_err(|e| ImportError::Malformed(format!("not valid JSON: {}", e)).into())
}

/// Read and parse an import file.
pub fn read_import_file(path: &Path) -> AppResult<Value> {
    let contents = Zeroizing::new(fs::read_to_string(path)?);
    parse_import(&contents)
}

/// Add every usable element of `input` to the vault.
///
/// Each element needs a non-empty `service_name` and a non-empty `password`
/// (or `secret`); `account_username` and `website_url` are optional. Elements
/// without them are skipped, and a remote refusal is counted as failed; either
/// way processing continues.
///
/// # Errors
///
/// Returns `ImportError::Malformed` before any entry is added when `input` is
/// not an array. A session that locks mid-import stops the run with
/// `VaultLocked` or `AutoLocked`; entries already added stay added.
pub fn import_all<R: RemoteStore>(
    vault: &mut VaultStore<R>,
    session: &mut SessionManager,
    input: &Value,
) -> AppResult<ImportReport> {
    let items = input
        .as_array()
        .ok_or_else(|| ImportError::Malformed("root must be an array".to_string()))?;

    let mut report = ImportReport::default();
    for (index, item) in items.iter().enumerate() {
        report.attempted += 1;

        let entry = ImportRecord::deserialize(item)
            .ok()
            .and_then(|record| record.to_entry());
        let entry = match entry {
            Some(entry) => entry,
            None => {
                debug!("Skipping import element {}: missing service name or secret", index);
                report.skipped += 1;
                continue;
            }
        };

        match vault.add(session, entry) {
            Ok(_) => report.succeeded += 1,
            Err(e) if e.is_locked() => return Err(e),
            Err(e) => {
                warn!("Import element {} failed: {}", index, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Imported {} of {} entries ({} skipped, {} failed)",
        report.succeeded, report.attempted, report.skipped, report.failed
    );
    Ok(report)
}

/// Read `path` and import its entries.
pub fn import_file<R: RemoteStore>(
    vault: &mut VaultStore<R>,
    session: &mut SessionManager,
    path: &Path,
) -> AppResult<ImportReport> {
    let input = read_import_file(path)?;
    import_all(vault, session, &input)
}
