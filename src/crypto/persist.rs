//! Session restoration across process restarts.
//!
//! A snapshot of the live session is kept in a volatile directory (a per-login
//! runtime directory or a RAM-backed filesystem) so consecutive commands share
//! one login. The snapshot never goes to durable storage: when no volatile
//! directory exists, restoration is simply unavailable.

use crate::constants::{APP_NAME, ENV_VAR_XDG_RUNTIME_DIR, SESSION_FILE_NAME, TMPFS_PATHS};
use crate::crypto::session::{LockCause, SessionManager, SessionState};
use crate::errors::AppResult;
use crate::remote::User;
use crate::secure_fs::{ensure_private_dir, restrict_file};
use secrecy::{ExposeSecret, SecretString};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

#[derive(Serialize)]
struct SnapshotRef<'a> {
    user: &'a User,
    passphrase: &'a str,
    last_activity: DateTime<Utc>,
}

#[derive(Deserialize)]
struct Snapshot {
    user: User,
    passphrase: String,
    last_activity: DateTime<Utc>,
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.passphrase.zeroize();
    }
}

/// Returns the volatile directory for session snapshots, if one exists.
///
/// Checks `$XDG_RUNTIME_DIR`, then the RAM-backed filesystems in
/// [`TMPFS_PATHS`]. Never falls back to a durable location.
pub fn volatile_session_dir() -> Option<PathBuf> {
    if let Ok(runtime) = std::env::var(ENV_VAR_XDG_RUNTIME_DIR) {
        let runtime = PathBuf::from(runtime);
        if runtime.is_absolute() && runtime.is_dir() {
            return Some(runtime.join(APP_NAME));
        }
    }

    let user = std::env::var("USER").unwrap_or_else(|_| "default".to_string());
    TMPFS_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.is_dir())
        .map(|path| path.join(format!("{}-{}", APP_NAME, user)))
}

/// Reads and writes the session snapshot file.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store snapshots in `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the live session, or remove the snapshot if there is none.
    pub fn save(&self, session: &SessionManager) -> AppResult<()> {
        let (user, passphrase) = match (session.user(), session.passphrase()) {
            (Some(user), Some(passphrase)) => (user, passphrase),
            _ => return self.clear(),
        };

        let idle = session.idle_for().unwrap_or_default();
        let idle = chrono::Duration::from_std(idle).unwrap_or_else(|_| chrono::Duration::zero());
        let snapshot = SnapshotRef {
            user,
            passphrase: passphrase.expose_secret(),
            last_activity: Utc::now() - idle,
        };
        let json = Zeroizing::new(serde_json::to_string(&snapshot)?);

        if let Some(dir) = self.path.parent() {
            ensure_private_dir(dir)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        restrict_file(&file)?;

        file.lock_exclusive()?;
        let written = file
            .set_len(0)
            .and_then(|_| file.write_all(json.as_bytes()))
            .and_then(|_| file.sync_all());
        file.unlock()?;
        written?;

        debug!("Saved session snapshot for user {}", user.id);
        Ok(())
    }

    /// Restore a saved session into `session`.
    ///
    /// A snapshot older than the session's inactivity window is discarded and
    /// `session` ends up locked with [`LockCause::AutoLocked`]. A missing or
    /// unreadable snapshot leaves `session` unchanged.
    pub fn restore(&self, session: &mut SessionManager) -> AppResult<SessionState> {
        let snapshot = match self.read()? {
            Some(snapshot) => snapshot,
            None => return Ok(session.state()),
        };

        let elapsed = (Utc::now() - snapshot.last_activity)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let user = snapshot.user.clone();
        let passphrase = SecretString::new(snapshot.passphrase.clone());
        drop(snapshot);

        let now = Instant::now();
        let last_activity = now.checked_sub(elapsed).unwrap_or(now);
        session.unlock_at(user, passphrase, last_activity);

        if session.window().is_some_and(|window| elapsed >= window) {
            session.lock_with(LockCause::AutoLocked);
            self.clear()?;
            info!("Saved session expired after {:?} idle", elapsed);
        }
        Ok(session.poll_at(now))
    }

    /// Remove the snapshot. Missing files are fine.
    pub fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed session snapshot");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> AppResult<Option<Snapshot>> {
        let mut file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut contents = Zeroizing::new(String::new());
        let read = file.read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<Snapshot>(&contents) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Discarding unreadable session snapshot: {}", e);
                self.clear()?;
                Ok(None)
            }
        }
    }
}
