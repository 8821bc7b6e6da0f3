//! Session key management with auto-lock timeout.
//!
//! This module holds the master passphrase for the duration of an authenticated
//! session, enforces a single held passphrase at a time, and locks the session
//! after a configurable period without user interaction.
//!
//! The passphrase supplied at login is adopted as the vault key without any
//! check that it actually decrypts the vault. A mistyped passphrase that the
//! server still accepts (for example after a password change on another
//! client) is only discovered when entries come back undecryptable.

use crate::constants::ENV_VAR_TEST_PASSPHRASE;
use crate::crypto::cipher::KeyRing;
use crate::errors::{AppResult, CryptoError};
use crate::remote::{RemoteStore, User};
use secrecy::{ExposeSecret, SecretString};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Why the session last left the `Authenticated` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCause {
    /// Explicit logout or teardown.
    Logout,
    /// The inactivity window elapsed without interaction.
    AutoLocked,
}

/// Observable state of a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No passphrase is held. `cause` is `None` before the first login.
    LoggedOut { cause: Option<LockCause> },
    /// A passphrase is held and usable.
    Authenticated,
}

impl SessionState {
    /// Returns true for the `Authenticated` state.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}

/// Borrowed view of the live session used by vault operations.
pub struct SessionKey<'a> {
    /// Identity asserted to the remote store.
    pub user_id: i64,
    /// The session passphrase and the keys derived from it so far.
    pub keys: &'a KeyRing,
}

struct ActiveSession {
    user: User,
    keys: KeyRing,
    last_activity: Instant,
}

/// Manages the session passphrase with inactivity auto-lock.
///
/// # Example
///
/// ```no_run
/// use wreckvault::crypto::SessionManager;
/// use wreckvault::remote::User;
/// use secrecy::SecretString;
///
/// let mut session = SessionManager::new(15); // 15-minute inactivity window
///
/// let user = User { id: 1, username: "alice".to_string(), created_at: None };
/// session.unlock(user, SecretString::new("correcthorse".to_string()));
/// assert!(!session.is_locked());
///
/// session.touch(); // user interaction resets the countdown
/// session.logout();
/// assert!(session.is_locked());
/// ```
pub struct SessionManager {
    active: Option<ActiveSession>,
    window: Option<Duration>,
    last_cause: Option<LockCause>,
}

impl SessionManager {
    /// Create a new session manager with the specified inactivity window in minutes.
    ///
    /// A window of 0 disables auto-lock.
    ///
    /// # Example
    ///
    /// ```
    /// use wreckvault::crypto::SessionManager;
    ///
    /// let session = SessionManager::new(15);
    /// assert!(session.is_locked());
    /// ```
    pub fn new(auto_lock_minutes: u64) -> Self {
        Self::with_window(minutes_to_window(auto_lock_minutes))
    }

    /// Create a session manager with an explicit window (`None` disables auto-lock).
    pub fn with_window(window: Option<Duration>) -> Self {
        Self {
            active: None,
            window,
            last_cause: None,
        }
    }

    /// Authenticate against the remote auth endpoint and adopt `passphrase` as the vault key.
    ///
    /// Any previously held passphrase is dropped first. On failure the session
    /// stays logged out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` for bad credentials, or a `RemoteError` when
    /// the server cannot be reached.
    pub fn login<R: RemoteStore + ?Sized>(
        &mut self,
        remote: &R,
        username: &str,
        passphrase: SecretString,
    ) -> AppResult<&User> {
        if self.active.is_some() {
            debug!("Replacing existing session before login");
            self.logout();
        }

        let user = remote.login(username, &passphrase)?;
        info!("Logged in as user {}", user.id);
        Ok(self.adopt(user, passphrase, Instant::now()))
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` if the username is taken or the input is
    /// incomplete.
    pub fn register<R: RemoteStore + ?Sized>(
        &mut self,
        remote: &R,
        username: &str,
        passphrase: SecretString,
    ) -> AppResult<&User> {
        let created = remote.register(username, &passphrase)?;
        info!("Registered user {}", created.id);
        self.login(remote, username, passphrase)
    }

    /// Adopt an already-authenticated identity and passphrase, starting the countdown now.
    ///
    /// Used when restoring a session snapshot. The passphrase is trusted as-is.
    pub fn unlock(&mut self, user: User, passphrase: SecretString) {
        self.unlock_at(user, passphrase, Instant::now());
    }

    /// Like [`unlock`](Self::unlock) with an explicit time of last activity.
    pub fn unlock_at(&mut self, user: User, passphrase: SecretString, last_activity: Instant) {
        self.adopt(user, passphrase, last_activity);
    }

    fn adopt(&mut self, user: User, passphrase: SecretString, last_activity: Instant) -> &User {
        self.last_cause = None;
        &self
            .active
            .insert(ActiveSession {
                user,
                keys: KeyRing::new(passphrase),
                last_activity,
            })
            .user
    }

    /// Drop the passphrase and session markers. Idempotent.
    pub fn logout(&mut self) {
        self.lock_with(LockCause::Logout);
    }

    /// Leave the `Authenticated` state with the given cause.
    ///
    /// Has no effect when already logged out.
    pub fn lock_with(&mut self, cause: LockCause) {
        // passphrase and derived keys zeroize on drop
        if self.active.take().is_some() {
            info!("Session locked ({:?})", cause);
            self.last_cause = Some(cause);
        }
    }

    /// Record a user interaction now. See [`touch_at`](Self::touch_at).
    pub fn touch(&mut self) -> SessionState {
        self.touch_at(Instant::now())
    }

    /// Record a user interaction at `now`, restarting the countdown.
    ///
    /// An interaction that arrives after the window has already elapsed does not
    /// revive the session: it is locked with `AutoLocked` first.
    pub fn touch_at(&mut self, now: Instant) -> SessionState {
        let state = self.poll_at(now);
        if let Some(active) = self.active.as_mut() {
            active.last_activity = now;
        }
        state
    }

    /// Check the inactivity timer now. See [`poll_at`](Self::poll_at).
    pub fn poll(&mut self) -> SessionState {
        self.poll_at(Instant::now())
    }

    /// Check the inactivity timer at `now`, auto-locking if the window elapsed.
    pub fn poll_at(&mut self, now: Instant) -> SessionState {
        if self.expired_at(now) {
            self.lock_with(LockCause::AutoLocked);
        }
        self.state()
    }

    /// Current state without consulting the timer.
    pub fn state(&self) -> SessionState {
        match self.active {
            Some(_) => SessionState::Authenticated,
            None => SessionState::LoggedOut {
                cause: self.last_cause,
            },
        }
    }

    /// Returns `true` if no passphrase is held or the window has elapsed.
    pub fn is_locked(&self) -> bool {
        self.active.is_none() || self.expired_at(Instant::now())
    }

    fn expired_at(&self, now: Instant) -> bool {
        match (self.active.as_ref(), self.window) {
            (Some(active), Some(window)) => {
                now.saturating_duration_since(active.last_activity) >= window
            }
            _ => false,
        }
    }

    /// Change the inactivity window in minutes (0 disables auto-lock).
    ///
    /// Takes effect immediately: a live session restarts its countdown.
    pub fn set_auto_lock_minutes(&mut self, minutes: u64) {
        self.set_window(minutes_to_window(minutes));
    }

    /// Change the inactivity window (`None` disables auto-lock).
    pub fn set_window(&mut self, window: Option<Duration>) {
        debug!("Auto-lock window set to {:?}", window);
        self.window = window;
        if let Some(active) = self.active.as_mut() {
            active.last_activity = Instant::now();
        }
    }

    /// The configured inactivity window.
    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    /// Time since the last interaction, if authenticated.
    pub fn idle_for(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .map(|active| Instant::now().saturating_duration_since(active.last_activity))
    }

    /// Time left before auto-lock, if authenticated and auto-lock is enabled.
    pub fn remaining(&self) -> Option<Duration> {
        let idle = self.idle_for()?;
        self.window.map(|window| window.saturating_sub(idle))
    }

    /// The authenticated identity, if any.
    pub fn user(&self) -> Option<&User> {
        self.active.as_ref().map(|active| &active.user)
    }

    /// Get the session key for a vault operation.
    ///
    /// Checks the inactivity timer first. This is not an interaction and does
    /// not restart the countdown.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::AutoLocked` if the session was closed by the timer,
    /// otherwise `CryptoError::VaultLocked` when no passphrase is held.
    pub fn key(&mut self) -> AppResult<SessionKey<'_>> {
        self.poll();
        let cause = self.last_cause;
        match self.active.as_ref() {
            Some(active) => Ok(SessionKey {
                user_id: active.user.id,
                keys: &active.keys,
            }),
            None if cause == Some(LockCause::AutoLocked) => Err(CryptoError::AutoLocked.into()),
            None => Err(CryptoError::VaultLocked.into()),
        }
    }

    /// The held passphrase, for persisting a session snapshot.
    pub(crate) fn passphrase(&self) -> Option<&SecretString> {
        self.active.as_ref().map(|active| active.keys.passphrase())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.logout();
    }
}

fn minutes_to_window(minutes: u64) -> Option<Duration> {
    if minutes == 0 {
        None
    } else {
        Some(Duration::from_secs(minutes * 60))
    }
}

/// Prompts the user for a new master password with confirmation.
///
/// Used when registering an account.
///
/// # Errors
///
/// Returns `CryptoError::PassphraseMismatch` if confirmations don't match, or
/// `CryptoError::EmptyPassphrase` for an empty entry.
///
/// # Testing
///
/// For non-interactive testing, set `WRECKVAULT_TEST_PASSPHRASE`.
pub fn prompt_new_passphrase() -> AppResult<SecretString> {
    if let Ok(test_passphrase) = std::env::var(ENV_VAR_TEST_PASSPHRASE) {
        debug!("Using {} for non-interactive testing", ENV_VAR_TEST_PASSPHRASE);
        return non_empty(SecretString::new(test_passphrase));
    }

    debug!("Prompting for new master password");

    let passphrase = rpassword::prompt_password("Choose a master password: ")
        .map_err(|e| CryptoError::PassphrasePrompt(e.to_string()))?;

    let confirmation = rpassword::prompt_password("Confirm master password: ")
        .map_err(|e| CryptoError::PassphrasePrompt(e.to_string()))?;

    if passphrase != confirmation {
        return Err(CryptoError::PassphraseMismatch.into());
    }

    non_empty(SecretString::new(passphrase))
}

/// Prompts the user for an existing master password.
///
/// # Errors
///
/// Returns an error if stdin reading fails or the entry is empty.
pub fn prompt_passphrase(prompt: &str) -> AppResult<SecretString> {
    if let Ok(test_passphrase) = std::env::var(ENV_VAR_TEST_PASSPHRASE) {
        debug!("Using {} for non-interactive testing", ENV_VAR_TEST_PASSPHRASE);
        return non_empty(SecretString::new(test_passphrase));
    }

    let passphrase = rpassword::prompt_password(prompt)
        .map_err(|e| CryptoError::PassphrasePrompt(e.to_string()))?;

    non_empty(SecretString::new(passphrase))
}

fn non_empty(passphrase: SecretString) -> AppResult<SecretString> {
    if passphrase.expose_secret().is_empty() {
        return Err(CryptoError::EmptyPassphrase.into());
    }
    Ok(passphrase)
}
