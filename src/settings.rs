//! Durable user preferences.
//!
//! Only non-secret choices live here. The auto-lock window is a standing
//! preference: it survives logout and applies to the next session.

use crate::constants::{AUTO_LOCK_CHOICES, DEFAULT_AUTO_LOCK_MINUTES, SETTINGS_FILE_NAME};
use crate::errors::{AppError, AppResult};
use crate::secure_fs::{ensure_private_dir, restrict_file};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Preferences stored in `settings.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Inactivity window in minutes; 0 disables auto-lock.
    #[serde(default = "default_auto_lock")]
    pub auto_lock_minutes: u64,
}

fn default_auto_lock() -> u64 {
    DEFAULT_AUTO_LOCK_MINUTES
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_lock_minutes: DEFAULT_AUTO_LOCK_MINUTES,
        }
    }
}

impl Settings {
    /// Path of the settings file inside `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE_NAME)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Serialization` for a corrupt file and
    /// `AppError::Config` for an auto-lock value outside the offered choices.
    pub fn load(data_dir: &Path) -> AppResult<Self> {
        let path = Self::path(data_dir);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let settings: Settings = serde_json::from_str(&contents)?;
        validate_auto_lock(settings.auto_lock_minutes)?;
        Ok(settings)
    }

    /// Write settings to `data_dir`, creating it if needed.
    pub fn save(&self, data_dir: &Path) -> AppResult<()> {
        validate_auto_lock(self.auto_lock_minutes)?;
        ensure_private_dir(data_dir)?;

        let mut file = File::create(Self::path(data_dir))?;
        restrict_file(&file)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        debug!("Saved settings: {:?}", self);
        Ok(())
    }
}

/// Accept only the auto-lock choices offered to the user.
///
/// # Errors
///
/// Returns `AppError::Config` listing the valid choices.
pub fn validate_auto_lock(minutes: u64) -> AppResult<()> {
    if AUTO_LOCK_CHOICES.contains(&minutes) {
        return Ok(());
    }
    let choices: Vec<String> = AUTO_LOCK_CHOICES.iter().map(u64::to_string).collect();
    Err(AppError::Config(format!(
        "Auto-lock must be one of {} minutes (0 = never), got {}",
        choices.join(", "),
        minutes
    )))
}
