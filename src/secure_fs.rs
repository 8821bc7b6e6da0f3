//! Owner-only directories and files for settings, session snapshots and exports.

use crate::errors::{AppError, AppResult};
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

#[cfg(unix)]
use crate::constants::{DEFAULT_DIR_PERMISSIONS, DEFAULT_FILE_PERMISSIONS};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Creates `dir` (and parents) if missing and restricts it to the owner.
///
/// # Errors
///
/// Returns `AppError::Config` for a relative path and `AppError::Io` when the
/// directory cannot be created.
pub fn ensure_private_dir(dir: &Path) -> AppResult<()> {
    if !dir.is_absolute() {
        return Err(AppError::Config(format!(
            "Directory path must be absolute: {}",
            dir.display()
        )));
    }

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory {}: {}", dir.display(), e),
            ))
        })?;

        #[cfg(unix)]
        {
            fs::set_permissions(dir, fs::Permissions::from_mode(DEFAULT_DIR_PERMISSIONS))?;
            debug!("Set {:o} permissions on {}", DEFAULT_DIR_PERMISSIONS, dir.display());
        }
    }
    Ok(())
}

/// Restricts an open file to owner read/write.
pub fn restrict_file(file: &File) -> AppResult<()> {
    #[cfg(unix)]
    {
        let mut permissions = file.metadata()?.permissions();
        permissions.set_mode(DEFAULT_FILE_PERMISSIONS);
        file.set_permissions(permissions).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to set secure permissions: {}", e),
            ))
        })?;
    }
    #[cfg(not(unix))]
    let _ = file;
    Ok(())
}
