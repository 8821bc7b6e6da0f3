//! Constants used throughout the application.
//!
//! This module contains all constants used in the wreckvault application, organized
//! into logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "wreckvault";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "Password manager with client-side envelope encryption";

// CLI Arguments & Defaults
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level for this crate when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Log level used with `--verbose`.
pub const VERBOSE_LOG_LEVEL: &str = "debug";

// Configuration Keys & Environment Variables
/// Environment variable for the remote API base URL.
pub const ENV_VAR_SERVER: &str = "WRECKVAULT_SERVER";
/// Environment variable for the durable settings directory.
pub const ENV_VAR_DIR: &str = "WRECKVAULT_DIR";
/// Environment variable overriding the volatile session directory.
pub const ENV_VAR_SESSION_DIR: &str = "WRECKVAULT_SESSION_DIR";
/// Environment variable selecting the log format.
pub const ENV_VAR_LOG_FORMAT: &str = "WRECKVAULT_LOG_FORMAT";
/// Per-login-session runtime directory, cleared when the user logs out of the machine.
pub const ENV_VAR_XDG_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Non-interactive master password source used by tests.
pub const ENV_VAR_TEST_PASSPHRASE: &str = "WRECKVAULT_TEST_PASSPHRASE";
/// Default API base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000/api";
/// Default settings directory within the user's home directory.
pub const DEFAULT_CONFIG_SUBDIR: &str = ".config/wreckvault";

// Volatile storage
/// RAM-backed filesystems checked for session storage when no runtime dir exists.
pub const TMPFS_PATHS: &[&str] = &["/dev/shm", "/run/shm"];
/// File name of the persisted session snapshot.
pub const SESSION_FILE_NAME: &str = "session.json";
/// File name of the durable settings file.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// File System Parameters
/// Default POSIX permissions for newly created directories (owner read/write/execute).
#[cfg(unix)]
pub const DEFAULT_DIR_PERMISSIONS: u32 = 0o700;
/// Default POSIX permissions for newly created files (owner read/write).
#[cfg(unix)]
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o600;

// Encryption
/// Version tag opening every sealed secret.
pub const CIPHER_PREFIX: &str = "wv1$";
/// Length in bytes of the key-derivation salt.
pub const SALT_LEN: usize = 16;
/// Length in bytes of the XChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 24;
/// Length in bytes of the derived encryption key.
pub const KEY_LEN: usize = 32;
/// Argon2id memory cost in KiB.
pub const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
/// Argon2id pass count.
pub const ARGON2_ITERATIONS: u32 = 2;
/// Argon2id lane count.
pub const ARGON2_PARALLELISM: u32 = 1;

// Vault
/// Secret shown in place of an entry that failed to decrypt.
pub const DECRYPTION_ERROR_PLACEHOLDER: &str = "*** DECRYPTION ERROR ***";
/// Value sent in the legacy `iv` column; the real IV lives inside the ciphertext.
pub const EMBEDDED_IV_MARKER: &str = "embedded-in-blob";
/// Header carrying the caller identity on vault requests.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Auto-lock choices offered to the user, in minutes (0 disables auto-lock).
pub const AUTO_LOCK_CHOICES: &[u64] = &[0, 1, 5, 15, 60];
/// Auto-lock window used until the user picks one.
pub const DEFAULT_AUTO_LOCK_MINUTES: u64 = 15;
/// Prefix of generated export file names.
pub const EXPORT_FILE_PREFIX: &str = "wreckvault-export-";
/// Date format used in export file names.
pub const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d";

// Logging Configuration
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "wreckvault";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
