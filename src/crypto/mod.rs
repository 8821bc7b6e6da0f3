//! Cryptographic operations and session key handling for the vault.
//!
//! This module provides passphrase encryption of individual secrets, the
//! in-memory session that holds the master password, and optional restoration
//! of that session from volatile storage.
//!
//! # Module Structure
//!
//! - `cipher`: Argon2id key derivation and XChaCha20-Poly1305 sealing of secrets
//! - `session`: Session key management with inactivity auto-lock
//! - `persist`: Session snapshots in a runtime or tmpfs directory
//!
//! # Example
//!
//! ```
//! use wreckvault::crypto::{decrypt_with_passphrase, encrypt_with_passphrase};
//! use secrecy::SecretString;
//!
//! let passphrase = SecretString::new("correcthorse".to_string());
//! let encrypted = encrypt_with_passphrase("p@ss", &passphrase)?;
//! let decrypted = decrypt_with_passphrase(&encrypted, &passphrase)?;
//! assert_eq!(decrypted, "p@ss");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cipher;
pub mod persist;
pub mod session;

// Re-export commonly used types
pub use self::cipher::{decrypt_with_passphrase, encrypt_with_passphrase, KeyRing};
pub use self::persist::{volatile_session_dir, SessionStore};
pub use self::session::{
    prompt_new_passphrase, prompt_passphrase, LockCause, SessionKey, SessionManager, SessionState,
};
