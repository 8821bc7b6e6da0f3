/*!
# Wreckvault

Wreckvault is a password manager client with client-side envelope encryption.
Secrets are encrypted with the master password before they leave the process;
the vault server only ever stores ciphertext plus non-secret metadata.

## Core Features

- Encrypt and decrypt individual secrets with a passphrase
- Hold the master password for one session, with inactivity auto-lock
- Keep a decrypted local cache in sync with the remote encrypted store
- Export the vault to plaintext JSON and import entries back

## Architecture

The codebase follows a modular architecture with clear separation of concerns:

- `crypto`: Passphrase encryption, the session key holder and session snapshots
- `vault`: Entry types and the client-side entry store
- `remote`: The remote encrypted store (HTTP client and in-memory store)
- `ops`: Import/export and command dispatch
- `cli`: Command-line interface handling using clap
- `config`: Configuration loading and validation
- `settings`: Durable user preferences
- `errors`: Error handling infrastructure

## Usage Example

```rust,no_run
use wreckvault::crypto::SessionManager;
use wreckvault::remote::HttpRemote;
use wreckvault::vault::{NewCredential, VaultStore};
use wreckvault::Config;
use secrecy::SecretString;

fn main() -> wreckvault::AppResult<()> {
    let config = Config::load()?;
    let remote = HttpRemote::new(&config.server_url);

    let mut session = SessionManager::new(15);
    session.login(&remote, "alice", SecretString::new("correcthorse".to_string()))?;

    let mut vault = VaultStore::new(&remote);
    vault.add(&mut session, NewCredential::new("Mail", "p@ss"))?;
    vault.fetch_all(&mut session)?;
    Ok(())
}
```
*/

/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application-wide constants
pub mod constants;
/// Cryptographic operations and session management
pub mod crypto;
/// Error types and utilities for error handling
pub mod errors;
/// High-level operations
pub mod ops;
/// Remote encrypted store
pub mod remote;
/// Owner-only file and directory helpers
pub mod secure_fs;
/// Durable user preferences
pub mod settings;
/// Vault entries and the entry store
pub mod vault;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use settings::Settings;
