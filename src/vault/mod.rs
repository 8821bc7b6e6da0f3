//! Vault entries and the client-side entry store.
//!
//! Plaintext secrets exist only in [`Credential`]s held by a [`VaultStore`];
//! everything sent to the remote store is an [`EncryptedRecord`].

pub mod model;
pub mod store;

pub use model::{Credential, EncryptedRecord, NewCredential, RecordPayload, SecretValue};
pub use store::{FetchReport, VaultStore};
