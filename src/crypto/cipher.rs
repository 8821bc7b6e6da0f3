//! Passphrase encryption for vault secrets.
//!
//! Each secret is sealed with XChaCha20-Poly1305 under a 256-bit key derived
//! from the passphrase with Argon2id. The result is a single ASCII string that
//! carries everything except the passphrase:
//!
//! ```text
//! wv1$<base64 salt>$<base64 nonce || ciphertext || tag>
//! ```
//!
//! Key derivation dominates the cost of a seal or open, so a [`KeyRing`]
//! derives the key for each salt once and keeps it for its lifetime. All blobs
//! sealed by one ring share that ring's salt; every blob gets a fresh nonce.

use crate::constants::{
    ARGON2_ITERATIONS, ARGON2_MEMORY_KIB, ARGON2_PARALLELISM, CIPHER_PREFIX, KEY_LEN, NONCE_LEN,
    SALT_LEN,
};
use crate::errors::{AppResult, CryptoError};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

type Salt = [u8; SALT_LEN];
type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// A passphrase together with the keys derived from it.
///
/// # Example
///
/// ```no_run
/// use wreckvault::crypto::KeyRing;
/// use secrecy::SecretString;
///
/// let ring = KeyRing::new(SecretString::new("correcthorse".to_string()));
/// let first = ring.encrypt("hunter2")?;
/// let second = ring.encrypt("swordfish")?;
/// assert_eq!(ring.decrypt(&first)?, "hunter2");
/// assert_eq!(ring.decrypt(&second)?, "swordfish");
/// assert_eq!(ring.derivations(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct KeyRing {
    passphrase: SecretString,
    seal_salt: Salt,
    keys: Mutex<HashMap<Salt, DerivedKey>>,
}

impl KeyRing {
    /// Wrap `passphrase`, choosing a fresh salt for everything this ring seals.
    pub fn new(passphrase: SecretString) -> Self {
        Self {
            passphrase,
            seal_salt: *Uuid::new_v4().as_bytes(),
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped passphrase.
    pub fn passphrase(&self) -> &SecretString {
        &self.passphrase
    }

    /// Number of keys derived so far, one per distinct salt seen.
    pub fn derivations(&self) -> usize {
        self.keys().len()
    }

    /// Encrypt a secret string.
    ///
    /// Two calls with identical input produce different ciphertexts, both of
    /// which decrypt to the same plaintext.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EmptyInput` when the plaintext or the passphrase is empty.
    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        if plaintext.is_empty() || self.passphrase.expose_secret().is_empty() {
            return Err(CryptoError::EmptyInput("encrypt").into());
        }

        let cipher = self.cipher_for(&self.seal_salt)?;
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed("AEAD seal failed".to_string()))?;

        let mut body = Vec::with_capacity(NONCE_LEN + sealed.len());
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&sealed);

        Ok(format!(
            "{}{}${}",
            CIPHER_PREFIX,
            STANDARD.encode(self.seal_salt),
            STANDARD.encode(body)
        ))
    }

    /// Decrypt a ciphertext produced by [`encrypt`](Self::encrypt) under the same passphrase.
    ///
    /// # Errors
    ///
    /// - `CryptoError::EmptyInput` if the ciphertext or the passphrase is empty
    /// - `CryptoError::UnsupportedFormat` if the ciphertext is not a `wv1` blob
    /// - `CryptoError::MalformedCiphertext` if the blob cannot be parsed, or the
    ///   plaintext is empty or not UTF-8
    /// - `CryptoError::DecryptionFailed` for a wrong passphrase or a tampered blob
    pub fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        if ciphertext.is_empty() || self.passphrase.expose_secret().is_empty() {
            return Err(CryptoError::EmptyInput("decrypt").into());
        }

        let (salt, body) = parse_blob(ciphertext)?;
        if body.len() <= NONCE_LEN {
            return Err(CryptoError::MalformedCiphertext("blob too short".to_string()).into());
        }
        let (nonce, sealed) = body.split_at(NONCE_LEN);

        let cipher = self.cipher_for(&salt)?;
        let decrypted = Zeroizing::new(
            cipher
                .decrypt(XNonce::from_slice(nonce), sealed)
                .map_err(|_| CryptoError::DecryptionFailed)?,
        );

        // encrypt never produces an empty payload
        if decrypted.is_empty() {
            return Err(CryptoError::MalformedCiphertext("empty plaintext".to_string()).into());
        }

        let text = std::str::from_utf8(&decrypted).map_err(|e| {
            CryptoError::MalformedCiphertext(format!("plaintext is not UTF-8: {}", e))
        })?;
        Ok(text.to_string())
    }

    fn cipher_for(&self, salt: &Salt) -> AppResult<XChaCha20Poly1305> {
        let mut keys = self.keys();
        if let Some(key) = keys.get(salt) {
            return cipher_from(key);
        }

        let key = derive_key(&self.passphrase, salt)?;
        let cipher = cipher_from(&key)?;
        keys.insert(*salt, key);
        Ok(cipher)
    }

    fn keys(&self) -> MutexGuard<'_, HashMap<Salt, DerivedKey>> {
        // the map holds no invariant a panicking holder could break
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("passphrase", &"[REDACTED]")
            .field("derivations", &self.derivations())
            .finish()
    }
}

fn derive_key(passphrase: &SecretString, salt: &Salt) -> AppResult<DerivedKey> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2id parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    debug!("Derived passphrase key for a new salt");
    Ok(key)
}

fn cipher_from(key: &DerivedKey) -> AppResult<XChaCha20Poly1305> {
    XChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()).into())
}

fn parse_blob(ciphertext: &str) -> AppResult<(Salt, Vec<u8>)> {
    let rest = ciphertext
        .trim()
        .strip_prefix(CIPHER_PREFIX)
        .ok_or(CryptoError::UnsupportedFormat)?;
    let (salt, body) = rest
        .split_once('$')
        .ok_or_else(|| CryptoError::MalformedCiphertext("missing salt separator".to_string()))?;

    let salt: Salt = STANDARD
        .decode(salt)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| CryptoError::MalformedCiphertext("invalid salt".to_string()))?;
    let body = STANDARD
        .decode(body)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("invalid body: {}", e)))?;

    Ok((salt, body))
}

/// Encrypt a secret string with a passphrase.
///
/// One-shot form of [`KeyRing::encrypt`]: it pays a full key derivation on
/// every call. Sessions use the ring held by the session manager instead.
///
/// # Errors
///
/// Returns `CryptoError::EmptyInput` when either argument is empty.
///
/// # Example
///
/// ```no_run
/// use wreckvault::crypto::encrypt_with_passphrase;
/// use secrecy::SecretString;
///
/// let passphrase = SecretString::new("my-secret-passphrase".to_string());
/// let encrypted = encrypt_with_passphrase("hunter2", &passphrase)?;
/// assert!(encrypted.starts_with("wv1$"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encrypt_with_passphrase(plaintext: &str, passphrase: &SecretString) -> AppResult<String> {
    KeyRing::new(SecretString::new(passphrase.expose_secret().clone())).encrypt(plaintext)
}

/// Decrypt a ciphertext with a passphrase.
///
/// One-shot form of [`KeyRing::decrypt`], with the same errors.
///
/// # Example
///
/// ```no_run
/// use wreckvault::crypto::{encrypt_with_passphrase, decrypt_with_passphrase};
/// use secrecy::SecretString;
///
/// let passphrase = SecretString::new("my-secret-passphrase".to_string());
/// let encrypted = encrypt_with_passphrase("hunter2", &passphrase)?;
/// let decrypted = decrypt_with_passphrase(&encrypted, &passphrase)?;
/// assert_eq!(decrypted, "hunter2");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decrypt_with_passphrase(ciphertext: &str, passphrase: &SecretString) -> AppResult<String> {
    KeyRing::new(SecretString::new(passphrase.expose_secret().clone())).decrypt(ciphertext)
}
