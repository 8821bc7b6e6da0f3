//! Integration tests for plaintext export and bulk import.

use secrecy::SecretString;
use serde_json::json;
use std::fs;
use tempfile::tempdir;
use wreckvault::crypto::SessionManager;
use wreckvault::errors::{AppError, CryptoError, ImportError};
use wreckvault::ops::{export_all, import_all, import_file, write_export};
use wreckvault::remote::MemoryRemote;
use wreckvault::vault::{NewCredential, VaultStore};

fn alice_session(remote: &MemoryRemote) -> SessionManager {
    let mut session = SessionManager::new(15);
    session
        .register(
            remote,
            "alice",
            SecretString::new("correcthorse".to_string()),
        )
        .expect("register alice");
    session
}

#[test]
fn test_import_skips_incomplete_elements() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    let input = json!([
        { "service_name": "X", "secret": "y" },
        { "secret": "nope" }
    ]);
    let report = import_all(&mut vault, &mut session, &input).expect("import");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(vault.entries().len(), 1);
    assert_eq!(vault.entries()[0].service_name, "X");
    assert_eq!(vault.entries()[0].secret.expose(), Some("y"));
}

#[test]
fn test_import_accepts_full_records() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    let input = json!([
        {
            "service_name": "GitHub",
            "account_username": "octocat",
            "password": "ghp_secret",
            "website_url": "https://github.com",
            "exported_at": "2024-01-15T10:00:00Z"
        },
        "not an object",
        42,
        { "service_name": "", "password": "x" }
    ]);
    let report = import_all(&mut vault, &mut session, &input).expect("import");

    assert_eq!(report.attempted, 4);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 3);

    vault.fetch_all(&mut session).expect("fetch");
    let entry = &vault.entries()[0];
    assert_eq!(entry.account_username, "octocat");
    assert_eq!(entry.website_url.as_deref(), Some("https://github.com"));
    assert_eq!(entry.secret.expose(), Some("ghp_secret"));
}

#[test]
fn test_import_element_with_password_and_secret_keys() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    let input = json!([
        { "service_name": "Mail", "password": "kept", "secret": "ignored" }
    ]);
    let report = import_all(&mut vault, &mut session, &input).expect("import");

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 0);
    vault.fetch_all(&mut session).expect("fetch");
    assert_eq!(vault.entries()[0].secret.expose(), Some("kept"));
}

#[test]
fn test_import_rejects_non_array_root() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    let input = json!({ "service_name": "X", "password": "y" });
    let err = import_all(&mut vault, &mut session, &input).expect_err("object root");

    assert!(matches!(err, AppError::Import(ImportError::Malformed(_))));
    assert_eq!(remote.record_count(1), 0);
}

#[test]
fn test_import_counts_remote_failures() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    remote.set_offline(true);

    let input = json!([{ "service_name": "X", "password": "y" }]);
    let report = import_all(&mut vault, &mut session, &input).expect("import");

    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_import_requires_unlocked_session() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    session.logout();

    let input = json!([{ "service_name": "X", "password": "y" }]);
    let err = import_all(&mut vault, &mut session, &input).expect_err("locked");
    assert!(matches!(err, AppError::Crypto(CryptoError::VaultLocked)));
}

#[test]
fn test_export_writes_private_file_and_reimports() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("export.json");

    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    vault
        .add(
            &mut session,
            NewCredential::new("Mail", "p@ss").with_account_username("alice"),
        )
        .expect("add");
    vault
        .add(&mut session, NewCredential::new("Bank", "1234"))
        .expect("add");
    let broken = vault
        .add(&mut session, NewCredential::new("Old", "legacy"))
        .expect("add")
        .id;
    remote.tamper_blob(broken, "U2FsdGVkX1+legacyblob");
    vault.fetch_all(&mut session).expect("fetch");

    let bundle = export_all(vault.entries());
    assert_eq!(bundle.records.len(), 2);
    assert_eq!(bundle.skipped, 1);

    let report = write_export(&bundle, &path).expect("write");
    assert_eq!(report.count, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.checksum.len(), 64);

    let contents = fs::read_to_string(&path).expect("read export");
    assert_eq!(
        report.checksum,
        blake3::hash(contents.as_bytes()).to_hex().to_string()
    );
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("json");
    let records = parsed.as_array().expect("array");
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r["password"] == "p@ss"));
    assert!(!contents.contains("DECRYPTION ERROR"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    // A second account can take the file back in.
    let mut bob = SessionManager::new(15);
    bob.register(&remote, "bob", SecretString::new("hunter2".to_string()))
        .expect("bob");
    let mut bob_vault = VaultStore::new(&remote);
    let imported = import_file(&mut bob_vault, &mut bob, &path).expect("import");
    assert_eq!(imported.attempted, 2);
    assert_eq!(imported.succeeded, 2);

    bob_vault.fetch_all(&mut bob).expect("fetch");
    assert!(bob_vault
        .entries()
        .iter()
        .any(|e| e.service_name == "Mail" && e.secret.expose() == Some("p@ss")));
}

#[test]
fn test_import_file_rejects_invalid_json() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "[{ not json").expect("write");

    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    let err = import_file(&mut vault, &mut session, &path).expect_err("invalid");
    assert!(matches!(err, AppError::Import(ImportError::Malformed(_))));
}
