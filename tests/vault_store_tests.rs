//! Integration tests for the vault store against the in-memory remote.
//!
//! Covers the cache-follows-remote rule and per-entry decryption failures.

use secrecy::SecretString;
use std::time::{Duration, Instant};
use wreckvault::crypto::SessionManager;
use wreckvault::errors::{AppError, CryptoError, RemoteError};
use wreckvault::remote::MemoryRemote;
use wreckvault::vault::{Credential, NewCredential, SecretValue, VaultStore};

fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

fn alice_session(remote: &MemoryRemote) -> SessionManager {
    let mut session = SessionManager::new(15);
    session
        .register(remote, "alice", secret("correcthorse"))
        .expect("register alice");
    session
}

fn snapshot(vault: &VaultStore<&MemoryRemote>) -> Vec<Credential> {
    vault.entries().to_vec()
}

#[test]
fn test_add_then_fetch_decrypts() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    vault
        .add(
            &mut session,
            NewCredential::new("Mail", "p@ss")
                .with_account_username("alice@example.com")
                .with_website_url("https://mail.example.com"),
        )
        .expect("add");

    vault.clear();
    let report = vault.fetch_all(&mut session).expect("fetch");
    assert_eq!(report.total, 1);
    assert_eq!(report.failed, 0);

    let entry = &vault.entries()[0];
    assert_eq!(entry.service_name, "Mail");
    assert_eq!(entry.account_username, "alice@example.com");
    assert_eq!(entry.website_url.as_deref(), Some("https://mail.example.com"));
    assert_eq!(entry.secret.expose(), Some("p@ss"));
}

#[test]
fn test_fetch_after_fresh_unlock_is_bounded() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    for i in 0..50 {
        vault
            .add(&mut session, NewCredential::new(format!("Service {}", i), "p@ss"))
            .expect("add");
    }

    // A restored session starts with no derived keys.
    let user = session.user().cloned().expect("user");
    session.unlock(user, secret("correcthorse"));
    vault.clear();

    let started = Instant::now();
    let report = vault.fetch_all(&mut session).expect("fetch");
    let elapsed = started.elapsed();

    assert_eq!(report.total, 50);
    assert_eq!(report.failed, 0);
    assert_eq!(session.key().expect("key").keys.derivations(), 1);
    assert!(
        elapsed < Duration::from_secs(10),
        "fetching 50 entries took {:?}",
        elapsed
    );
}

#[test]
fn test_wrong_session_passphrase_marks_entries_undecryptable() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    vault
        .add(&mut session, NewCredential::new("Mail", "p@ss"))
        .expect("add");

    // Same identity, different key: the server cannot tell.
    let user = session.user().cloned().expect("user");
    session.unlock(user, secret("wrongpass"));

    let report = vault.fetch_all(&mut session).expect("fetch still succeeds");
    assert_eq!(report.total, 1);
    assert_eq!(report.failed, 1);

    let entry = &vault.entries()[0];
    assert_eq!(entry.service_name, "Mail");
    assert_eq!(entry.secret, SecretValue::DecryptionFailed);
    assert_ne!(entry.secret.expose(), Some(""));
    assert_eq!(entry.secret.display(), "*** DECRYPTION ERROR ***");
}

#[test]
fn test_one_corrupt_record_does_not_hide_others() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    let mut ids = Vec::new();
    for (service, value) in [("A", "one"), ("B", "two"), ("C", "three")] {
        ids.push(
            vault
                .add(&mut session, NewCredential::new(service, value))
                .expect("add")
                .id,
        );
    }
    assert!(remote.tamper_blob(ids[1], "U2FsdGVkX1+legacyblob"));

    let report = vault.fetch_all(&mut session).expect("fetch");
    assert_eq!(report.total, 3);
    assert_eq!(report.failed, 1);
    assert!(vault.get(ids[1]).expect("B").secret.is_failed());
    assert_eq!(vault.get(ids[0]).and_then(|e| e.secret.expose()), Some("one"));
    assert_eq!(vault.get(ids[2]).and_then(|e| e.secret.expose()), Some("three"));
}

#[test]
fn test_fetch_orders_newest_first() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    for service in ["first", "second", "third"] {
        vault
            .add(&mut session, NewCredential::new(service, "x"))
            .expect("add");
    }
    let before: Vec<String> = vault.entries().iter().map(|e| e.service_name.clone()).collect();

    vault.fetch_all(&mut session).expect("fetch");
    let after: Vec<String> = vault.entries().iter().map(|e| e.service_name.clone()).collect();

    assert_eq!(after, vec!["third", "second", "first"]);
    assert_eq!(before, after);
}

#[test]
fn test_failed_remote_calls_leave_cache_untouched() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    let id = vault
        .add(&mut session, NewCredential::new("Mail", "p@ss"))
        .expect("add")
        .id;
    let before = snapshot(&vault);

    remote.set_offline(true);

    let err = vault
        .add(&mut session, NewCredential::new("Bank", "1234"))
        .expect_err("offline add");
    assert!(err.is_retryable());
    assert_eq!(snapshot(&vault), before);

    vault
        .update(&mut session, id, NewCredential::new("Mail2", "new"))
        .expect_err("offline update");
    assert_eq!(snapshot(&vault), before);

    vault.delete(&mut session, id).expect_err("offline delete");
    assert_eq!(snapshot(&vault), before);

    vault.fetch_all(&mut session).expect_err("offline fetch");
    assert_eq!(snapshot(&vault), before);

    remote.set_offline(false);
    vault.delete(&mut session, id).expect("delete");
    assert!(vault.entries().is_empty());
}

#[test]
fn test_update_unknown_id_is_not_found() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    vault
        .add(&mut session, NewCredential::new("Mail", "p@ss"))
        .expect("add");
    let before = snapshot(&vault);

    let err = vault
        .update(&mut session, 9999, NewCredential::new("Ghost", "boo"))
        .expect_err("missing id");
    assert!(matches!(err, AppError::Remote(RemoteError::NotFound(9999))));
    assert_eq!(snapshot(&vault), before);
}

#[test]
fn test_entries_are_scoped_to_owner() {
    let remote = MemoryRemote::new();
    let mut alice = alice_session(&remote);
    let mut alice_vault = VaultStore::new(&remote);
    let alice_entry = alice_vault
        .add(&mut alice, NewCredential::new("Mail", "p@ss"))
        .expect("add")
        .id;

    let mut bob = SessionManager::new(15);
    bob.register(&remote, "bob", secret("hunter2")).expect("bob");
    let mut bob_vault = VaultStore::new(&remote);

    assert_eq!(bob_vault.fetch_all(&mut bob).expect("fetch").total, 0);
    assert!(matches!(
        bob_vault.update(&mut bob, alice_entry, NewCredential::new("Stolen", "x")),
        Err(AppError::Remote(RemoteError::NotFound(_)))
    ));

    // Deleting someone else's id is a no-op for them.
    bob_vault.delete(&mut bob, alice_entry).expect("delete");
    assert_eq!(alice_vault.fetch_all(&mut alice).expect("fetch").total, 1);
}

#[test]
fn test_update_of_unfetched_entry_is_prepended() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut writer = VaultStore::new(&remote);
    let id = writer
        .add(&mut session, NewCredential::new("Mail", "p@ss"))
        .expect("add")
        .id;

    let mut reader = VaultStore::new(&remote);
    let updated = reader
        .update(&mut session, id, NewCredential::new("Mail", "rotated"))
        .expect("update");
    assert_eq!(updated.id, id);
    assert_eq!(reader.entries().len(), 1);
    assert_eq!(reader.entries()[0].secret.expose(), Some("rotated"));
}

#[test]
fn test_logout_blocks_operations_and_clears_cache() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);
    vault
        .add(&mut session, NewCredential::new("Mail", "p@ss"))
        .expect("add");

    session.logout();

    let err = vault
        .add(&mut session, NewCredential::new("Bank", "1234"))
        .expect_err("locked");
    assert!(matches!(err, AppError::Crypto(CryptoError::VaultLocked)));
    assert!(err.is_locked());
    assert!(vault.entries().is_empty());

    let user_id = 1;
    assert_eq!(remote.record_count(user_id), 1);
}

#[test]
fn test_blank_fields_are_validated() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    for entry in [
        NewCredential::new("   ", "secret"),
        NewCredential::new("Mail", ""),
    ] {
        let err = vault.add(&mut session, entry).expect_err("invalid");
        assert!(matches!(err, AppError::Validation(_)));
    }
    assert!(vault.entries().is_empty());
}

#[test]
fn test_service_name_is_trimmed_and_blank_website_dropped() {
    let remote = MemoryRemote::new();
    let mut session = alice_session(&remote);
    let mut vault = VaultStore::new(&remote);

    vault
        .add(
            &mut session,
            NewCredential::new("  Mail  ", "p@ss").with_website_url(""),
        )
        .expect("add");
    vault.fetch_all(&mut session).expect("fetch");

    assert_eq!(vault.entries()[0].service_name, "Mail");
    assert_eq!(vault.entries()[0].website_url, None);
}
