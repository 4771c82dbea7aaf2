//! Integration tests for the category store.

use std::path::Path;
use std::sync::Arc;

use linkvault_auth::PasswordCache;
use linkvault_core::config::store::StoreConfig;
use linkvault_core::errlog::ErrorLog;
use linkvault_core::error::ErrorKind;
use linkvault_entity::{CategoryItem, LinkItem, PasswordProtection};
use linkvault_storage::{CategoryStore, RootEntry};

async fn store_at(dir: &Path, passwords: PasswordCache) -> CategoryStore {
    let config = StoreConfig {
        data_dir: dir.to_string_lossy().to_string(),
        ..StoreConfig::default()
    };
    CategoryStore::new(&config, passwords, Arc::new(ErrorLog::in_memory()))
        .await
        .expect("store")
}

fn sample(name: &str) -> CategoryItem {
    CategoryItem::new(name)
        .with_link(LinkItem::new_url("Docs", "https://docs.rs"))
        .with_category(
            CategoryItem::new("Nested").with_link(LinkItem::new("Notes", "/home/me/notes.md")),
        )
}

#[tokio::test]
async fn test_load_isolates_malformed_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), PasswordCache::new()).await;

    store.save(&sample("Alpha")).await.unwrap();
    store.save(&sample("Beta")).await.unwrap();
    store.save(&sample("Gamma")).await.unwrap();
    std::fs::write(dir.path().join("Beta.json"), b"{ this is not json").unwrap();

    let report = store.load_all().await.unwrap();
    let names: Vec<&str> = report.roots.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["Alpha", "Gamma"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error.kind, ErrorKind::Serialization);
    assert!(report.failures[0].path.ends_with("Beta.json"));
    assert_eq!(store.error_log().len(), 1);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), PasswordCache::new()).await;
    store.save(&sample("Temp")).await.unwrap();

    store.delete("Temp").await.unwrap();
    assert!(store.artifacts("Temp").await.is_empty());
    store.delete("Temp").await.unwrap();
    assert!(store.artifacts("Temp").await.is_empty());
}

#[tokio::test]
async fn test_delete_removes_both_forms() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), PasswordCache::new()).await;
    std::fs::write(dir.path().join("Both.json"), b"{\"name\":\"Both\"}").unwrap();
    std::fs::write(dir.path().join("Both.enc"), b"{}").unwrap();

    store.delete("Both").await.unwrap();
    assert!(store.artifacts("Both").await.is_empty());
}

#[tokio::test]
async fn test_toggling_protection_leaves_single_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let passwords = PasswordCache::new();
    let store = store_at(dir.path(), passwords.clone()).await;
    passwords.cache_category_password("Secret", "pw").await.unwrap();

    let protected = sample("Secret").with_protection(PasswordProtection::OwnPassword);
    store.save(&protected).await.unwrap();
    let artifacts = store.artifacts("Secret").await;
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].ends_with("Secret.enc"));

    let plain = CategoryItem {
        password_protection: PasswordProtection::None,
        ..protected.clone()
    };
    store.save(&plain).await.unwrap();
    let artifacts = store.artifacts("Secret").await;
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].ends_with("Secret.json"));

    store.save(&protected).await.unwrap();
    let artifacts = store.artifacts("Secret").await;
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].ends_with("Secret.enc"));
}

#[tokio::test]
async fn test_encrypted_record_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let passwords = PasswordCache::new();
    let store = store_at(dir.path(), passwords.clone()).await;
    passwords.cache_global_password("global-pw").await.unwrap();

    let cat = sample("Finance").with_protection(PasswordProtection::GlobalPassword);
    store.save(&cat).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("Finance.enc")).unwrap();
    assert!(!raw.contains("docs.rs"));

    let report = store.load_all().await.unwrap();
    assert_eq!(report.roots.len(), 1);
    assert_eq!(report.roots[0].as_category().unwrap(), &cat);
}

#[tokio::test]
async fn test_missing_password_yields_locked_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let passwords = PasswordCache::new();
    let store = store_at(dir.path(), passwords.clone()).await;
    passwords.cache_category_password("Diary", "pw").await.unwrap();
    store
        .save(&sample("Diary").with_protection(PasswordProtection::OwnPassword))
        .await
        .unwrap();
    store.save(&sample("Open")).await.unwrap();

    passwords.clear().await;
    let report = store.load_all().await.unwrap();
    assert_eq!(report.roots.len(), 2);
    assert!(report.failures.is_empty());
    match report.find("Diary").unwrap() {
        RootEntry::Locked(locked) => {
            assert_eq!(locked.protection, PasswordProtection::OwnPassword);
        }
        other => panic!("expected locked placeholder, got {other:?}"),
    }
    assert!(!report.find("Open").unwrap().is_locked());

    let err = store.unlock("Diary").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Locked);

    passwords.cache_category_password("Diary", "pw").await.unwrap();
    let unlocked = store.unlock("Diary").await.unwrap();
    assert_eq!(unlocked.name, "Diary");
}

#[tokio::test]
async fn test_wrong_password_keeps_category_locked() {
    let dir = tempfile::tempdir().unwrap();
    let passwords = PasswordCache::new();
    let store = store_at(dir.path(), passwords.clone()).await;
    passwords.cache_category_password("Vault", "right").await.unwrap();
    store
        .save(&sample("Vault").with_protection(PasswordProtection::OwnPassword))
        .await
        .unwrap();

    passwords.cache_category_password("Vault", "not-it").await.unwrap();
    let report = store.load_all().await.unwrap();
    assert!(report.find("Vault").unwrap().is_locked());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].error.kind, ErrorKind::Cryptographic);

    let err = store.unlock("Vault").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cryptographic);
    assert!(!err.to_string().contains("not-it"));
}

#[tokio::test]
async fn test_concurrent_saves_to_same_category_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_at(dir.path(), PasswordCache::new()).await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut cat = sample("Shared");
            cat.description = format!("writer {i}");
            store.save(&cat).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let report = store.load_all().await.unwrap();
    assert_eq!(report.roots.len(), 1);
    assert!(report.failures.is_empty());
    assert!(report.roots[0]
        .as_category()
        .unwrap()
        .description
        .starts_with("writer "));
}

#[tokio::test]
async fn test_similar_names_keep_separate_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), PasswordCache::new()).await;

    let underscore = CategoryItem::new("Work_Home")
        .with_link(LinkItem::new_url("Intranet", "https://intranet.example"));
    store.save(&underscore).await.unwrap();
    store.save(&CategoryItem::new("Work/Home")).await.unwrap();

    let report = store.load_all().await.unwrap();
    let names: Vec<&str> = report.roots.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["Work/Home", "Work_Home"]);

    store.delete("Work/Home").await.unwrap();
    let report = store.load_all().await.unwrap();
    assert_eq!(report.roots.len(), 1);
    assert_eq!(report.roots[0].as_category().unwrap(), &underscore);
}

#[tokio::test]
async fn test_record_of_another_category_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), PasswordCache::new()).await;

    // What a case-folding filesystem hands back for `Work.json`.
    let foreign = serde_json::to_vec(&sample("work")).unwrap();
    std::fs::write(dir.path().join("Work.json"), &foreign).unwrap();

    let err = store.save(&sample("Work")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = store.delete("Work").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(std::fs::read(dir.path().join("Work.json")).unwrap(), foreign);
}

#[tokio::test]
async fn test_nested_protection_is_never_written_in_cleartext() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path(), PasswordCache::new()).await;

    let root = CategoryItem::new("Root").with_category(
        CategoryItem::new("Diary")
            .with_protection(PasswordProtection::OwnPassword)
            .with_link(LinkItem::new("secret-diary", "/home/me/diary.md")),
    );
    let err = store.save(&root).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(store.artifacts("Root").await.is_empty());
}
