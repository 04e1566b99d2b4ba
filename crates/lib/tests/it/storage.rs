//! Repository behavior shared by every backend.
//!
//! Each check runs against the in-memory backend and a private SQLite
//! database.

use std::sync::Arc;

use uuid::Uuid;
use vaultkeeper::{
    model::{Secret, User},
    storage::{InMemory, SecretRepository, StorageError, UserRepository},
};

use crate::helpers::TestStore;

fn unique_email(local: &str) -> String {
    format!("{local}+{}@x.com", Uuid::new_v4().simple())
}

async fn register(store: &TestStore, email: &str, password: &str) -> Uuid {
    store
        .users
        .create(User::new(email, password))
        .await
        .expect("Failed to create user")
        .id
}

async fn check_user_create_and_login(store: TestStore) {
    let email = unique_email("a");
    let id = register(&store, &email, "pw").await;

    let user = store
        .users
        .read_by_email_and_password(&email, "pw")
        .await
        .unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.email, email);
    assert!(user.password.is_empty());

    assert_eq!(store.users.read(&id).await.unwrap().email, email);
}

async fn check_duplicate_email_conflicts(store: TestStore) {
    let email = unique_email("dup");
    register(&store, &email, "pw").await;

    let err = store
        .users
        .create(User::new(email.clone(), "other"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // The original credentials still work.
    assert!(
        store
            .users
            .read_by_email_and_password(&email, "pw")
            .await
            .is_ok()
    );
}

async fn check_bad_credentials_indistinguishable(store: TestStore) {
    let email = unique_email("b");
    register(&store, &email, "right").await;

    let wrong_password = store
        .users
        .read_by_email_and_password(&email, "wrong")
        .await
        .unwrap_err();
    let unknown_email = store
        .users
        .read_by_email_and_password(&unique_email("nobody"), "right")
        .await
        .unwrap_err();

    assert!(wrong_password.is_not_found());
    assert!(unknown_email.is_not_found());
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

async fn check_read_unknown_user(store: TestStore) {
    assert!(
        store
            .users
            .read(&Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

async fn check_secret_lifecycle(store: TestStore) {
    let owner = register(&store, &unique_email("a"), "pw").await;

    let created = store
        .secrets
        .create(&owner, Secret::new(owner, "n1", "raw", vec![1, 2]))
        .await
        .unwrap();
    assert!(!created.id.is_nil());

    let read = store.secrets.read_by_name(&owner, "n1").await.unwrap();
    assert_eq!(read.id, created.id);
    assert_eq!(read.owner_id, owner);
    assert_eq!(read.kind, "raw");
    assert_eq!(read.content, vec![1, 2]);

    store.secrets.delete_by_name(&owner, "n1").await.unwrap();
    assert!(
        store
            .secrets
            .read_by_name(&owner, "n1")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

async fn check_duplicate_name_scoped_to_owner(store: TestStore) {
    let alice = register(&store, &unique_email("alice"), "pw").await;
    let bob = register(&store, &unique_email("bob"), "pw").await;

    store
        .secrets
        .create(&alice, Secret::new(alice, "shared", "raw", vec![1]))
        .await
        .unwrap();
    let err = store
        .secrets
        .create(&alice, Secret::new(alice, "shared", "lp", vec![2]))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // No overwrite happened.
    let kept = store.secrets.read_by_name(&alice, "shared").await.unwrap();
    assert_eq!(kept.content, vec![1]);

    store
        .secrets
        .create(&bob, Secret::new(bob, "shared", "raw", vec![3]))
        .await
        .unwrap();
    let bobs = store.secrets.read_by_name(&bob, "shared").await.unwrap();
    assert_eq!(bobs.content, vec![3]);
}

async fn check_owner_isolation(store: TestStore) {
    let alice = register(&store, &unique_email("alice"), "pw").await;
    let bob = register(&store, &unique_email("bob"), "pw").await;

    store
        .secrets
        .create(&alice, Secret::new(alice, "private", "raw", vec![9]))
        .await
        .unwrap();

    assert!(
        store
            .secrets
            .read_by_name(&bob, "private")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        store
            .secrets
            .delete_by_name(&bob, "private")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(store.secrets.list(&bob).await.unwrap().is_empty());
    assert!(store.secrets.read_by_name(&alice, "private").await.is_ok());
}

async fn check_list_sorted_by_name(store: TestStore) {
    let owner = register(&store, &unique_email("a"), "pw").await;
    assert!(store.secrets.list(&owner).await.unwrap().is_empty());

    for (name, kind) in [("delta", "raw"), ("Alpha", "lp"), ("charlie", "card"), ("bravo", "raw")] {
        store
            .secrets
            .create(&owner, Secret::new(owner, name, kind, b"x".to_vec()))
            .await
            .unwrap();
    }

    let listed = store.secrets.list(&owner).await.unwrap();
    let names: Vec<_> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "bravo", "charlie", "delta"]);
    assert_eq!(listed[0].kind, "lp");
}

async fn check_delete_missing_is_not_found(store: TestStore) {
    let owner = register(&store, &unique_email("a"), "pw").await;
    let err = store
        .secrets
        .delete_by_name(&owner, "never-created")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        vaultkeeper::Error::Storage(StorageError::SecretNotFound { ref name }) if name == "never-created"
    ));
}

async fn check_empty_content_round_trips(store: TestStore) {
    let owner = register(&store, &unique_email("a"), "pw").await;
    store
        .secrets
        .create(&owner, Secret::new(owner, "empty", "raw", Vec::new()))
        .await
        .unwrap();

    let read = store.secrets.read_by_name(&owner, "empty").await.unwrap();
    assert!(read.content.is_empty());
}

async fn check_unknown_owner_rejected(store: TestStore) {
    let ghost = Uuid::new_v4();
    let err = store
        .secrets
        .create(&ghost, Secret::new(ghost, "n", "raw", vec![1]))
        .await
        .unwrap_err();

    assert!(!err.is_conflict());
    assert!(!err.is_not_found());
}

fn in_memory() -> TestStore {
    let backend = Arc::new(InMemory::new());
    TestStore {
        users: backend.clone(),
        secrets: backend,
    }
}

#[cfg(feature = "sqlite")]
async fn sqlite() -> TestStore {
    let backend = Arc::new(
        vaultkeeper::storage::sql::SqlxStore::sqlite_in_memory()
            .await
            .expect("Failed to create SQLite store"),
    );
    TestStore {
        users: backend.clone(),
        secrets: backend,
    }
}

macro_rules! backend_tests {
    ($($check:ident),* $(,)?) => {
        mod in_memory {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(super::in_memory()).await;
                }
            )*
        }

        #[cfg(feature = "sqlite")]
        mod sqlite {
            $(
                #[tokio::test]
                async fn $check() {
                    super::$check(super::sqlite().await).await;
                }
            )*
        }
    };
}

backend_tests!(
    check_user_create_and_login,
    check_duplicate_email_conflicts,
    check_bad_credentials_indistinguishable,
    check_read_unknown_user,
    check_secret_lifecycle,
    check_duplicate_name_scoped_to_owner,
    check_owner_isolation,
    check_list_sorted_by_name,
    check_delete_missing_is_not_found,
    check_empty_content_round_trips,
    check_unknown_owner_rejected,
);

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_file_persists_across_reopen() {
    use vaultkeeper::storage::sql::SqlxStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");

    let owner = {
        let store = SqlxStore::open_sqlite(&path).await.unwrap();
        let owner = UserRepository::create(&store, User::new("a@x.com", "pw"))
            .await
            .unwrap()
            .id;
        SecretRepository::create(&store, &owner, Secret::new(owner, "n1", "raw", vec![1, 2]))
            .await
            .unwrap();
        store.close().await;
        owner
    };

    let store = SqlxStore::open_sqlite(&path).await.unwrap();
    let user = store
        .read_by_email_and_password("a@x.com", "pw")
        .await
        .unwrap();
    assert_eq!(user.id, owner);
    assert_eq!(
        store.read_by_name(&owner, "n1").await.unwrap().content,
        vec![1, 2]
    );
}
