use super::*;
use crate::errors::InternalError;
use crate::test::utils::setup_test_db;

async fn insert_account(store: &AccountStore, db: &sea_orm::DatabaseConnection, account: Account) -> Account {
    store.insert(db, &account).await.expect("Failed to insert account");
    account
}

fn system_user(email: &str, roles: &[&str]) -> Account {
    let mut account = Account::new(email).with_roles(roles.iter().copied());
    account.user_type = UserType::SystemUser;
    account
}

#[tokio::test]
async fn test_insert_and_find_round_trips_roles_in_order() {
    let db = setup_test_db().await;
    let store = AccountStore::new();

    insert_account(&store, &db, system_user("a@x.com", &["Blogger", SYSTEM_MANAGER])).await;

    let found = store.get(&db, "a@x.com").await.unwrap();
    assert_eq!(found.roles, vec!["Blogger".to_string(), SYSTEM_MANAGER.to_string()]);
    assert_eq!(found.user_type, UserType::SystemUser);
    assert!(store.exists(&db, "a@x.com").await.unwrap());
    assert!(store.find(&db, "missing@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_duplicate_is_already_exists() {
    let db = setup_test_db().await;
    let store = AccountStore::new();

    insert_account(&store, &db, Account::new("a@x.com")).await;
    let result = store.insert(&db, &Account::new("a@x.com")).await;

    assert!(matches!(
        result,
        Err(InternalError::Account(AccountError::AlreadyExists(name))) if name == "a@x.com"
    ));
}

#[tokio::test]
async fn test_update_with_stale_version_is_rejected() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    insert_account(&store, &db, Account::new("a@x.com")).await;

    let mut first = store.get(&db, "a@x.com").await.unwrap();
    let mut second = first.clone();

    first.first_name = Some("First".to_string());
    store.update(&db, &mut first).await.unwrap();
    assert_eq!(first.version, 1);

    second.first_name = Some("Second".to_string());
    let result = store.update(&db, &mut second).await;
    assert!(matches!(
        result,
        Err(InternalError::Account(AccountError::ConcurrentModification(_)))
    ));
    assert_eq!(second.version, 0);

    let stored = store.get(&db, "a@x.com").await.unwrap();
    assert_eq!(stored.first_name.as_deref(), Some("First"));
}

#[tokio::test]
async fn test_other_system_managers_excludes_administrator_self_and_disabled() {
    let db = setup_test_db().await;
    let store = AccountStore::new();

    insert_account(&store, &db, system_user(ADMINISTRATOR, &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("a@x.com", &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("b@x.com", &[SYSTEM_MANAGER]).disabled()).await;
    insert_account(&store, &db, system_user("c@x.com", &[SYSTEM_MANAGER])).await;

    let others = store.other_system_managers(&db, "a@x.com").await.unwrap();
    assert_eq!(others, vec!["c@x.com".to_string()]);

    let others = store.other_system_managers(&db, "c@x.com").await.unwrap();
    assert_eq!(others, vec!["a@x.com".to_string()]);
}

#[tokio::test]
async fn test_count_enabled_system_users_skips_standard_and_excluded() {
    let db = setup_test_db().await;
    let store = AccountStore::new();

    insert_account(&store, &db, system_user(ADMINISTRATOR, &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("a@x.com", &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("b@x.com", &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, Account::new("web@x.com")).await;

    assert_eq!(store.count_enabled_system_users(&db, "").await.unwrap(), 2);
    assert_eq!(store.count_enabled_system_users(&db, "a@x.com").await.unwrap(), 1);
    assert_eq!(store.count_enabled_website_users(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reset_key_lookup_and_clear() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    let mut account = Account::new("a@x.com");
    account.redirect_url = Some("/orders".to_string());
    insert_account(&store, &db, account).await;

    store.set_reset_key(&db, "a@x.com", "k".repeat(32).as_str(), 100).await.unwrap();
    let found = store.find_by_reset_key(&db, &"k".repeat(32)).await.unwrap().unwrap();
    assert_eq!(found.name, "a@x.com");
    assert_eq!(found.reset_key_issued_at, Some(100));

    store.clear_reset_state(&db, "a@x.com").await.unwrap();
    assert!(store.find_by_reset_key(&db, &"k".repeat(32)).await.unwrap().is_none());
    let cleared = store.get(&db, "a@x.com").await.unwrap();
    assert!(cleared.redirect_url.is_none());
}

#[tokio::test]
async fn test_consume_reset_key_succeeds_once() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    insert_account(&store, &db, Account::new("a@x.com")).await;
    store.set_reset_key(&db, "a@x.com", "first-key", 100).await.unwrap();

    assert!(store.consume_reset_key(&db, "a@x.com", "first-key").await.unwrap());
    assert!(!store.consume_reset_key(&db, "a@x.com", "first-key").await.unwrap());

    // A stale key never clears a token issued after it
    store.set_reset_key(&db, "a@x.com", "second-key", 200).await.unwrap();
    assert!(!store.consume_reset_key(&db, "a@x.com", "first-key").await.unwrap());
    let account = store.get(&db, "a@x.com").await.unwrap();
    assert_eq!(account.reset_password_key.as_deref(), Some("second-key"));
}

#[tokio::test]
async fn test_username_taken_ignores_own_account() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    insert_account(&store, &db, Account::new("a@x.com").with_username("ann")).await;

    assert!(!store.username_taken(&db, "ann", "a@x.com").await.unwrap());
    assert!(store.username_taken(&db, "ann", "b@x.com").await.unwrap());
}

#[tokio::test]
async fn test_system_user_names_honours_exclude_and_limit() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    insert_account(&store, &db, system_user(ADMINISTRATOR, &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("a@x.com", &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("b@x.com", &[SYSTEM_MANAGER])).await;
    insert_account(&store, &db, system_user("c@x.com", &[SYSTEM_MANAGER])).await;

    let names = store
        .system_user_names(&db, &["b@x.com".to_string()], None)
        .await
        .unwrap();
    assert_eq!(names, vec!["a@x.com".to_string(), "c@x.com".to_string()]);

    let names = store.system_user_names(&db, &[], Some(1)).await.unwrap();
    assert_eq!(names, vec!["a@x.com".to_string()]);
}

#[tokio::test]
async fn test_delete_removes_roles() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    insert_account(&store, &db, system_user("a@x.com", &[SYSTEM_MANAGER])).await;

    store.delete(&db, "a@x.com").await.unwrap();

    assert!(store.find(&db, "a@x.com").await.unwrap().is_none());
    assert!(store.load_roles(&db, "a@x.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rename_key_moves_row_and_rejects_taken_name() {
    let db = setup_test_db().await;
    let store = AccountStore::new();
    insert_account(&store, &db, Account::new("a@x.com")).await;
    insert_account(&store, &db, Account::new("b@x.com")).await;

    let result = store.rename_key(&db, "a@x.com", "b@x.com").await;
    assert!(matches!(result, Err(InternalError::Account(AccountError::AlreadyExists(_)))));

    store.rename_key(&db, "a@x.com", "c@x.com").await.unwrap();
    let renamed = store.get(&db, "c@x.com").await.unwrap();
    assert_eq!(renamed.email, "c@x.com");
    assert_eq!(renamed.version, 1);
    assert!(store.find(&db, "a@x.com").await.unwrap().is_none());
}
