// Common test utilities for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sea_orm::DatabaseConnection;
use tenant_identity::app_data::{AppData, Collaborators};
use tenant_identity::collaborators::{
    InMemorySessionManager, MemoryMailDispatcher, NoAvatarLookup, StaticQuotaOracle, TokioTaskQueue,
};
use tenant_identity::config::{connect_database, migrate_database, IdentitySettings, SecretManager};
use tenant_identity::providers::LinkSigner;
use tenant_identity::stores::CredentialStore;
use tenant_identity::types::internal::QueuedJob;
use tokio::sync::mpsc;

pub const PEPPER: &str = "integration-test-pepper";
pub const LINK_SECRET: &str = "integration-test-link-secret-32-characters";

/// Creates an in-memory database with migrations applied
pub async fn setup_test_db() -> DatabaseConnection {
    let db = connect_database("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    migrate_database(&db)
        .await
        .expect("Failed to run migrations");

    db
}

/// Application wired with recording collaborators
pub struct TestApp {
    pub app_data: Arc<AppData>,
    pub mail: Arc<MemoryMailDispatcher>,
    pub sessions: Arc<InMemorySessionManager>,
    pub jobs: Option<mpsc::UnboundedReceiver<QueuedJob>>,
}

pub async fn setup_app(settings: IdentitySettings) -> TestApp {
    let db = setup_test_db().await;
    let link_signer = Arc::new(LinkSigner::new(LINK_SECRET, settings.subscription_link_ttl));
    let mail = Arc::new(MemoryMailDispatcher::new());
    let sessions = Arc::new(InMemorySessionManager::new());
    let (task_queue, jobs) = TokioTaskQueue::channel();

    let collaborators = Collaborators {
        password_store: Arc::new(CredentialStore::new(db.clone(), PEPPER.to_string())),
        mail: mail.clone(),
        quota: Arc::new(StaticQuotaOracle::from_settings(&settings)),
        sessions: sessions.clone(),
        task_queue: Arc::new(task_queue),
        avatars: Arc::new(NoAvatarLookup),
    };

    let app_data = Arc::new(AppData::new(
        db,
        Arc::new(settings),
        Arc::new(SecretManager::from_values(PEPPER, LINK_SECRET)),
        link_signer,
        collaborators,
    ));

    TestApp {
        app_data,
        mail,
        sessions,
        jobs: Some(jobs),
    }
}

/// Helper to manage environment variables in tests
///
/// Cleans up specified environment variables on creation and drop,
/// ensuring test isolation when dealing with global environment state.
pub struct EnvGuard {
    vars: Vec<String>,
}

impl EnvGuard {
    pub fn new(vars: Vec<&str>) -> Self {
        // Clean up before setting new values
        for var in &vars {
            unsafe {
                std::env::remove_var(var);
            }
        }
        Self {
            vars: vars.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for var in &self.vars {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }
}

/// Global mutex for tests that modify environment variables
///
/// Environment variables are process-global, so tests that modify them
/// must run serially to avoid race conditions.
pub static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());
