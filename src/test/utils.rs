// Test utilities shared across unit tests
// Only compiled when running tests

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

use crate::app_data::{AppData, Collaborators};
use crate::collaborators::{
    InMemorySessionManager, MemoryMailDispatcher, NoAvatarLookup, PasswordStore, SessionManager,
    StaticQuotaOracle, TokioTaskQueue,
};
use crate::errors::InternalError;
use crate::config::{connect_database, migrate_database, IdentitySettings, SecretManager};
use crate::providers::LinkSigner;
use crate::stores::CredentialStore;
use crate::types::internal::QueuedJob;

pub const TEST_PEPPER: &str = "test-pepper-for-unit-tests";
pub const TEST_LINK_SECRET: &str = "test-link-secret-minimum-32-characters";

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
///
/// Hold on to `jobs` for as long as the app is used; dropping it makes every
/// asynchronous newsletter send fail to enqueue.
pub struct TestApp {
    pub app_data: Arc<AppData>,
    pub mail: Arc<MemoryMailDispatcher>,
    pub sessions: Arc<InMemorySessionManager>,
    pub jobs: mpsc::UnboundedReceiver<QueuedJob>,
}

/// Creates a full test setup with unlimited quotas
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(IdentitySettings::for_tests()).await
}

/// Creates a full test setup; quotas come from `settings`
pub async fn setup_test_app_with(settings: IdentitySettings) -> TestApp {
    setup_test_app_with_mail(settings, Arc::new(MemoryMailDispatcher::new())).await
}

/// Creates a full test setup around a prepared mail dispatcher
pub async fn setup_test_app_with_mail(settings: IdentitySettings, mail: Arc<MemoryMailDispatcher>) -> TestApp {
    build_test_app(settings, mail, Overrides::default()).await
}

/// Collaborators a test wants to swap for broken ones
#[derive(Default)]
pub struct Overrides {
    pub password_store: Option<Arc<dyn PasswordStore>>,
    pub sessions: Option<Arc<dyn SessionManager>>,
}

/// Creates a full test setup with some collaborators replaced
///
/// `TestApp::sessions` still points at an in-memory manager even when
/// `overrides.sessions` is set; the coordinators never see it.
pub async fn setup_test_app_with_overrides(settings: IdentitySettings, overrides: Overrides) -> TestApp {
    build_test_app(settings, Arc::new(MemoryMailDispatcher::new()), overrides).await
}

async fn build_test_app(settings: IdentitySettings, mail: Arc<MemoryMailDispatcher>, overrides: Overrides) -> TestApp {
    let db = setup_test_db().await;
    let secret_manager = SecretManager::from_values(TEST_PEPPER, TEST_LINK_SECRET);
    let link_signer = Arc::new(LinkSigner::new(TEST_LINK_SECRET, settings.subscription_link_ttl));

    let sessions = Arc::new(InMemorySessionManager::new());
    let (task_queue, jobs) = TokioTaskQueue::channel();

    let collaborators = Collaborators {
        password_store: overrides
            .password_store
            .unwrap_or_else(|| Arc::new(CredentialStore::new(db.clone(), TEST_PEPPER.to_string())) as Arc<dyn PasswordStore>),
        mail: mail.clone(),
        quota: Arc::new(StaticQuotaOracle::from_settings(&settings)),
        sessions: overrides
            .sessions
            .unwrap_or_else(|| sessions.clone() as Arc<dyn SessionManager>),
        task_queue: Arc::new(task_queue),
        avatars: Arc::new(NoAvatarLookup),
    };

    let app_data = Arc::new(AppData::new(
        db,
        Arc::new(settings),
        Arc::new(secret_manager),
        link_signer,
        collaborators,
    ));

    TestApp {
        app_data,
        mail,
        sessions,
        jobs,
    }
}

/// Password store and session manager that are always down
pub struct Unavailable;

impl Unavailable {
    fn error(what: &str) -> InternalError {
        InternalError::collaborator(what, "service unavailable")
    }
}

#[async_trait]
impl PasswordStore for Unavailable {
    async fn set(&self, _account: &str, _plaintext: &str) -> Result<(), InternalError> {
        Err(Self::error("password_store"))
    }

    async fn verify(&self, _account: &str, _plaintext: &str) -> Result<bool, InternalError> {
        Err(Self::error("password_store"))
    }

    async fn rename(&self, _old_name: &str, _new_name: &str) -> Result<(), InternalError> {
        Err(Self::error("password_store"))
    }

    async fn remove(&self, _account: &str) -> Result<(), InternalError> {
        Err(Self::error("password_store"))
    }
}

#[async_trait]
impl SessionManager for Unavailable {
    async fn terminate(&self, _account: &str) -> Result<(), InternalError> {
        Err(Self::error("sessions"))
    }

    async fn establish(&self, _account: &str) -> Result<(), InternalError> {
        Err(Self::error("sessions"))
    }
}
