use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::{mpsc, Mutex};

use crate::collaborators::{
    AvatarLookup, InMemorySessionManager, MailDispatcher, NoAvatarLookup, PasswordStore, QuotaOracle,
    SessionManager, StaticQuotaOracle, TaskQueue, TokioTaskQueue, TracingMailDispatcher,
};
use crate::config::{IdentitySettings, SecretManager};
use crate::providers::{CacheProvider, CascadeRegistry, DefaultRoles, LinkSigner, RoleRegistry};
use crate::stores::{AccountStore, CredentialStore, EmailGroupStore, NewsletterStore, RoleStore, ShareStore};
use crate::types::internal::QueuedJob;

/// The external services coordinators call out to
#[derive(Clone)]
pub struct Collaborators {
    pub password_store: Arc<dyn PasswordStore>,
    pub mail: Arc<dyn MailDispatcher>,
    pub quota: Arc<dyn QuotaOracle>,
    pub sessions: Arc<dyn SessionManager>,
    pub task_queue: Arc<dyn TaskQueue>,
    pub avatars: Arc<dyn AvatarLookup>,
}

impl Collaborators {
    /// In-process implementations; returns the receiving end of the job queue for the worker
    pub fn in_process(
        db: &DatabaseConnection,
        settings: &IdentitySettings,
        secret_manager: &SecretManager,
        link_signer: Arc<LinkSigner>,
    ) -> (Self, mpsc::UnboundedReceiver<QueuedJob>) {
        let (task_queue, receiver) = TokioTaskQueue::channel();
        let collaborators = Self {
            password_store: Arc::new(CredentialStore::new(db.clone(), secret_manager.pepper().to_string())),
            mail: Arc::new(TracingMailDispatcher::new(settings.site_url.clone(), link_signer)),
            quota: Arc::new(StaticQuotaOracle::from_settings(settings)),
            sessions: Arc::new(InMemorySessionManager::new()),
            task_queue: Arc::new(task_queue),
            avatars: Arc::new(NoAvatarLookup),
        };
        (collaborators, receiver)
    }
}

/// Centralized application data following the main-owned stores pattern
///
/// All dependencies are created once and shared across coordinators.
///
/// ```text
/// main.rs / cli
///   ↓
/// AppData::new()
///   ↓ creates once
///   ├─ db (DatabaseConnection)
///   ├─ settings, secret_manager
///   ├─ stores (account, role, share, email group, newsletter)
///   ├─ cache + role_registry (process-wide)
///   ├─ link_signer, cascade_registry, default_roles
///   ├─ collaborators (password store, mail, quota, sessions, queue, avatars)
///   └─ write_guard (serialises account mutations)
///   ↓ wrapped in Arc<AppData>
///   ├─ AccountCoordinator::new(app_data)
///   ├─ PasswordResetCoordinator::new(app_data)
///   └─ DispatchCoordinator::new(app_data)
/// ```
pub struct AppData {
    pub db: DatabaseConnection,
    pub settings: Arc<IdentitySettings>,
    pub secret_manager: Arc<SecretManager>,
    pub account_store: Arc<AccountStore>,
    pub role_store: Arc<RoleStore>,
    pub share_store: Arc<ShareStore>,
    pub email_group_store: Arc<EmailGroupStore>,
    pub newsletter_store: Arc<NewsletterStore>,
    pub cache: Arc<CacheProvider>,
    pub role_registry: Arc<RoleRegistry>,
    pub link_signer: Arc<LinkSigner>,
    pub cascade_registry: Arc<CascadeRegistry>,
    pub default_roles: DefaultRoles,
    pub collaborators: Collaborators,
    pub write_guard: Arc<Mutex<()>>,
}

impl AppData {
    /// Assemble application data around an already migrated connection
    pub fn new(
        db: DatabaseConnection,
        settings: Arc<IdentitySettings>,
        secret_manager: Arc<SecretManager>,
        link_signer: Arc<LinkSigner>,
        collaborators: Collaborators,
    ) -> Self {
        tracing::debug!("Creating stores...");
        let role_store = Arc::new(RoleStore::new());
        let cache = Arc::new(CacheProvider::new());
        let role_registry = Arc::new(RoleRegistry::new(role_store.clone(), cache.clone()));
        let default_roles = DefaultRoles::new(Vec::new(), settings.default_portal_role.clone());

        Self {
            db,
            settings,
            secret_manager,
            account_store: Arc::new(AccountStore::new()),
            role_store,
            share_store: Arc::new(ShareStore::new()),
            email_group_store: Arc::new(EmailGroupStore::new()),
            newsletter_store: Arc::new(NewsletterStore::new()),
            cache,
            role_registry,
            link_signer,
            cascade_registry: Arc::new(CascadeRegistry::standard()),
            default_roles,
            collaborators,
            write_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Application data with the in-process collaborators
    ///
    /// Returns the task queue receiver; hand it to [`crate::worker::run_worker`]
    /// or newsletters sent asynchronously will never leave the queue.
    pub fn init(
        db: DatabaseConnection,
        settings: IdentitySettings,
        secret_manager: SecretManager,
    ) -> (Self, mpsc::UnboundedReceiver<QueuedJob>) {
        tracing::info!("Initializing AppData...");
        let link_signer = Arc::new(LinkSigner::new(
            secret_manager.link_secret(),
            settings.subscription_link_ttl,
        ));
        let (collaborators, receiver) =
            Collaborators::in_process(&db, &settings, &secret_manager, link_signer.clone());

        let app_data = Self::new(
            db,
            Arc::new(settings),
            Arc::new(secret_manager),
            link_signer,
            collaborators,
        );
        tracing::info!("AppData initialization complete");
        (app_data, receiver)
    }

    /// Replace the default-role rules consulted by sign-up and creation entry points
    pub fn with_default_roles(mut self, default_roles: DefaultRoles) -> Self {
        self.default_roles = default_roles;
        self
    }
}
