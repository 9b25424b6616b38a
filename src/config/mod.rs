mod database;
mod env_provider;
mod logging;
mod secret_config;
mod secret_manager;
mod settings;

pub use database::{
    begin_transaction, commit_transaction, connect_database, init_database, migrate_database,
    rollback_transaction,
};
pub use env_provider::{EnvironmentProvider, SystemEnvironment};
#[cfg(test)]
pub use env_provider::MockEnvironment;
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use secret_config::{SecretConfig, SecretType};
pub use secret_manager::{SecretError, SecretManager};
pub use settings::{ConfigError, IdentitySettings};
