use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::config::IdentitySettings;
use crate::errors::{DatabaseError, InternalError};

/// Connect to the configured database without running migrations
pub async fn connect_database(database_url: &str) -> Result<DatabaseConnection, InternalError> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);

    // An in-memory sqlite database exists per connection, so keep exactly one
    if database_url.starts_with("sqlite::memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options)
        .await
        .map_err(|e| InternalError::database("connect_database", e))?;

    tracing::debug!("Connected to database: {}", database_url);

    Ok(db)
}

/// Run all pending migrations
pub async fn migrate_database(db: &DatabaseConnection) -> Result<(), InternalError> {
    Migrator::up(db, None)
        .await
        .map_err(|e| InternalError::database("run_migrations", e))?;

    tracing::debug!("Database migrations completed");

    Ok(())
}

/// Connect and migrate
pub async fn init_database(settings: &IdentitySettings) -> Result<DatabaseConnection, InternalError> {
    let db = connect_database(&settings.database_url).await?;
    migrate_database(&db).await?;
    Ok(db)
}

pub async fn begin_transaction(db: &DatabaseConnection) -> Result<DatabaseTransaction, InternalError> {
    db.begin()
        .await
        .map_err(|source| InternalError::Database(DatabaseError::TransactionBegin { source }))
}

/// Dropping a transaction without calling this rolls it back
pub async fn commit_transaction(txn: DatabaseTransaction) -> Result<(), InternalError> {
    txn.commit()
        .await
        .map_err(|source| InternalError::Database(DatabaseError::TransactionCommit { source }))
}

/// Roll back explicitly when the caller must observe the rollback before continuing
pub async fn rollback_transaction(txn: DatabaseTransaction) -> Result<(), InternalError> {
    txn.rollback()
        .await
        .map_err(|source| InternalError::Database(DatabaseError::TransactionRollback { source }))
}
