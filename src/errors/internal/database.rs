use thiserror::Error;

/// Failures from sea-orm, tagged with the store operation or the
/// transaction step that hit them
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A store query; `operation` names it, e.g. `consume_reset_key`
    #[error("Database error: {operation} failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("Could not open an account or dispatch transaction: {source}")]
    TransactionBegin {
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("Could not commit the transaction: {source}")]
    TransactionCommit {
        #[source]
        source: sea_orm::DbErr,
    },

    /// Explicit rollback of a failed newsletter send
    #[error("Could not roll back the transaction: {source}")]
    TransactionRollback {
        #[source]
        source: sea_orm::DbErr,
    },
}
