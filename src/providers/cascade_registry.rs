use sea_orm::sea_query::{Alias, Condition, Expr, Query};
use sea_orm::{ConnectionTrait, Value};

use crate::errors::InternalError;
use crate::providers::share_provider::ACCOUNT_DOCTYPE;

/// A column holding an account name
#[derive(Debug, Clone)]
pub struct AccountReference {
    pub table: &'static str,
    pub column: &'static str,
    /// Only rows where this column equals this value
    pub scope: Option<(&'static str, &'static str)>,
}

impl AccountReference {
    pub const fn new(table: &'static str, column: &'static str) -> Self {
        Self {
            table,
            column,
            scope: None,
        }
    }

    pub const fn scoped(table: &'static str, column: &'static str, scope: (&'static str, &'static str)) -> Self {
        Self {
            table,
            column,
            scope: Some(scope),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeAction {
    Delete,
    /// Set the column to NULL
    Nullify(&'static str),
}

/// Rows to clean up when an account is deleted
#[derive(Debug, Clone)]
pub struct PurgeRule {
    pub table: &'static str,
    /// A row matches when any of these columns equals the account name
    pub account_columns: &'static [&'static str],
    /// Extra `column IN (values)` filters, all of which must hold
    pub filters: &'static [(&'static str, &'static [&'static str])],
    pub action: PurgeAction,
}

/// Registry of account references, populated at startup
///
/// Rename rewrites every registered reference; delete applies every purge rule.
#[derive(Debug, Clone, Default)]
pub struct CascadeRegistry {
    references: Vec<AccountReference>,
    purge_rules: Vec<PurgeRule>,
}

impl CascadeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// References and purge rules for the tables this crate owns
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        for (table, column) in [
            ("accounts", "owner"),
            ("accounts", "modified_by"),
            ("account_roles", "account"),
            ("doc_shares", "account"),
            ("doc_shares", "owner"),
            ("todos", "owner"),
            ("todos", "modified_by"),
            ("todos", "assigned_by"),
            ("events", "owner"),
            ("events", "modified_by"),
            ("communications", "owner"),
            ("email_groups", "owner"),
            ("newsletters", "owner"),
            ("newsletters", "modified_by"),
        ] {
            registry.register_reference(AccountReference::new(table, column));
        }
        registry.register_reference(AccountReference::scoped(
            "doc_shares",
            "share_name",
            ("share_doctype", ACCOUNT_DOCTYPE),
        ));
        registry.register_reference(AccountReference::scoped(
            "communications",
            "reference_name",
            ("reference_doctype", ACCOUNT_DOCTYPE),
        ));

        registry.register_purge(PurgeRule {
            table: "todos",
            account_columns: &["owner"],
            filters: &[],
            action: PurgeAction::Delete,
        });
        registry.register_purge(PurgeRule {
            table: "todos",
            account_columns: &["assigned_by"],
            filters: &[],
            action: PurgeAction::Nullify("assigned_by"),
        });
        registry.register_purge(PurgeRule {
            table: "events",
            account_columns: &["owner"],
            filters: &[("event_type", &["Private"])],
            action: PurgeAction::Delete,
        });
        registry.register_purge(PurgeRule {
            table: "doc_shares",
            account_columns: &["account"],
            filters: &[],
            action: PurgeAction::Delete,
        });
        registry.register_purge(PurgeRule {
            table: "communications",
            account_columns: &["reference_name", "owner"],
            filters: &[
                ("communication_type", &["Chat", "Notification"]),
                ("reference_doctype", &[ACCOUNT_DOCTYPE]),
            ],
            action: PurgeAction::Delete,
        });

        registry
    }

    pub fn register_reference(&mut self, reference: AccountReference) {
        self.references.push(reference);
    }

    pub fn register_purge(&mut self, rule: PurgeRule) {
        self.purge_rules.push(rule);
    }

    pub fn references(&self) -> &[AccountReference] {
        &self.references
    }

    /// Point every registered reference at `new_name`; returns rows touched
    pub async fn rename(&self, conn: &impl ConnectionTrait, old_name: &str, new_name: &str) -> Result<u64, InternalError> {
        let mut touched = 0;
        for reference in &self.references {
            let mut statement = Query::update();
            statement
                .table(Alias::new(reference.table))
                .value(Alias::new(reference.column), new_name)
                .and_where(Expr::col(Alias::new(reference.column)).eq(old_name));
            if let Some((column, value)) = reference.scope {
                statement.and_where(Expr::col(Alias::new(column)).eq(value));
            }

            let result = conn
                .execute(conn.get_database_backend().build(&statement))
                .await
                .map_err(|e| InternalError::database("cascade_rename", e))?;
            touched += result.rows_affected();
        }

        tracing::debug!(old = %old_name, new = %new_name, rows = touched, "Cascaded account rename");
        Ok(touched)
    }

    /// Apply every purge rule for `account`; returns rows touched
    pub async fn purge(&self, conn: &impl ConnectionTrait, account: &str) -> Result<u64, InternalError> {
        let mut touched = 0;
        for rule in &self.purge_rules {
            let mut matches_account = Condition::any();
            for column in rule.account_columns {
                matches_account = matches_account.add(Expr::col(Alias::new(*column)).eq(account));
            }

            let mut condition = Condition::all().add(matches_account);
            for (column, values) in rule.filters {
                condition = condition.add(Expr::col(Alias::new(*column)).is_in(values.iter().copied()));
            }

            let statement = match &rule.action {
                PurgeAction::Delete => {
                    let mut delete = Query::delete();
                    delete.from_table(Alias::new(rule.table)).cond_where(condition);
                    conn.get_database_backend().build(&delete)
                }
                PurgeAction::Nullify(column) => {
                    let mut update = Query::update();
                    update
                        .table(Alias::new(rule.table))
                        .value(Alias::new(*column), Value::String(None))
                        .cond_where(condition);
                    conn.get_database_backend().build(&update)
                }
            };

            let result = conn
                .execute(statement)
                .await
                .map_err(|e| InternalError::database("cascade_purge", e))?;
            touched += result.rows_affected();
        }

        tracing::debug!(account = %account, rows = touched, "Purged account records");
        Ok(touched)
    }
}

#[cfg(test)]
#[path = "cascade_registry_tests.rs"]
mod tests;
