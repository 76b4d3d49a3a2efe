//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs
//! without hand-written SQL. Creation order follows the foreign keys: users and plans
//! first, then the tables that reference them.

use crate::config::settings::AppConfig;
use crate::entities::{Deposit, Plan, Subscription, Transaction, User, Withdrawal};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Fallback used when neither `DATABASE_URL` nor the config file names a database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/yield_ledger.sqlite?mode=rwc";

/// Resolves the database URL: `DATABASE_URL` from the environment wins over the
/// `[database] url` entry of the config file.
#[must_use]
pub fn get_database_url(config: &AppConfig) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database.url.clone())
}

/// Opens a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first, since `SQLite`
/// creates the file but not the directories leading to it.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        debug!("Ensuring database directory exists: {}", parent);
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::connect(database_url).await?;
    info!("Database connection opened");
    Ok(db)
}

/// Extracts the directory portion of a `sqlite://dir/file.sqlite?...` URL, if any.
fn sqlite_file_parent(database_url: &str) -> Option<&str> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    path.rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|dir| !dir.is_empty())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all ledger tables if they do not exist yet.
///
/// Safe to call on every startup.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Plan).await?;
    create_table(db, &schema, Subscription).await?;
    create_table(db, &schema, Deposit).await?;
    create_table(db, &schema, Withdrawal).await?;
    create_table(db, &schema, Transaction).await?;

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        DepositModel, PlanModel, SubscriptionModel, TransactionModel, UserModel,
        WithdrawalModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<PlanModel> = Plan::find().limit(1).all(&db).await?;
        let _: Vec<SubscriptionModel> = Subscription::find().limit(1).all(&db).await?;
        let _: Vec<DepositModel> = Deposit::find().limit(1).all(&db).await?;
        let _: Vec<WithdrawalModel> = Withdrawal::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_file_parent() {
        assert_eq!(
            sqlite_file_parent("sqlite://data/yield_ledger.sqlite?mode=rwc"),
            Some("data")
        );
        assert_eq!(sqlite_file_parent("sqlite://ledger.sqlite"), None);
        assert_eq!(sqlite_file_parent("sqlite::memory:"), None);
        assert_eq!(sqlite_file_parent("postgres://localhost/ledger"), None);
    }
}
