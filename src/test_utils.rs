//! Shared test utilities for the ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults. Fixture users and plans are
//! inserted directly, without going through the admin checks, so that tests can start
//! from any balance.

use crate::{
    core::{amount::Amount, ids, plan::PlanTerms, user::CURRENCY},
    entities::{PlanStatus, UserRole, UserStatus, plan, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a user with custom role, status and opening available balance.
pub async fn create_custom_user(
    db: &DatabaseConnection,
    email: &str,
    role: UserRole,
    status: UserStatus,
    available: Amount,
) -> Result<user::Model> {
    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(ids::new_id()),
        email: Set(email.to_string()),
        role: Set(role),
        status: Set(status),
        full_name: Set("Test User".to_string()),
        phone: Set(None),
        available: Set(available.minor()),
        locked: Set(0),
        currency: Set(CURRENCY.to_string()),
        email_verified_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        last_login_at: Set(None),
    };
    Ok(model.insert(db).await?)
}

/// Creates an APPROVED investor holding `available`.
///
/// The opening balance has no ledger row, so a replay of this user's ledger yields
/// `available - opening`.
pub async fn create_test_user(db: &DatabaseConnection, available: Amount) -> Result<user::Model> {
    let email = format!("user-{}@example.com", ids::new_id());
    create_custom_user(db, &email, UserRole::User, UserStatus::Approved, available).await
}

/// Creates an APPROVED admin with zero balances.
pub async fn create_test_admin(db: &DatabaseConnection) -> Result<user::Model> {
    let email = format!("admin-{}@example.com", ids::new_id());
    create_custom_user(
        db,
        &email,
        UserRole::Admin,
        UserStatus::Approved,
        Amount::ZERO,
    )
    .await
}

/// Creates an ACTIVE plan with the given terms.
///
/// # Defaults
/// * `title`: "Test Plan"
/// * `description`: "Plan used in tests"
pub async fn create_test_plan(
    db: &DatabaseConnection,
    price: Amount,
    roi_percent: f64,
    duration_days: i32,
) -> Result<plan::Model> {
    let terms = PlanTerms {
        title: "Test Plan".to_string(),
        description: "Plan used in tests".to_string(),
        price,
        roi_percent,
        duration_days,
    }
    .validated()?;

    let now = Utc::now();
    let model = plan::ActiveModel {
        id: Set(ids::new_id()),
        title: Set(terms.title),
        description: Set(terms.description),
        price: Set(terms.price.minor()),
        roi_percent: Set(terms.roi_percent),
        duration_days: Set(terms.duration_days),
        status: Set(PlanStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

/// Reads a user back from the database.
pub async fn reload_user(db: &DatabaseConnection, user_id: &str) -> Result<user::Model> {
    crate::core::user::get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
}
