//! User business logic - registration, lookups and admin status changes.
//!
//! Users are never deleted. The helpers that take a generic `ConnectionTrait` are used
//! by the other core modules inside their own database transactions.

use crate::{
    core::{ids, validation},
    entities::{User, UserColumn, UserRole, UserStatus, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// The only currency balances are held in.
pub const CURRENCY: &str = "USDT";

/// Input for [`register_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login e-mail; normalized to lower case
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Optional contact phone
    pub phone: Option<String>,
}

/// Looks a user up by id on any connection or open transaction.
pub async fn get_user_by_id<C>(db: &C, user_id: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    Ok(User::find_by_id(user_id.to_string()).one(db).await?)
}

/// Like [`get_user_by_id`] but a missing user is an error.
pub async fn require_user<C>(db: &C, user_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
}

/// Loads the user and checks that the account may move money.
pub async fn require_approved_user<C>(db: &C, user_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = require_user(db, user_id).await?;
    if user.status != UserStatus::Approved {
        return Err(Error::AccountNotApproved {
            id: user.id,
            status: user.status.as_str().to_string(),
        });
    }
    Ok(user)
}

/// Returns the admin, or `Forbidden` if `admin_id` is unknown, not an ADMIN, or an admin
/// account that is not APPROVED.
pub async fn require_admin<C>(db: &C, admin_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    match get_user_by_id(db, admin_id).await? {
        Some(admin) if admin.role == UserRole::Admin && admin.status == UserStatus::Approved => {
            Ok(admin)
        }
        _ => Err(Error::Forbidden {
            user_id: admin_id.to_string(),
        }),
    }
}

/// Looks a user up by e-mail; the address is normalized first.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>> {
    let email = email.trim().to_lowercase();
    Ok(User::find()
        .filter(UserColumn::Email.eq(email))
        .one(db)
        .await?)
}

/// All users, newest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    Ok(User::find()
        .order_by_desc(UserColumn::CreatedAt)
        .all(db)
        .await?)
}

/// Users waiting for an admin decision, oldest first.
pub async fn list_pending_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    Ok(User::find()
        .filter(UserColumn::Status.eq(UserStatus::Pending))
        .order_by_asc(UserColumn::CreatedAt)
        .all(db)
        .await?)
}

/// Inserts a user row with the given role and status and zero balances.
pub(crate) async fn insert_user<C>(
    db: &C,
    new_user: NewUser,
    role: UserRole,
    status: UserStatus,
    now: DateTime<Utc>,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let email = validation::email(&new_user.email)?;
    let full_name = validation::text("Full name", &new_user.full_name, 100)?;
    let phone = new_user
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(str::to_string);

    let taken = User::find()
        .filter(UserColumn::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(Error::EmailTaken { email });
    }

    let model = user::ActiveModel {
        id: Set(ids::new_id()),
        email: Set(email),
        role: Set(role),
        status: Set(status),
        full_name: Set(full_name),
        phone: Set(phone),
        available: Set(0),
        locked: Set(0),
        currency: Set(CURRENCY.to_string()),
        email_verified_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        last_login_at: Set(None),
    };
    Ok(model.insert(db).await?)
}

/// Registers a new investor account. It starts PENDING with zero balances.
pub async fn register_user(
    db: &DatabaseConnection,
    new_user: NewUser,
    now: DateTime<Utc>,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    let user = insert_user(&txn, new_user, UserRole::User, UserStatus::Pending, now).await?;
    txn.commit().await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Sets the approval status of `user_id`. Admin only.
pub async fn set_user_status(
    db: &DatabaseConnection,
    admin_id: &str,
    user_id: &str,
    status: UserStatus,
    now: DateTime<Utc>,
) -> Result<user::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let user = require_user(&txn, user_id).await?;
    let previous = user.status;

    let mut active: user::ActiveModel = user.into();
    active.status = Set(status);
    active.updated_at = Set(now);
    let user = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        user_id = %user.id,
        admin_id,
        from = previous.as_str(),
        to = status.as_str(),
        "user status changed"
    );
    Ok(user)
}

/// Stamps the last login time of a user.
pub async fn record_login(
    db: &DatabaseConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<user::Model> {
    let user = require_user(db, user_id).await?;
    let mut active: user::ActiveModel = user.into();
    active.last_login_at = Set(Some(now));
    Ok(active.update(db).await?)
}
