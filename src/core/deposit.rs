//! Deposit workflow - a user asks for funds to be credited, an admin decides.
//!
//! A request has no balance effect. Approval credits the amount and writes a DEPOSIT
//! ledger row; rejection only records the decision. Either decision happens once.

use crate::{
    config::Limits,
    core::{
        amount::Amount,
        balance::{self, Movement, TransactionMeta},
        ids,
        user::{require_admin, require_approved_user, require_user},
        validation,
    },
    entities::{Deposit, DepositColumn, DepositStatus, TransactionKind, deposit},
    errors::{Entity, Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Creates a PENDING deposit request for an approved user.
pub async fn request_deposit(
    db: &DatabaseConnection,
    limits: &Limits,
    user_id: &str,
    amount: Amount,
    note: &str,
    now: DateTime<Utc>,
) -> Result<deposit::Model> {
    validation::amount(
        "Deposit amount",
        amount,
        limits.min_deposit,
        Some(limits.max_deposit),
    )?;
    let note = validation::text("Note", note, validation::MAX_NOTE_CHARS)?;

    let txn = db.begin().await?;
    let user = require_approved_user(&txn, user_id).await?;

    let deposit = deposit::ActiveModel {
        id: Set(ids::new_id()),
        user_id: Set(user.id),
        amount: Set(amount.minor()),
        status: Set(DepositStatus::Pending),
        note: Set(note),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(deposit_id = %deposit.id, user_id, amount = %amount, "deposit requested");
    Ok(deposit)
}

/// Loads a deposit that is still waiting for a decision.
async fn pending_deposit(txn: &DatabaseTransaction, deposit_id: &str) -> Result<deposit::Model> {
    let deposit = Deposit::find_by_id(deposit_id.to_string())
        .one(txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: Entity::Deposit,
            id: deposit_id.to_string(),
        })?;

    if deposit.status != DepositStatus::Pending {
        return Err(Error::AlreadyProcessed {
            entity: Entity::Deposit,
            id: deposit.id,
            status: deposit.status.as_str().to_string(),
        });
    }
    Ok(deposit)
}

fn reviewed(
    deposit: deposit::Model,
    status: DepositStatus,
    admin_id: &str,
    now: DateTime<Utc>,
) -> deposit::ActiveModel {
    let mut active: deposit::ActiveModel = deposit.into();
    active.status = Set(status);
    active.reviewed_by = Set(Some(admin_id.to_string()));
    active.reviewed_at = Set(Some(now));
    active
}

/// Approves a PENDING deposit and credits its amount. Admin only.
pub async fn approve_deposit(
    db: &DatabaseConnection,
    deposit_id: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> Result<deposit::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let deposit = pending_deposit(&txn, deposit_id).await?;
    let user = require_user(&txn, &deposit.user_id).await?;
    let amount = Amount::from_minor(deposit.amount);

    let posted = balance::post(
        &txn,
        user,
        Movement::Credit(amount),
        TransactionKind::Deposit,
        TransactionMeta::deposit(&deposit.id),
        now,
    )
    .await?;
    let deposit = reviewed(deposit, DepositStatus::Approved, admin_id, now)
        .update(&txn)
        .await?;
    txn.commit().await?;

    info!(
        deposit_id,
        admin_id,
        user_id = %posted.user.id,
        amount = %amount,
        available = %Amount::from_minor(posted.user.available),
        "deposit approved"
    );
    Ok(deposit)
}

/// Rejects a PENDING deposit. No balance changes. Admin only.
pub async fn reject_deposit(
    db: &DatabaseConnection,
    deposit_id: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> Result<deposit::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let deposit = pending_deposit(&txn, deposit_id).await?;
    let deposit = reviewed(deposit, DepositStatus::Rejected, admin_id, now)
        .update(&txn)
        .await?;
    txn.commit().await?;

    info!(deposit_id, admin_id, "deposit rejected");
    Ok(deposit)
}

/// Looks a deposit up by id.
pub async fn get_deposit_by_id(
    db: &DatabaseConnection,
    deposit_id: &str,
) -> Result<Option<deposit::Model>> {
    Ok(Deposit::find_by_id(deposit_id.to_string()).one(db).await?)
}

/// Deposits of a user, newest first.
pub async fn get_deposits_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<deposit::Model>> {
    Ok(Deposit::find()
        .filter(DepositColumn::UserId.eq(user_id))
        .order_by_desc(DepositColumn::CreatedAt)
        .all(db)
        .await?)
}

/// The admin review queue, oldest first.
pub async fn list_pending_deposits(db: &DatabaseConnection) -> Result<Vec<deposit::Model>> {
    Ok(Deposit::find()
        .filter(DepositColumn::Status.eq(DepositStatus::Pending))
        .order_by_asc(DepositColumn::CreatedAt)
        .all(db)
        .await?)
}
