//! Withdrawal workflow - request, admin review and payout.
//!
//! Funds leave the available balance when the request is made, so a user cannot spend
//! them twice while the request waits. A rejected request is refunded with a
//! WITHDRAWAL_REFUND credit; an approved one only changes status until it is paid.

use crate::{
    config::Limits,
    core::{
        amount::Amount,
        balance::{self, Movement, TransactionMeta},
        ids,
        user::{require_admin, require_approved_user, require_user},
        validation,
    },
    entities::{TransactionKind, Withdrawal, WithdrawalColumn, WithdrawalStatus, withdrawal},
    errors::{Entity, Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Debits `amount` from an approved user and creates a PENDING withdrawal.
///
/// # Errors
/// - `InsufficientFunds` if the available balance is below `amount`; nothing is written
pub async fn request_withdrawal(
    db: &DatabaseConnection,
    limits: &Limits,
    user_id: &str,
    amount: Amount,
    destination_note: &str,
    now: DateTime<Utc>,
) -> Result<withdrawal::Model> {
    validation::amount("Withdrawal amount", amount, limits.min_withdrawal, None)?;
    let destination_note =
        validation::text("Destination", destination_note, validation::MAX_NOTE_CHARS)?;

    let txn = db.begin().await?;
    let user = require_approved_user(&txn, user_id).await?;

    // The withdrawal row is inserted first so the ledger row can reference it
    let withdrawal = withdrawal::ActiveModel {
        id: Set(ids::new_id()),
        user_id: Set(user.id.clone()),
        amount: Set(amount.minor()),
        status: Set(WithdrawalStatus::Pending),
        destination_note: Set(destination_note),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        paid_at: Set(None),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    // On InsufficientFunds the transaction is dropped and the insert above rolls back
    let posted = balance::post(
        &txn,
        user,
        Movement::Debit(amount),
        TransactionKind::Withdrawal,
        TransactionMeta::withdrawal(&withdrawal.id),
        now,
    )
    .await?;
    txn.commit().await?;

    info!(
        withdrawal_id = %withdrawal.id,
        user_id,
        amount = %amount,
        available = %Amount::from_minor(posted.user.available),
        "withdrawal requested"
    );
    Ok(withdrawal)
}

async fn find_withdrawal(
    txn: &DatabaseTransaction,
    withdrawal_id: &str,
) -> Result<withdrawal::Model> {
    Withdrawal::find_by_id(withdrawal_id.to_string())
        .one(txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: Entity::Withdrawal,
            id: withdrawal_id.to_string(),
        })
}

async fn pending_withdrawal(
    txn: &DatabaseTransaction,
    withdrawal_id: &str,
) -> Result<withdrawal::Model> {
    let withdrawal = find_withdrawal(txn, withdrawal_id).await?;
    if withdrawal.status != WithdrawalStatus::Pending {
        return Err(Error::AlreadyProcessed {
            entity: Entity::Withdrawal,
            id: withdrawal.id,
            status: withdrawal.status.as_str().to_string(),
        });
    }
    Ok(withdrawal)
}

fn reviewed(
    withdrawal: withdrawal::Model,
    status: WithdrawalStatus,
    admin_id: &str,
    now: DateTime<Utc>,
) -> withdrawal::ActiveModel {
    let mut active: withdrawal::ActiveModel = withdrawal.into();
    active.status = Set(status);
    active.reviewed_by = Set(Some(admin_id.to_string()));
    active.reviewed_at = Set(Some(now));
    active
}

/// Moves a PENDING withdrawal to APPROVED. No balance changes. Admin only.
pub async fn approve_withdrawal(
    db: &DatabaseConnection,
    withdrawal_id: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> Result<withdrawal::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let withdrawal = pending_withdrawal(&txn, withdrawal_id).await?;
    let withdrawal = reviewed(withdrawal, WithdrawalStatus::Approved, admin_id, now)
        .update(&txn)
        .await?;
    txn.commit().await?;

    info!(withdrawal_id, admin_id, "withdrawal approved");
    Ok(withdrawal)
}

/// Rejects a PENDING withdrawal and credits the amount back. Admin only.
pub async fn reject_withdrawal(
    db: &DatabaseConnection,
    withdrawal_id: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> Result<withdrawal::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let withdrawal = pending_withdrawal(&txn, withdrawal_id).await?;
    let user = require_user(&txn, &withdrawal.user_id).await?;
    let amount = Amount::from_minor(withdrawal.amount);

    let posted = balance::post(
        &txn,
        user,
        Movement::Credit(amount),
        TransactionKind::WithdrawalRefund,
        TransactionMeta::withdrawal(&withdrawal.id),
        now,
    )
    .await?;
    let withdrawal = reviewed(withdrawal, WithdrawalStatus::Rejected, admin_id, now)
        .update(&txn)
        .await?;
    txn.commit().await?;

    info!(
        withdrawal_id,
        admin_id,
        refunded = %amount,
        available = %Amount::from_minor(posted.user.available),
        "withdrawal rejected"
    );
    Ok(withdrawal)
}

/// Moves an APPROVED withdrawal to PAID. Admin only.
///
/// # Errors
/// - `NotApproved` if the withdrawal is in any other status
pub async fn mark_withdrawal_paid(
    db: &DatabaseConnection,
    withdrawal_id: &str,
    admin_id: &str,
    now: DateTime<Utc>,
) -> Result<withdrawal::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let withdrawal = find_withdrawal(&txn, withdrawal_id).await?;
    if withdrawal.status != WithdrawalStatus::Approved {
        return Err(Error::NotApproved {
            id: withdrawal.id,
            status: withdrawal.status.as_str().to_string(),
        });
    }

    let mut active: withdrawal::ActiveModel = withdrawal.into();
    active.status = Set(WithdrawalStatus::Paid);
    active.paid_at = Set(Some(now));
    let withdrawal = active.update(&txn).await?;
    txn.commit().await?;

    info!(withdrawal_id, admin_id, "withdrawal paid");
    Ok(withdrawal)
}

/// Looks a withdrawal up by id.
pub async fn get_withdrawal_by_id(
    db: &DatabaseConnection,
    withdrawal_id: &str,
) -> Result<Option<withdrawal::Model>> {
    Ok(Withdrawal::find_by_id(withdrawal_id.to_string())
        .one(db)
        .await?)
}

/// Withdrawals of a user, newest first.
pub async fn get_withdrawals_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<withdrawal::Model>> {
    Ok(Withdrawal::find()
        .filter(WithdrawalColumn::UserId.eq(user_id))
        .order_by_desc(WithdrawalColumn::CreatedAt)
        .all(db)
        .await?)
}

/// Withdrawals still needing admin action (PENDING or APPROVED), oldest first.
pub async fn list_open_withdrawals(db: &DatabaseConnection) -> Result<Vec<withdrawal::Model>> {
    Ok(Withdrawal::find()
        .filter(
            WithdrawalColumn::Status.is_in([WithdrawalStatus::Pending, WithdrawalStatus::Approved]),
        )
        .order_by_asc(WithdrawalColumn::CreatedAt)
        .all(db)
        .await?)
}
