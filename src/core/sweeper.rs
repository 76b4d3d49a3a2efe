//! Maturity sweeper - completes every subscription whose maturity time has passed.
//!
//! Each subscription is matured in its own database transaction while holding the write
//! lock, and is re-read inside that transaction. A sweep that stops halfway leaves the
//! completed subscriptions durable and the rest ACTIVE for the next run, and running the
//! sweep twice never pays a subscription twice.

use crate::{
    core::{
        subscription::{find_due_subscription_ids, get_subscription_by_id, mature_subscription},
        user::get_user_by_id,
    },
    entities::SubscriptionStatus,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::{future::Future, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Subscriptions matured by this sweep
    pub processed: usize,
    /// Subscriptions left ACTIVE because their user row is missing
    pub skipped: usize,
    /// Subscriptions whose maturity failed and rolled back
    pub failed: usize,
}

enum Outcome {
    Matured,
    AlreadyDone,
    MissingUser,
}

async fn mature_one(
    db: &DatabaseConnection,
    subscription_id: &str,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    let txn = db.begin().await?;

    // Re-read under the lock: another sweep may have completed it meanwhile
    let Some(subscription) = get_subscription_by_id(&txn, subscription_id).await? else {
        return Ok(Outcome::AlreadyDone);
    };
    if subscription.status != SubscriptionStatus::Active || subscription.matures_at > now {
        return Ok(Outcome::AlreadyDone);
    }
    let Some(user) = get_user_by_id(&txn, &subscription.user_id).await? else {
        return Ok(Outcome::MissingUser);
    };

    let maturity = mature_subscription(&txn, subscription, user, now).await?;
    txn.commit().await?;

    info!(
        subscription_id,
        user_id = %maturity.user.id,
        principal = %maturity.principal,
        roi = %maturity.roi,
        "subscription matured"
    );
    Ok(Outcome::Matured)
}

/// Matures every ACTIVE subscription with `matures_at <= now`.
///
/// `write_lock` is taken for each subscription separately. A failure on one subscription
/// is logged and counted; the sweep carries on with the next.
pub async fn sweep_matured_subscriptions(
    db: &DatabaseConnection,
    write_lock: &Mutex<()>,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let due = find_due_subscription_ids(db, now).await?;
    let mut report = SweepReport::default();
    if due.is_empty() {
        debug!("No matured subscriptions found");
        return Ok(report);
    }

    for subscription_id in &due {
        let _guard = write_lock.lock().await;
        match mature_one(db, subscription_id, now).await {
            Ok(Outcome::Matured) => report.processed += 1,
            Ok(Outcome::AlreadyDone) => {}
            Ok(Outcome::MissingUser) => {
                warn!(subscription_id, "subscription user not found, skipping");
                report.skipped += 1;
            }
            Err(e) => {
                error!(subscription_id, "failed to mature subscription: {}", e);
                report.failed += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "maturity sweep finished"
    );
    Ok(report)
}

/// Runs a sweep every `interval` until `shutdown` resolves. The first sweep runs
/// immediately.
pub async fn run_periodic<F>(
    db: &DatabaseConnection,
    write_lock: &Mutex<()>,
    interval: Duration,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(
        interval_secs = interval.as_secs(),
        "maturity sweeper started"
    );
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("maturity sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep_matured_subscriptions(db, write_lock, Utc::now()).await {
                    error!("maturity sweep failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        amount::Amount,
        subscription::{get_subscription_by_id, maturity_date, purchase_plan},
        transaction::get_transactions_for_user,
    };
    use crate::entities::{Direction, TransactionKind, User};
    use crate::errors::Error;
    use crate::test_utils::*;
    use sea_orm::{ConnectionTrait, EntityTrait, Statement};

    #[tokio::test]
    async fn test_sweep_matures_due_subscription() -> Result<()> {
        // Purchase {250, 20%, 90 days} from 1000, swept at matures_at
        let db = setup_test_db().await?;
        let lock = Mutex::new(());
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let plan = create_test_plan(&db, Amount::from_units(250), 20.0, 90).await?;
        let subscription = purchase_plan(&db, &user.id, &plan.id, Utc::now()).await?;

        let report = sweep_matured_subscriptions(&db, &lock, subscription.matures_at).await?;
        assert_eq!(report.processed, 1);

        let user = reload_user(&db, &user.id).await?;
        assert_eq!(user.available, Amount::from_units(1050).minor());
        assert_eq!(user.locked, 0);

        let completed = get_subscription_by_id(&db, &subscription.id)
            .await?
            .ok_or_else(|| Error::Validation {
                message: "subscription vanished".to_string(),
            })?;
        assert_eq!(completed.status, SubscriptionStatus::Completed);
        assert!(completed.completed_at.is_some());

        let transactions = get_transactions_for_user(&db, &user.id).await?;
        assert_eq!(transactions.len(), 3);
        let release = &transactions[1];
        assert_eq!(release.kind, TransactionKind::LockRelease);
        assert_eq!(release.direction, Direction::Credit);
        assert_eq!(release.amount, Amount::from_units(250).minor());
        assert_eq!(release.balance_after, Amount::from_units(1000).minor());
        let roi = &transactions[2];
        assert_eq!(roi.kind, TransactionKind::RoiCredit);
        assert_eq!(roi.direction, Direction::Credit);
        assert_eq!(roi.amount, Amount::from_units(50).minor());
        assert_eq!(roi.balance_after, Amount::from_units(1050).minor());
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = Mutex::new(());
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 7).await?;
        let now = Utc::now();
        purchase_plan(&db, &user.id, &plan.id, now).await?;
        purchase_plan(&db, &user.id, &plan.id, now).await?;

        let later = maturity_date(now, 8);
        let first = sweep_matured_subscriptions(&db, &lock, later).await?;
        assert_eq!(first.processed, 2);
        let after_first = reload_user(&db, &user.id).await?;
        let ledger_len = get_transactions_for_user(&db, &user.id).await?.len();

        let second = sweep_matured_subscriptions(&db, &lock, later).await?;
        assert_eq!(second, SweepReport::default());
        assert_eq!(reload_user(&db, &user.id).await?, after_first);
        let rows = get_transactions_for_user(&db, &user.id).await?;
        assert_eq!(rows.len(), ledger_len);
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_ignores_subscriptions_not_yet_due() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = Mutex::new(());
        let user = create_test_user(&db, Amount::from_units(100)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 30).await?;
        let now = Utc::now();
        let subscription = purchase_plan(&db, &user.id, &plan.id, now).await?;

        let just_before = subscription.matures_at - chrono::TimeDelta::seconds(1);
        let report = sweep_matured_subscriptions(&db, &lock, just_before).await?;
        assert_eq!(report.processed, 0);
        let user = reload_user(&db, &user.id).await?;
        assert_eq!(user.locked, Amount::from_units(100).minor());
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_skips_subscription_without_user() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = Mutex::new(());
        let user = create_test_user(&db, Amount::from_units(100)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 1).await?;
        let now = Utc::now();
        let subscription = purchase_plan(&db, &user.id, &plan.id, now).await?;

        // Remove the user row behind the ledger's back
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "PRAGMA foreign_keys = OFF".to_string(),
        ))
        .await?;
        User::delete_by_id(user.id.clone()).exec(&db).await?;

        let report = sweep_matured_subscriptions(&db, &lock, maturity_date(now, 2)).await?;
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped, 1);

        let still_active = get_subscription_by_id(&db, &subscription.id).await?;
        assert_eq!(
            still_active.map(|s| s.status),
            Some(SubscriptionStatus::Active)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_run_periodic_stops_on_shutdown() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = Mutex::new(());
        let user = create_test_user(&db, Amount::from_units(100)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 1).await?;
        // Started two days ago, so already due
        let started = Utc::now() - chrono::TimeDelta::days(2);
        purchase_plan(&db, &user.id, &plan.id, started).await?;

        let shutdown = tokio::time::sleep(Duration::from_millis(200));
        run_periodic(&db, &lock, Duration::from_secs(3600), shutdown).await;

        // The immediate first tick matured the subscription
        let user = reload_user(&db, &user.id).await?;
        assert_eq!(user.available, Amount::from_units(110).minor());
        assert_eq!(user.locked, 0);
        Ok(())
    }
}
