//! Subscription lifecycle - buying a plan and maturing the resulting subscription.
//!
//! A purchase locks the plan price and copies the plan terms onto the subscription, so
//! later plan edits never change a running subscription. Maturity releases the principal
//! and credits the ROI; only the sweeper drives it.

use crate::{
    core::{
        amount::Amount,
        balance::{self, Movement, TransactionMeta},
        ids,
        plan::get_plan_by_id,
        user::require_approved_user,
    },
    entities::{
        PlanStatus, Subscription, SubscriptionColumn, SubscriptionStatus, TransactionKind,
        subscription, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Maturity time of a subscription started at `started_at`.
#[must_use]
pub fn maturity_date(started_at: DateTime<Utc>, duration_days: i32) -> DateTime<Utc> {
    started_at + TimeDelta::days(i64::from(duration_days))
}

/// Buys `plan_id` for `user_id`: locks the plan price and opens an ACTIVE subscription.
///
/// # Errors
/// - `UserNotFound` / `AccountNotApproved` for an unknown or unapproved user
/// - `PlanUnavailable` if the plan is missing or archived
/// - `InsufficientFunds` if the available balance is below the price
pub async fn purchase_plan(
    db: &DatabaseConnection,
    user_id: &str,
    plan_id: &str,
    now: DateTime<Utc>,
) -> Result<subscription::Model> {
    let txn = db.begin().await?;

    let user = require_approved_user(&txn, user_id).await?;
    let plan = get_plan_by_id(&txn, plan_id)
        .await?
        .filter(|plan| plan.status == PlanStatus::Active)
        .ok_or_else(|| Error::PlanUnavailable {
            id: plan_id.to_string(),
        })?;
    let price = Amount::from_minor(plan.price);

    let subscription_id = ids::new_id();
    let posted = balance::post(
        &txn,
        user,
        Movement::Lock(price),
        TransactionKind::PlanBuy,
        TransactionMeta::subscription(&subscription_id, Some(plan.id.as_str())),
        now,
    )
    .await?;

    let subscription = subscription::ActiveModel {
        id: Set(subscription_id),
        user_id: Set(posted.user.id.clone()),
        plan_id: Set(plan.id.clone()),
        principal: Set(plan.price),
        roi_percent: Set(plan.roi_percent),
        duration_days: Set(plan.duration_days),
        status: Set(SubscriptionStatus::Active),
        started_at: Set(now),
        matures_at: Set(maturity_date(now, plan.duration_days)),
        completed_at: Set(None),
        created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        user_id,
        plan_id,
        subscription_id = %subscription.id,
        principal = %price,
        available = %Amount::from_minor(posted.user.available),
        "plan purchased"
    );
    Ok(subscription)
}

/// What maturing one subscription paid out.
#[derive(Debug, Clone)]
pub struct Maturity {
    /// The subscription, now COMPLETED
    pub subscription: subscription::Model,
    /// The user after both postings
    pub user: user::Model,
    /// Principal moved back to available
    pub principal: Amount,
    /// ROI credited on top; zero when it rounds to nothing
    pub roi: Amount,
}

/// Completes a subscription: releases the principal, credits the ROI and marks it
/// COMPLETED. The caller owns the transaction and has checked that the subscription is
/// ACTIVE and due.
pub(crate) async fn mature_subscription<C>(
    db: &C,
    subscription: subscription::Model,
    user: user::Model,
    now: DateTime<Utc>,
) -> Result<Maturity>
where
    C: ConnectionTrait,
{
    let principal = Amount::from_minor(subscription.principal);
    let roi = principal.percent_of(subscription.roi_percent)?;

    let released = balance::post(
        db,
        user,
        Movement::Release(principal),
        TransactionKind::LockRelease,
        TransactionMeta::subscription(&subscription.id, Some(subscription.plan_id.as_str())),
        now,
    )
    .await?;

    let user = if roi.is_positive() {
        balance::post(
            db,
            released.user,
            Movement::Credit(roi),
            TransactionKind::RoiCredit,
            TransactionMeta::subscription(&subscription.id, Some(subscription.plan_id.as_str())),
            now,
        )
        .await?
        .user
    } else {
        released.user
    };

    let mut active: subscription::ActiveModel = subscription.into();
    active.status = Set(SubscriptionStatus::Completed);
    active.completed_at = Set(Some(now));
    let subscription = active.update(db).await?;

    Ok(Maturity {
        subscription,
        user,
        principal,
        roi,
    })
}

/// Looks a subscription up by id.
pub async fn get_subscription_by_id<C>(
    db: &C,
    subscription_id: &str,
) -> Result<Option<subscription::Model>>
where
    C: ConnectionTrait,
{
    Ok(Subscription::find_by_id(subscription_id.to_string())
        .one(db)
        .await?)
}

/// Subscriptions of a user, newest first.
pub async fn get_subscriptions_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<subscription::Model>> {
    Ok(Subscription::find()
        .filter(SubscriptionColumn::UserId.eq(user_id))
        .order_by_desc(SubscriptionColumn::StartedAt)
        .all(db)
        .await?)
}

/// Ids of ACTIVE subscriptions with `matures_at <= now`, earliest maturity first.
pub async fn find_due_subscription_ids(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let due = Subscription::find()
        .filter(SubscriptionColumn::Status.eq(SubscriptionStatus::Active))
        .filter(SubscriptionColumn::MaturesAt.lte(now))
        .order_by_asc(SubscriptionColumn::MaturesAt)
        .all(db)
        .await?;
    Ok(due.into_iter().map(|row| row.id).collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::transaction::get_transactions_for_user;
    use crate::entities::{Direction, UserStatus};
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_purchase_locks_price() -> Result<()> {
        // 1000 available, plan {250, 20%, 90 days}
        let db = setup_test_db().await?;
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let plan = create_test_plan(&db, Amount::from_units(250), 20.0, 90).await?;
        let now = Utc::now();

        let subscription = purchase_plan(&db, &user.id, &plan.id, now).await?;
        assert_eq!(subscription.principal, Amount::from_units(250).minor());
        assert_eq!(subscription.roi_percent, 20.0);
        assert_eq!(subscription.duration_days, 90);
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(
            subscription.matures_at.timestamp() - subscription.started_at.timestamp(),
            90 * 86_400
        );

        let user = reload_user(&db, &user.id).await?;
        assert_eq!(user.available, Amount::from_units(750).minor());
        assert_eq!(user.locked, Amount::from_units(250).minor());

        let transactions = get_transactions_for_user(&db, &user.id).await?;
        assert_eq!(transactions.len(), 1);
        let buy = &transactions[0];
        assert_eq!(buy.kind, TransactionKind::PlanBuy);
        assert_eq!(buy.direction, Direction::Debit);
        assert_eq!(buy.amount, Amount::from_units(250).minor());
        assert_eq!(buy.balance_after, Amount::from_units(750).minor());
        assert_eq!(
            buy.subscription_id.as_deref(),
            Some(subscription.id.as_str())
        );
        assert_eq!(buy.plan_id.as_deref(), Some(plan.id.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_boundary() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, Amount::from_units(250), 20.0, 90).await?;

        let exact = create_test_user(&db, Amount::from_units(250)).await?;
        purchase_plan(&db, &exact.id, &plan.id, Utc::now()).await?;
        let exact = reload_user(&db, &exact.id).await?;
        assert_eq!(exact.available, 0);
        assert_eq!(exact.locked, Amount::from_units(250).minor());

        let short = create_test_user(&db, Amount::from_minor(24_999)).await?;
        let result = purchase_plan(&db, &short.id, &plan.id, Utc::now()).await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));

        let short_after = reload_user(&db, &short.id).await?;
        assert_eq!(short_after, short);
        assert!(get_subscriptions_for_user(&db, &short.id).await?.is_empty());
        assert!(get_transactions_for_user(&db, &short.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_rejects_unavailable_plan() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db).await?;
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 30).await?;
        crate::core::plan::set_plan_status(
            &db,
            &admin.id,
            &plan.id,
            PlanStatus::Archived,
            Utc::now(),
        )
        .await?;

        let result = purchase_plan(&db, &user.id, &plan.id, Utc::now()).await;
        assert!(matches!(result, Err(ref e) if e.kind() == ErrorKind::Unavailable));

        let result = purchase_plan(&db, &user.id, "missing", Utc::now()).await;
        assert!(matches!(result, Err(Error::PlanUnavailable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_requires_approved_user() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 30).await?;
        let pending = create_custom_user(
            &db,
            "pending@example.com",
            crate::entities::UserRole::User,
            UserStatus::Pending,
            Amount::from_units(1000),
        )
        .await?;

        let result = purchase_plan(&db, &pending.id, &plan.id, Utc::now()).await;
        assert!(matches!(result, Err(Error::AccountNotApproved { .. })));

        let result = purchase_plan(&db, "nobody", &plan.id, Utc::now()).await;
        assert!(matches!(result, Err(Error::UserNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_mature_subscription_pays_principal_and_roi() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let plan = create_test_plan(&db, Amount::from_units(250), 20.0, 90).await?;
        let started = Utc::now();
        let subscription = purchase_plan(&db, &user.id, &plan.id, started).await?;

        let user = reload_user(&db, &user.id).await?;
        let maturity =
            mature_subscription(&db, subscription.clone(), user, subscription.matures_at).await?;

        assert_eq!(maturity.principal, Amount::from_units(250));
        assert_eq!(maturity.roi, Amount::from_units(50));
        assert_eq!(maturity.subscription.status, SubscriptionStatus::Completed);
        assert!(maturity.subscription.completed_at.is_some());
        assert_eq!(maturity.user.available, Amount::from_units(1050).minor());
        assert_eq!(maturity.user.locked, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_roi_writes_no_roi_credit() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, Amount::from_units(100)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 0.0, 1).await?;
        let subscription = purchase_plan(&db, &user.id, &plan.id, Utc::now()).await?;

        let user = reload_user(&db, &user.id).await?;
        let maturity =
            mature_subscription(&db, subscription.clone(), user, subscription.matures_at).await?;
        assert_eq!(maturity.roi, Amount::ZERO);
        assert_eq!(maturity.user.available, Amount::from_units(100).minor());

        let kinds: Vec<TransactionKind> = get_transactions_for_user(&db, &maturity.user.id)
            .await?
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![TransactionKind::PlanBuy, TransactionKind::LockRelease]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_subscription_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let short = create_test_plan(&db, Amount::from_units(100), 10.0, 1).await?;
        let long = create_test_plan(&db, Amount::from_units(100), 10.0, 30).await?;
        let now = Utc::now();

        let due = purchase_plan(&db, &user.id, &short.id, now).await?;
        purchase_plan(&db, &user.id, &long.id, now).await?;

        assert!(find_due_subscription_ids(&db, now).await?.is_empty());
        let ids = find_due_subscription_ids(&db, maturity_date(now, 1)).await?;
        assert_eq!(ids, vec![due.id]);
        assert_eq!(get_subscriptions_for_user(&db, &user.id).await?.len(), 2);
        Ok(())
    }
}
