//! Report generation business logic.
//!
//! Read-only figures for the admin dashboard: platform totals and per-plan sales. All
//! functions return structured data; formatting is left to the caller.

use crate::{
    core::amount::Amount,
    entities::{
        Deposit, DepositColumn, DepositStatus, Plan, PlanColumn, PlanStatus, Subscription,
        SubscriptionColumn, SubscriptionStatus, User, UserRole, UserStatus,
        Withdrawal, WithdrawalColumn, WithdrawalStatus, plan,
    },
    errors::Result,
};
use sea_orm::{PaginatorTrait, QueryOrder, prelude::*};
use std::collections::HashMap;

/// Platform-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformStats {
    /// Every registered account, admins included
    pub total_users: u64,
    /// Accounts waiting for approval
    pub pending_users: u64,
    /// Approved investor accounts
    pub active_users: u64,
    /// Sum of approved deposits
    pub total_deposited: Amount,
    /// Deposits waiting for review
    pub pending_deposits: u64,
    /// Sum of paid withdrawals
    pub total_withdrawn: Amount,
    /// Withdrawals not yet paid or rejected
    pub pending_withdrawals: u64,
    /// Plans open for purchase
    pub active_plans: u64,
    /// Subscriptions not yet matured
    pub active_subscriptions: u64,
    /// Sum of all available balances
    pub total_available: Amount,
    /// Sum of all locked balances
    pub total_locked: Amount,
}

/// Sales figures of one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSales {
    /// The plan
    pub plan: plan::Model,
    /// Subscriptions ever sold
    pub subscriptions: u64,
    /// Sum of the principal of every subscription to the plan
    pub volume: Amount,
}

/// Collects the dashboard totals.
pub async fn platform_stats(db: &DatabaseConnection) -> Result<PlatformStats> {
    let users = User::find().all(db).await?;
    let total_users = users.len() as u64;
    let pending_users = users
        .iter()
        .filter(|u| u.status == UserStatus::Pending)
        .count() as u64;
    let active_users = users
        .iter()
        .filter(|u| u.role == UserRole::User)
        .filter(|u| u.status == UserStatus::Approved)
        .count() as u64;
    let total_available: Amount = users.iter().map(|u| Amount::from_minor(u.available)).sum();
    let total_locked: Amount = users.iter().map(|u| Amount::from_minor(u.locked)).sum();

    let total_deposited: Amount = Deposit::find()
        .filter(DepositColumn::Status.eq(DepositStatus::Approved))
        .all(db)
        .await?
        .iter()
        .map(|d| Amount::from_minor(d.amount))
        .sum();
    let pending_deposits = Deposit::find()
        .filter(DepositColumn::Status.eq(DepositStatus::Pending))
        .count(db)
        .await?;

    let total_withdrawn: Amount = Withdrawal::find()
        .filter(WithdrawalColumn::Status.eq(WithdrawalStatus::Paid))
        .all(db)
        .await?
        .iter()
        .map(|w| Amount::from_minor(w.amount))
        .sum();
    let pending_withdrawals = Withdrawal::find()
        .filter(
            WithdrawalColumn::Status.is_in([WithdrawalStatus::Pending, WithdrawalStatus::Approved]),
        )
        .count(db)
        .await?;

    let active_plans = Plan::find()
        .filter(PlanColumn::Status.eq(PlanStatus::Active))
        .count(db)
        .await?;
    let active_subscriptions = Subscription::find()
        .filter(SubscriptionColumn::Status.eq(SubscriptionStatus::Active))
        .count(db)
        .await?;

    Ok(PlatformStats {
        total_users,
        pending_users,
        active_users,
        total_deposited,
        pending_deposits,
        total_withdrawn,
        pending_withdrawals,
        active_plans,
        active_subscriptions,
        total_available,
        total_locked,
    })
}

/// Subscription count and principal volume per plan, archived plans included, in
/// price order.
pub async fn plan_sales(db: &DatabaseConnection) -> Result<Vec<PlanSales>> {
    let plans = Plan::find().order_by_asc(PlanColumn::Price).all(db).await?;

    let mut totals: HashMap<String, (u64, Amount)> = HashMap::new();
    for subscription in Subscription::find().all(db).await? {
        let entry = totals.entry(subscription.plan_id).or_default();
        entry.0 += 1;
        entry.1 += Amount::from_minor(subscription.principal);
    }

    Ok(plans
        .into_iter()
        .map(|plan| {
            let (subscriptions, volume) = totals.remove(&plan.id).unwrap_or_default();
            PlanSales {
                plan,
                subscriptions,
                volume,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::core::{deposit, subscription::purchase_plan, withdrawal};
    use crate::test_utils::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_platform_stats_empty() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(platform_stats(&db).await?, PlatformStats::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_platform_stats_counts_activity() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_admin(&db).await?;
        let user = create_test_user(&db, Amount::from_units(500)).await?;
        let plan = create_test_plan(&db, Amount::from_units(100), 10.0, 30).await?;
        let limits = Limits::default();

        let approved = deposit::request_deposit(
            &db,
            &limits,
            &user.id,
            Amount::from_units(200),
            "wire",
            Utc::now(),
        )
        .await?;
        deposit::approve_deposit(&db, &approved.id, &admin.id, Utc::now()).await?;
        deposit::request_deposit(
            &db,
            &limits,
            &user.id,
            Amount::from_units(50),
            "wire",
            Utc::now(),
        )
        .await?;

        let paid = withdrawal::request_withdrawal(
            &db,
            &limits,
            &user.id,
            Amount::from_units(30),
            "wallet",
            Utc::now(),
        )
        .await?;
        withdrawal::approve_withdrawal(&db, &paid.id, &admin.id, Utc::now()).await?;
        withdrawal::mark_withdrawal_paid(&db, &paid.id, &admin.id, Utc::now()).await?;
        withdrawal::request_withdrawal(
            &db,
            &limits,
            &user.id,
            Amount::from_units(20),
            "wallet",
            Utc::now(),
        )
        .await?;

        purchase_plan(&db, &user.id, &plan.id, Utc::now()).await?;

        let stats = platform_stats(&db).await?;
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.pending_users, 0);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.total_deposited, Amount::from_units(200));
        assert_eq!(stats.pending_deposits, 1);
        assert_eq!(stats.total_withdrawn, Amount::from_units(30));
        assert_eq!(stats.pending_withdrawals, 1);
        assert_eq!(stats.active_plans, 1);
        assert_eq!(stats.active_subscriptions, 1);
        // 500 + 200 - 30 - 20 - 100
        assert_eq!(stats.total_available, Amount::from_units(550));
        assert_eq!(stats.total_locked, Amount::from_units(100));
        Ok(())
    }

    #[tokio::test]
    async fn test_plan_sales() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, Amount::from_units(1000)).await?;
        let basic = create_test_plan(&db, Amount::from_units(100), 10.0, 30).await?;
        let premium = create_test_plan(&db, Amount::from_units(250), 20.0, 90).await?;

        purchase_plan(&db, &user.id, &basic.id, Utc::now()).await?;
        purchase_plan(&db, &user.id, &basic.id, Utc::now()).await?;

        let sales = plan_sales(&db).await?;
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].plan.id, basic.id);
        assert_eq!(sales[0].subscriptions, 2);
        assert_eq!(sales[0].volume, Amount::from_units(200));
        assert_eq!(sales[1].plan.id, premium.id);
        assert_eq!(sales[1].subscriptions, 0);
        assert_eq!(sales[1].volume, Amount::ZERO);
        Ok(())
    }
}
