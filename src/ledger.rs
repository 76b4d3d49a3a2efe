//! The `Ledger` facade - the entry point embedders use.
//!
//! It owns the database connection, the configured request limits and a single write
//! mutex. Every operation that changes state holds the mutex for its whole
//! read-modify-write span, so two callers in the same process can never interleave on
//! the same balances. Read-only queries go straight to the database.

use crate::{
    config::{Limits, settings::SeedConfig},
    core::{
        amount::Amount,
        deposit, plan,
        plan::PlanTerms,
        report::{self, PlanSales, PlatformStats},
        seed::{self, SeedSummary},
        subscription,
        sweeper::{self, SweepReport},
        transaction::{self, LedgerAudit},
        user,
        user::NewUser,
        withdrawal,
    },
    entities::{
        DepositModel, PlanModel, PlanStatus, SubscriptionModel, TransactionModel, UserModel,
        UserStatus, WithdrawalModel,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::{future::Future, time::Duration};
use tokio::sync::Mutex;
use tracing::warn;

/// Logs a rejected operation with its error kind; successes are logged by the core.
fn log_rejection<T>(operation: &str, result: &Result<T>) {
    if let Err(e) = result {
        warn!(kind = ?e.kind(), "{operation} rejected: {e}");
    }
}

/// Serializes every write through one mutex. Cheap to share behind an `Arc`.
pub struct Ledger {
    db: DatabaseConnection,
    write_lock: Mutex<()>,
    limits: Limits,
}

impl Ledger {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub fn new(db: DatabaseConnection, limits: Limits) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
            limits,
        }
    }

    /// The underlying connection, for read-only access.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The configured request bounds.
    #[must_use]
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Creates the configured admin and plans if they are missing.
    pub async fn seed(&self, config: &SeedConfig) -> Result<SeedSummary> {
        let _guard = self.write_lock.lock().await;
        let result = seed::seed_database(&self.db, config, Utc::now()).await;
        log_rejection("seed", &result);
        result
    }
}

/// Users
impl Ledger {
    /// Registers a PENDING investor account.
    pub async fn register_user(&self, new_user: NewUser) -> Result<UserModel> {
        let _guard = self.write_lock.lock().await;
        let result = user::register_user(&self.db, new_user, Utc::now()).await;
        log_rejection("registration", &result);
        result
    }

    /// Changes an account's approval status. Admin only.
    pub async fn set_user_status(
        &self,
        admin_id: &str,
        user_id: &str,
        status: UserStatus,
    ) -> Result<UserModel> {
        let _guard = self.write_lock.lock().await;
        let result = user::set_user_status(&self.db, admin_id, user_id, status, Utc::now()).await;
        log_rejection("user status change", &result);
        result
    }

    /// Stamps the account's last login time.
    pub async fn record_login(&self, user_id: &str) -> Result<UserModel> {
        let _guard = self.write_lock.lock().await;
        user::record_login(&self.db, user_id, Utc::now()).await
    }

    /// Fails with `UserNotFound` for an unknown id.
    pub async fn get_user(&self, user_id: &str) -> Result<UserModel> {
        user::require_user(&self.db, user_id).await
    }

    /// Looks an account up by e-mail.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>> {
        user::get_user_by_email(&self.db, email).await
    }

    /// Every account, newest first.
    pub async fn list_users(&self) -> Result<Vec<UserModel>> {
        user::list_users(&self.db).await
    }

    /// Accounts waiting for approval.
    pub async fn list_pending_users(&self) -> Result<Vec<UserModel>> {
        user::list_pending_users(&self.db).await
    }
}

/// Plans
impl Ledger {
    /// Creates an ACTIVE plan. Admin only.
    pub async fn create_plan(&self, admin_id: &str, terms: PlanTerms) -> Result<PlanModel> {
        let _guard = self.write_lock.lock().await;
        let result = plan::create_plan(&self.db, admin_id, terms, Utc::now()).await;
        log_rejection("plan creation", &result);
        result
    }

    /// Replaces a plan's terms. Admin only.
    pub async fn update_plan(
        &self,
        admin_id: &str,
        plan_id: &str,
        terms: PlanTerms,
    ) -> Result<PlanModel> {
        let _guard = self.write_lock.lock().await;
        let result = plan::update_plan(&self.db, admin_id, plan_id, terms, Utc::now()).await;
        log_rejection("plan update", &result);
        result
    }

    /// Archives or re-activates a plan. Admin only.
    pub async fn set_plan_status(
        &self,
        admin_id: &str,
        plan_id: &str,
        status: PlanStatus,
    ) -> Result<PlanModel> {
        let _guard = self.write_lock.lock().await;
        let result = plan::set_plan_status(&self.db, admin_id, plan_id, status, Utc::now()).await;
        log_rejection("plan status change", &result);
        result
    }

    /// Looks a plan up by id.
    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<PlanModel>> {
        plan::get_plan_by_id(&self.db, plan_id).await
    }

    /// Plans open for purchase, cheapest first.
    pub async fn list_active_plans(&self) -> Result<Vec<PlanModel>> {
        plan::list_active_plans(&self.db).await
    }

    /// Every plan, archived ones included.
    pub async fn list_all_plans(&self) -> Result<Vec<PlanModel>> {
        plan::list_all_plans(&self.db).await
    }
}

/// Subscriptions and the maturity sweep
impl Ledger {
    /// Buys a plan for a user at the current time.
    pub async fn purchase_plan(&self, user_id: &str, plan_id: &str) -> Result<SubscriptionModel> {
        self.purchase_plan_at(user_id, plan_id, Utc::now()).await
    }

    /// Buys a plan with an explicit start time.
    pub async fn purchase_plan_at(
        &self,
        user_id: &str,
        plan_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionModel> {
        let _guard = self.write_lock.lock().await;
        let result = subscription::purchase_plan(&self.db, user_id, plan_id, now).await;
        log_rejection("plan purchase", &result);
        result
    }

    /// Looks a subscription up by id.
    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionModel>> {
        subscription::get_subscription_by_id(&self.db, subscription_id).await
    }

    /// A user's subscriptions, newest first.
    pub async fn subscriptions_for_user(&self, user_id: &str) -> Result<Vec<SubscriptionModel>> {
        subscription::get_subscriptions_for_user(&self.db, user_id).await
    }

    /// Matures every subscription due at `now`. The write lock is taken per subscription.
    pub async fn sweep_matured_subscriptions(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        sweeper::sweep_matured_subscriptions(&self.db, &self.write_lock, now).await
    }

    /// Sweeps every `interval` until `shutdown` resolves.
    pub async fn run_sweeper<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        sweeper::run_periodic(&self.db, &self.write_lock, interval, shutdown).await;
    }
}

/// Deposits
impl Ledger {
    /// Creates a PENDING deposit request.
    pub async fn request_deposit(
        &self,
        user_id: &str,
        amount: Amount,
        note: &str,
    ) -> Result<DepositModel> {
        let _guard = self.write_lock.lock().await;
        let result =
            deposit::request_deposit(&self.db, &self.limits, user_id, amount, note, Utc::now())
                .await;
        log_rejection("deposit request", &result);
        result
    }

    /// Approves a pending deposit and credits it.
    pub async fn approve_deposit(&self, deposit_id: &str, admin_id: &str) -> Result<DepositModel> {
        let _guard = self.write_lock.lock().await;
        let result = deposit::approve_deposit(&self.db, deposit_id, admin_id, Utc::now()).await;
        log_rejection("deposit approval", &result);
        result
    }

    /// Rejects a pending deposit.
    pub async fn reject_deposit(&self, deposit_id: &str, admin_id: &str) -> Result<DepositModel> {
        let _guard = self.write_lock.lock().await;
        let result = deposit::reject_deposit(&self.db, deposit_id, admin_id, Utc::now()).await;
        log_rejection("deposit rejection", &result);
        result
    }

    /// Looks a deposit up by id.
    pub async fn get_deposit(&self, deposit_id: &str) -> Result<Option<DepositModel>> {
        deposit::get_deposit_by_id(&self.db, deposit_id).await
    }

    /// A user's deposit requests.
    pub async fn deposits_for_user(&self, user_id: &str) -> Result<Vec<DepositModel>> {
        deposit::get_deposits_for_user(&self.db, user_id).await
    }

    /// Deposits waiting for review.
    pub async fn pending_deposits(&self) -> Result<Vec<DepositModel>> {
        deposit::list_pending_deposits(&self.db).await
    }
}

/// Withdrawals
impl Ledger {
    /// Debits the amount and files a PENDING withdrawal.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        amount: Amount,
        destination_note: &str,
    ) -> Result<WithdrawalModel> {
        let _guard = self.write_lock.lock().await;
        let result = withdrawal::request_withdrawal(
            &self.db,
            &self.limits,
            user_id,
            amount,
            destination_note,
            Utc::now(),
        )
        .await;
        log_rejection("withdrawal request", &result);
        result
    }

    /// Approves a pending withdrawal.
    pub async fn approve_withdrawal(
        &self,
        withdrawal_id: &str,
        admin_id: &str,
    ) -> Result<WithdrawalModel> {
        let _guard = self.write_lock.lock().await;
        let result =
            withdrawal::approve_withdrawal(&self.db, withdrawal_id, admin_id, Utc::now()).await;
        log_rejection("withdrawal approval", &result);
        result
    }

    /// Rejects a pending withdrawal and refunds it.
    pub async fn reject_withdrawal(
        &self,
        withdrawal_id: &str,
        admin_id: &str,
    ) -> Result<WithdrawalModel> {
        let _guard = self.write_lock.lock().await;
        let result =
            withdrawal::reject_withdrawal(&self.db, withdrawal_id, admin_id, Utc::now()).await;
        log_rejection("withdrawal rejection", &result);
        result
    }

    /// Marks an approved withdrawal as paid out.
    pub async fn mark_withdrawal_paid(
        &self,
        withdrawal_id: &str,
        admin_id: &str,
    ) -> Result<WithdrawalModel> {
        let _guard = self.write_lock.lock().await;
        let result =
            withdrawal::mark_withdrawal_paid(&self.db, withdrawal_id, admin_id, Utc::now()).await;
        log_rejection("withdrawal payout", &result);
        result
    }

    /// Looks a withdrawal up by id.
    pub async fn get_withdrawal(&self, withdrawal_id: &str) -> Result<Option<WithdrawalModel>> {
        withdrawal::get_withdrawal_by_id(&self.db, withdrawal_id).await
    }

    /// A user's withdrawal requests.
    pub async fn withdrawals_for_user(&self, user_id: &str) -> Result<Vec<WithdrawalModel>> {
        withdrawal::get_withdrawals_for_user(&self.db, user_id).await
    }

    /// Withdrawals that are PENDING or APPROVED.
    pub async fn open_withdrawals(&self) -> Result<Vec<WithdrawalModel>> {
        withdrawal::list_open_withdrawals(&self.db).await
    }
}

/// Ledger history and reporting
impl Ledger {
    /// A user's ledger rows in creation order.
    pub async fn transactions_for_user(&self, user_id: &str) -> Result<Vec<TransactionModel>> {
        transaction::get_transactions_for_user(&self.db, user_id).await
    }

    /// Ledger rows that reference a subscription, in creation order.
    pub async fn transactions_for_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<TransactionModel>> {
        transaction::get_transactions_for_subscription(&self.db, subscription_id).await
    }

    /// Checks a user's ledger against the stored available balance.
    pub async fn verify_ledger(&self, user_id: &str) -> Result<LedgerAudit> {
        transaction::audit_user_ledger(&self.db, user_id).await
    }

    /// The available balance implied by replaying a user's ledger from zero.
    pub async fn replay_available(&self, user_id: &str) -> Result<Amount> {
        transaction::replay_available(&self.db, user_id).await
    }

    /// Platform-wide totals.
    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        report::platform_stats(&self.db).await
    }

    /// Sales per plan.
    pub async fn plan_sales(&self) -> Result<Vec<PlanSales>> {
        report::plan_sales(&self.db).await
    }
}
