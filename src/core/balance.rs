//! Balance engine - The only code that changes a user's balances.
//!
//! A [`Movement`] is applied to the in-memory [`Balances`] of a user; if the result keeps
//! both pools non-negative, the user row and exactly one ledger row are written on the
//! caller's connection (normally an open database transaction). A rejected movement
//! writes nothing.

use crate::{
    core::amount::Amount,
    entities::{Direction, TransactionKind, transaction, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use tracing::debug;

/// The two balance pools of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    /// Spendable funds
    pub available: Amount,
    /// Principal committed to active subscriptions
    pub locked: Amount,
}

impl Balances {
    /// Reads the balances stored on a user row.
    #[must_use]
    pub const fn of(user: &user::Model) -> Self {
        Self {
            available: Amount::from_minor(user.available),
            locked: Amount::from_minor(user.locked),
        }
    }

    /// Returns the balances after `movement`, or the reason it is not allowed.
    ///
    /// # Errors
    /// - `InvalidAmount` if the movement amount is zero or negative
    /// - `InsufficientFunds` if `available` would drop below zero
    /// - `InsufficientLocked` if `locked` would drop below zero
    pub fn apply(self, movement: Movement) -> Result<Self> {
        let amount = movement.amount();
        if !amount.is_positive() {
            return Err(Error::InvalidAmount {
                amount: amount.to_string(),
            });
        }

        match movement {
            Movement::Credit(amount) => Ok(Self {
                available: self.available + amount,
                ..self
            }),
            Movement::Debit(amount) => Ok(Self {
                available: self.debit_available(amount)?,
                ..self
            }),
            Movement::Lock(amount) => Ok(Self {
                available: self.debit_available(amount)?,
                locked: self.locked + amount,
            }),
            Movement::Release(amount) => {
                let locked =
                    self.locked
                        .checked_sub(amount)
                        .ok_or(Error::InsufficientLocked {
                            locked: self.locked,
                            required: amount,
                        })?;
                Ok(Self {
                    available: self.available + amount,
                    locked,
                })
            }
        }
    }

    fn debit_available(self, amount: Amount) -> Result<Amount> {
        self.available
            .checked_sub(amount)
            .ok_or(Error::InsufficientFunds {
                available: self.available,
                required: amount,
            })
    }
}

/// One change to a user's balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Add to available
    Credit(Amount),
    /// Take from available
    Debit(Amount),
    /// Move from available to locked
    Lock(Amount),
    /// Move from locked back to available
    Release(Amount),
}

impl Movement {
    /// The amount moved, whatever the direction.
    #[must_use]
    pub const fn amount(self) -> Amount {
        match self {
            Self::Credit(amount)
            | Self::Debit(amount)
            | Self::Lock(amount)
            | Self::Release(amount) => amount,
        }
    }

    /// Direction as seen from the available balance.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Credit(_) | Self::Release(_) => Direction::Credit,
            Self::Debit(_) | Self::Lock(_) => Direction::Debit,
        }
    }
}

/// Links a ledger row to the record that caused it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    /// Subscription that caused the movement
    pub subscription_id: Option<String>,
    /// Plan of that subscription
    pub plan_id: Option<String>,
    /// Deposit that was approved
    pub deposit_id: Option<String>,
    /// Withdrawal that was requested or refunded
    pub withdrawal_id: Option<String>,
}

impl TransactionMeta {
    /// References a deposit.
    #[must_use]
    pub fn deposit(deposit_id: &str) -> Self {
        Self {
            deposit_id: Some(deposit_id.to_string()),
            ..Self::default()
        }
    }

    /// References a withdrawal.
    #[must_use]
    pub fn withdrawal(withdrawal_id: &str) -> Self {
        Self {
            withdrawal_id: Some(withdrawal_id.to_string()),
            ..Self::default()
        }
    }

    /// References a subscription and, when known, its plan.
    #[must_use]
    pub fn subscription(subscription_id: &str, plan_id: Option<&str>) -> Self {
        Self {
            subscription_id: Some(subscription_id.to_string()),
            plan_id: plan_id.map(str::to_string),
            ..Self::default()
        }
    }
}

/// The result of a successful [`post`].
#[derive(Debug, Clone)]
pub struct Posted {
    /// The user row with its new balances
    pub user: user::Model,
    /// The ledger row that records the movement
    pub transaction: transaction::Model,
}

/// Applies `movement` to `user`, writes the new balances and appends one ledger row whose
/// `balance_after` is the new available balance.
///
/// The balance check happens on the `user` snapshot passed in, which must have been read
/// on the same connection. Nothing is written when the check fails.
pub async fn post<C>(
    db: &C,
    user: user::Model,
    movement: Movement,
    kind: TransactionKind,
    meta: TransactionMeta,
    now: DateTime<Utc>,
) -> Result<Posted>
where
    C: ConnectionTrait,
{
    let balances = Balances::of(&user).apply(movement)?;
    let user_id = user.id.clone();

    let mut active_user: user::ActiveModel = user.into();
    active_user.available = Set(balances.available.minor());
    active_user.locked = Set(balances.locked.minor());
    active_user.updated_at = Set(now);
    let user = active_user.update(db).await?;

    let transaction = transaction::ActiveModel {
        user_id: Set(user_id),
        kind: Set(kind),
        amount: Set(movement.amount().minor()),
        direction: Set(movement.direction()),
        balance_after: Set(balances.available.minor()),
        subscription_id: Set(meta.subscription_id),
        plan_id: Set(meta.plan_id),
        deposit_id: Set(meta.deposit_id),
        withdrawal_id: Set(meta.withdrawal_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(
        user_id = %user.id,
        kind = kind.as_str(),
        amount = %movement.amount(),
        available = %balances.available,
        locked = %balances.locked,
        "balance movement posted"
    );

    Ok(Posted { user, transaction })
}
