//! Transaction entity - The append-only ledger of balance movements.
//!
//! Each row records one movement of a user's available balance: its `kind`, `amount`,
//! `direction` and the `balance_after` it produced. The auto-increment `id` is the
//! creation order. Rows are never updated or deleted.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What caused the balance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Approved deposit credited to available
    #[sea_orm(string_value = "DEPOSIT")]
    Deposit,
    /// Withdrawal request debited from available
    #[sea_orm(string_value = "WITHDRAWAL")]
    Withdrawal,
    /// Rejected withdrawal credited back to available
    #[sea_orm(string_value = "WITHDRAWAL_REFUND")]
    WithdrawalRefund,
    /// Plan price moved from available to locked
    #[sea_orm(string_value = "PLAN_BUY")]
    PlanBuy,
    /// Matured principal moved from locked to available
    #[sea_orm(string_value = "LOCK_RELEASE")]
    LockRelease,
    /// Return on a matured subscription
    #[sea_orm(string_value = "ROI_CREDIT")]
    RoiCredit,
}

impl TransactionKind {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::WithdrawalRefund => "WITHDRAWAL_REFUND",
            Self::PlanBuy => "PLAN_BUY",
            Self::LockRelease => "LOCK_RELEASE",
            Self::RoiCredit => "ROI_CREDIT",
        }
    }
}

/// Effect on the available balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Adds to the available balance
    #[sea_orm(string_value = "CREDIT")]
    Credit,
    /// Subtracts from the available balance
    #[sea_orm(string_value = "DEBIT")]
    Debit,
}

impl Direction {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Sequential key; ordering by it replays the ledger in creation order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance moved
    pub user_id: String,
    /// What caused the movement
    pub kind: TransactionKind,
    /// Always positive, in minor units
    pub amount: i64,
    /// Whether the movement added or subtracted
    pub direction: Direction,
    /// The user's available balance right after this movement
    pub balance_after: i64,
    /// Subscription that caused the movement (plan purchase, maturity)
    pub subscription_id: Option<String>,
    /// Plan of the referenced subscription
    pub plan_id: Option<String>,
    /// Deposit that was credited
    pub deposit_id: Option<String>,
    /// Withdrawal that was debited or refunded
    pub withdrawal_id: Option<String>,
    /// When the movement was posted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
