//! Withdrawal entity - A payout request.
//!
//! The amount leaves the available balance when the request is made. An admin then
//! approves and marks it paid, or rejects it (which refunds the amount).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payout state of a withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    /// Waiting for review; already debited
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Accepted, waiting for payout
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Declined and refunded
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    /// Sent to the destination
    #[sea_orm(string_value = "PAID")]
    Paid,
}

impl WithdrawalStatus {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Paid => "PAID",
        }
    }
}

/// Withdrawal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    /// Opaque unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Requesting user
    pub user_id: String,
    /// Amount in minor units, already debited from `available`
    pub amount: i64,
    /// Review state
    pub status: WithdrawalStatus,
    /// Where the funds should be sent
    pub destination_note: String,
    /// Admin who reviewed it
    pub reviewed_by: Option<String>,
    /// When the review happened
    pub reviewed_at: Option<DateTimeUtc>,
    /// When the payout was confirmed
    pub paid_at: Option<DateTimeUtc>,
    /// When the request was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Withdrawal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each withdrawal belongs to one user
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
