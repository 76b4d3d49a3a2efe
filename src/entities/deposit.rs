//! Deposit entity - A user's request to add funds, reviewed by an admin.
//!
//! Funds only reach the balance on approval. `PENDING` moves to `APPROVED` or
//! `REJECTED` exactly once.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review state of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    /// Waiting for review
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Credited to the user
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Declined; no balance effect
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl DepositStatus {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// Deposit database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deposits")]
pub struct Model {
    /// Opaque unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Requesting user
    pub user_id: String,
    /// Requested amount in minor units
    pub amount: i64,
    /// Review state
    pub status: DepositStatus,
    /// Free-form reference supplied by the user (e.g. wire reference)
    pub note: String,
    /// Admin who approved or rejected the deposit
    pub reviewed_by: Option<String>,
    /// When the review happened
    pub reviewed_at: Option<DateTimeUtc>,
    /// When the request was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Deposit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each deposit belongs to one user
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
