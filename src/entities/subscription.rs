//! Subscription entity - One purchase of a plan.
//!
//! Holds a snapshot of the plan terms (`principal`, `roi_percent`, `duration_days`) taken
//! at purchase time. `ACTIVE -> COMPLETED` through the maturity sweep is the only
//! transition; `CANCELLED` is reserved.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Principal is locked, waiting for maturity
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Matured and paid out
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Reserved; no operation moves a subscription here
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl SubscriptionStatus {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Subscription database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Opaque unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Investor who bought the plan
    pub user_id: String,
    /// Plan that was bought
    pub plan_id: String,
    /// Locked principal in minor units (the plan price at purchase)
    pub principal: i64,
    /// ROI percent of the plan at purchase time
    pub roi_percent: f64,
    /// Lock period of the plan at purchase time
    pub duration_days: i32,
    /// Lifecycle state
    pub status: SubscriptionStatus,
    /// When the principal was locked
    pub started_at: DateTimeUtc,
    /// `started_at + duration_days`
    pub matures_at: DateTimeUtc,
    /// When the sweeper matured it
    pub completed_at: Option<DateTimeUtc>,
    /// Row creation time
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Subscription and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each subscription was bought from one plan
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id"
    )]
    Plan,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
