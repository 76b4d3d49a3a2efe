//! Plan entity - A purchasable investment template.
//!
//! A plan fixes a price, a ROI percentage and a duration. Subscriptions copy these terms
//! at purchase time, so archiving or editing a plan never changes existing subscriptions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the plan can currently be bought
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Open for purchase
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Hidden from purchase, kept for history
    #[sea_orm(string_value = "ARCHIVED")]
    Archived,
}

impl PlanStatus {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Archived => "ARCHIVED",
        }
    }
}

/// Plan database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    /// Opaque unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Unique display title
    pub title: String,
    /// Marketing description
    pub description: String,
    /// Purchase price in minor units, always positive
    pub price: i64,
    /// Return paid on maturity, as a percentage of the price
    pub roi_percent: f64,
    /// Lock-up period in days, at least 1
    pub duration_days: i32,
    /// Whether the plan can be bought
    pub status: PlanStatus,
    /// When the plan was created
    pub created_at: DateTimeUtc,
    /// When the plan was last edited
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Plan and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan is referenced by many subscriptions
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscriptions,
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
