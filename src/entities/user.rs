//! User entity - A platform account and its two balance pools.
//!
//! Balances are stored in minor units: `available` is spendable, `locked` is principal
//! committed to active subscriptions. Users are never deleted, only status-transitioned.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Reviews deposits and withdrawals, manages plans and users
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    /// Regular investor
    #[sea_orm(string_value = "USER")]
    User,
}

/// Account approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// Registered, waiting for an admin
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Allowed to transact
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Registration refused
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    /// Previously approved, now switched off
    #[sea_orm(string_value = "DISABLED")]
    Disabled,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Opaque unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Login e-mail, stored lowercased
    #[sea_orm(unique)]
    pub email: String,
    /// USER or ADMIN
    pub role: UserRole,
    /// Approval state; only APPROVED accounts move money
    pub status: UserStatus,
    /// Display name
    pub full_name: String,
    /// Optional contact phone
    pub phone: Option<String>,
    /// Spendable balance in minor units
    pub available: i64,
    /// Principal locked in active subscriptions, in minor units
    pub locked: i64,
    /// Always `"USDT"`
    pub currency: String,
    /// When the e-mail address was confirmed
    pub email_verified_at: Option<DateTimeUtc>,
    /// Registration time
    pub created_at: DateTimeUtc,
    /// Last balance or profile change
    pub updated_at: DateTimeUtc,
    /// Last recorded login
    pub last_login_at: Option<DateTimeUtc>,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many subscriptions
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscriptions,
    /// One user has many deposits
    #[sea_orm(has_many = "super::deposit::Entity")]
    Deposits,
    /// One user has many withdrawals
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
    /// One user has many ledger transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl Related<super::deposit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposits.def()
    }
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawals.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl UserStatus {
    /// The stored string form, e.g. `"APPROVED"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Disabled => "DISABLED",
        }
    }
}

impl UserRole {
    /// The stored string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}
