//! Unified error types for the ledger.
//!
//! Every fallible operation returns [`Result`]. Business-rule failures carry enough
//! context for a readable message, and [`Error::kind`] maps each variant onto the small
//! taxonomy callers branch on.

use crate::core::amount::Amount;
use thiserror::Error;

/// Coarse classification of an [`Error`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// The entity is not in the state the operation requires.
    InvalidState,
    /// A balance precondition failed.
    InsufficientFunds,
    /// The plan cannot be purchased.
    Unavailable,
    /// The caller is not allowed to perform the operation.
    Forbidden,
    /// The input was rejected before touching any state.
    Invalid,
    /// Configuration could not be loaded.
    Config,
    /// The underlying storage failed.
    Storage,
}

/// The entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A platform user
    User,
    /// A plan template
    Plan,
    /// A plan purchase
    Subscription,
    /// A deposit request
    Deposit,
    /// A withdrawal request
    Withdrawal,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::User => "User",
            Self::Plan => "Plan",
            Self::Subscription => "Subscription",
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
        };
        f.write_str(name)
    }
}

/// Every failure the ledger reports.
#[derive(Debug, Error)]
pub enum Error {
    /// Unreadable or invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No user with this id
    #[error("User not found: {id}")]
    UserNotFound {
        /// Id that was looked up or acted on
        id: String,
    },

    /// No deposit, withdrawal, plan or subscription with this id
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record
        entity: Entity,
        /// Id that was looked up or acted on
        id: String,
    },

    /// The account may not move money
    #[error("Account {id} is not approved (status {status})")]
    AccountNotApproved {
        /// Id that was looked up or acted on
        id: String,
        /// Status it was found in
        status: String,
    },

    /// The plan is archived
    #[error("Plan not available: {id}")]
    PlanUnavailable {
        /// Id that was looked up or acted on
        id: String,
    },

    /// The plan's financial terms are frozen
    #[error("Plan {id} has subscriptions; price, ROI and duration can no longer change")]
    PlanInUse {
        /// Id that was looked up or acted on
        id: String,
    },

    /// The request was already decided
    #[error("{entity} {id} already processed (status {status})")]
    AlreadyProcessed {
        /// Kind of record
        entity: Entity,
        /// Id that was looked up or acted on
        id: String,
        /// Status it was found in
        status: String,
    },

    /// Only approved withdrawals can be paid
    #[error("Withdrawal {id} is not approved (status {status})")]
    NotApproved {
        /// Id that was looked up or acted on
        id: String,
        /// Status it was found in
        status: String,
    },

    /// Available balance too small
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        /// Available balance at the time
        available: Amount,
        /// Amount the operation needed
        required: Amount,
    },

    /// Locked balance too small
    #[error("Insufficient locked funds: locked {locked}, required {required}")]
    InsufficientLocked {
        /// Locked balance at the time
        locked: Amount,
        /// Amount the operation needed
        required: Amount,
    },

    /// Amount not positive or not representable
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected input
        amount: String,
    },

    /// Input outside its allowed shape or range
    #[error("Validation error: {message}")]
    Validation {
        /// What went wrong
        message: String,
    },

    /// E-mail already registered
    #[error("E-mail already registered: {email}")]
    EmailTaken {
        /// The normalized address
        email: String,
    },

    /// The caller is not an approved admin
    #[error("Forbidden: user {user_id} is not an approved administrator")]
    Forbidden {
        /// Id of the caller
        user_id: String,
    },
}

impl Error {
    /// Classifies this error for callers that only care about the category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Database(_) | Self::Io(_) => ErrorKind::Storage,
            Self::UserNotFound { .. } | Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccountNotApproved { .. }
            | Self::PlanInUse { .. }
            | Self::AlreadyProcessed { .. }
            | Self::NotApproved { .. } => ErrorKind::InvalidState,
            Self::PlanUnavailable { .. } => ErrorKind::Unavailable,
            Self::InsufficientFunds { .. } | Self::InsufficientLocked { .. } => {
                ErrorKind::InsufficientFunds
            }
            Self::InvalidAmount { .. } | Self::Validation { .. } | Self::EmailTaken { .. } => {
                ErrorKind::Invalid
            }
            Self::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }
}

// Convenience `Result` type
/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
