//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the ledger tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

/// Deposit requests
pub mod deposit;
/// Investment plans
pub mod plan;
/// Purchased plans
pub mod subscription;
/// Ledger rows
pub mod transaction;
/// Accounts and balances
pub mod user;
/// Withdrawal requests
pub mod withdrawal;

// Re-export specific types to avoid conflicts
pub use deposit::{
    Column as DepositColumn, DepositStatus, Entity as Deposit, Model as DepositModel,
};
pub use plan::{Column as PlanColumn, Entity as Plan, Model as PlanModel, PlanStatus};
pub use subscription::{
    Column as SubscriptionColumn, Entity as Subscription, Model as SubscriptionModel,
    SubscriptionStatus,
};
pub use transaction::{
    Column as TransactionColumn, Direction, Entity as Transaction, Model as TransactionModel,
    TransactionKind,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole, UserStatus};
pub use withdrawal::{
    Column as WithdrawalColumn, Entity as Withdrawal, Model as WithdrawalModel,
    WithdrawalStatus,
};
