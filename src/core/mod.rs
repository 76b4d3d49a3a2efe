//! Core business logic - framework-agnostic ledger operations.
//!
//! Every operation takes explicit user and admin ids and a timestamp; nothing here reads
//! an ambient session or the clock, except the periodic sweeper.

/// Fixed-point money
pub mod amount;
/// Balance movements and their ledger rows
pub mod balance;
/// Deposit requests and their review
pub mod deposit;
/// Identifier generation
pub mod ids;
/// Plan catalogue administration
pub mod plan;
/// Dashboard statistics
pub mod report;
/// Idempotent bootstrap data
pub mod seed;
/// Plan purchase and maturity
pub mod subscription;
/// Batch maturity of due subscriptions
pub mod sweeper;
/// Ledger history and replay
pub mod transaction;
/// Accounts, approval status and admin checks
pub mod user;
/// Input checks
pub mod validation;
/// Withdrawal requests, review and payout
pub mod withdrawal;
