//! Command-line interface: argument definitions and their dispatch onto the [`Ledger`].

use clap::{Parser, Subcommand, ValueEnum};
use std::{path::PathBuf, time::Duration};
use tracing::info;
use yield_ledger::{
    Ledger,
    config::AppConfig,
    core::{amount::Amount, plan::PlanTerms, user::NewUser},
    entities::{PlanStatus, UserModel, UserStatus},
    errors::Result,
};

#[derive(Parser, Debug)]
#[command(
    name = "yield-ledger",
    version,
    about = "Investment ledger: balances, plans, deposits and withdrawals"
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
    Disabled,
}

impl From<StatusArg> for UserStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Self::Pending,
            StatusArg::Approved => Self::Approved,
            StatusArg::Rejected => Self::Rejected,
            StatusArg::Disabled => Self::Disabled,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the tables and seed the configured admin and plans
    Init,
    /// Register a new investor account (starts PENDING)
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Change the approval status of an account
    SetStatus {
        #[arg(long)]
        admin: String,
        user: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// List all accounts
    Users,
    /// List purchasable plans (or every plan with --all)
    Plans {
        #[arg(long)]
        all: bool,
    },
    /// Create a plan
    CreatePlan {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: Amount,
        /// Return at maturity, in percent of the price
        #[arg(long)]
        roi: f64,
        #[arg(long)]
        days: i32,
    },
    /// Hide a plan from purchase
    ArchivePlan {
        #[arg(long)]
        admin: String,
        plan: String,
    },
    /// Make an archived plan purchasable again
    ActivatePlan {
        #[arg(long)]
        admin: String,
        plan: String,
    },
    /// Buy a plan for a user
    Purchase { user: String, plan: String },
    /// Request a deposit
    Deposit {
        user: String,
        amount: Amount,
        #[arg(long)]
        note: String,
    },
    ApproveDeposit {
        #[arg(long)]
        admin: String,
        deposit: String,
    },
    RejectDeposit {
        #[arg(long)]
        admin: String,
        deposit: String,
    },
    /// Request a withdrawal; the amount is debited immediately
    Withdraw {
        user: String,
        amount: Amount,
        #[arg(long)]
        destination: String,
    },
    ApproveWithdrawal {
        #[arg(long)]
        admin: String,
        withdrawal: String,
    },
    /// Reject a withdrawal and refund it
    RejectWithdrawal {
        #[arg(long)]
        admin: String,
        withdrawal: String,
    },
    PayWithdrawal {
        #[arg(long)]
        admin: String,
        withdrawal: String,
    },
    /// Show a user's balances
    Balance { user: String },
    /// Show a user's ledger, oldest first
    History { user: String },
    /// Replay a user's ledger and compare it with the stored balance
    Audit { user: String },
    /// Show platform totals and plan sales
    Stats,
    /// Mature every due subscription once
    Sweep,
    /// Sweep periodically until Ctrl-C
    Sweeper {
        /// Overrides `[sweeper] interval_secs`
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn print_user(user: &UserModel) {
    println!(
        "{}  {:<30} {:<6} {:<9} available {:>12}  locked {:>12} {}",
        user.id,
        user.email,
        user.role.as_str(),
        user.status.as_str(),
        Amount::from_minor(user.available),
        Amount::from_minor(user.locked),
        user.currency
    );
}

async fn print_plans(ledger: &Ledger, all: bool) -> Result<()> {
    let plans = if all {
        ledger.list_all_plans().await?
    } else {
        ledger.list_active_plans().await?
    };
    if plans.is_empty() {
        println!("No plans");
    }
    for plan in plans {
        println!(
            "{}  {:<24} {:>10}  ROI {:>6.2}%  {:>4} days  {}",
            plan.id,
            plan.title,
            Amount::from_minor(plan.price),
            plan.roi_percent,
            plan.duration_days,
            plan.status.as_str()
        );
    }
    Ok(())
}

async fn print_stats(ledger: &Ledger) -> Result<()> {
    let stats = ledger.platform_stats().await?;
    println!(
        "Users:                {} ({} pending, {} active)",
        stats.total_users, stats.pending_users, stats.active_users
    );
    println!(
        "Deposited:            {} ({} pending)",
        stats.total_deposited, stats.pending_deposits
    );
    println!(
        "Withdrawn:            {} ({} open)",
        stats.total_withdrawn, stats.pending_withdrawals
    );
    println!("Active plans:         {}", stats.active_plans);
    println!("Active subscriptions: {}", stats.active_subscriptions);
    println!("Total available:      {}", stats.total_available);
    println!("Total locked:         {}", stats.total_locked);

    for sales in ledger.plan_sales().await? {
        println!(
            "  {:<24} {:>4} sold  volume {}",
            sales.plan.title, sales.subscriptions, sales.volume
        );
    }
    Ok(())
}

/// Runs one subcommand against `ledger`.
#[allow(clippy::too_many_lines)]
pub async fn run(command: Command, ledger: &Ledger, config: &AppConfig) -> Result<()> {
    match command {
        Command::Init => {
            let summary = ledger.seed(&config.seed).await?;
            println!(
                "Database ready (admin created: {}, plans created: {})",
                summary.admin_created, summary.plans_created
            );
        }
        Command::Register { email, name, phone } => {
            let user = ledger
                .register_user(NewUser {
                    email,
                    full_name: name,
                    phone,
                })
                .await?;
            print_user(&user);
        }
        Command::SetStatus {
            admin,
            user,
            status,
        } => {
            let user = ledger.set_user_status(&admin, &user, status.into()).await?;
            print_user(&user);
        }
        Command::Users => {
            for user in ledger.list_users().await? {
                print_user(&user);
            }
        }
        Command::Plans { all } => print_plans(ledger, all).await?,
        Command::CreatePlan {
            admin,
            title,
            description,
            price,
            roi,
            days,
        } => {
            let terms = PlanTerms {
                title,
                description,
                price,
                roi_percent: roi,
                duration_days: days,
            };
            let plan = ledger.create_plan(&admin, terms).await?;
            println!("Created plan {} ({})", plan.id, plan.title);
        }
        Command::ArchivePlan { admin, plan } => {
            let plan = ledger
                .set_plan_status(&admin, &plan, PlanStatus::Archived)
                .await?;
            println!("Plan {} archived", plan.id);
        }
        Command::ActivatePlan { admin, plan } => {
            let plan = ledger
                .set_plan_status(&admin, &plan, PlanStatus::Active)
                .await?;
            println!("Plan {} active", plan.id);
        }
        Command::Purchase { user, plan } => {
            let subscription = ledger.purchase_plan(&user, &plan).await?;
            println!(
                "Subscription {}: {} locked until {}",
                subscription.id,
                Amount::from_minor(subscription.principal),
                subscription.matures_at
            );
        }
        Command::Deposit { user, amount, note } => {
            let deposit = ledger.request_deposit(&user, amount, &note).await?;
            println!("Deposit {} of {} is PENDING", deposit.id, amount);
        }
        Command::ApproveDeposit { admin, deposit } => {
            let deposit = ledger.approve_deposit(&deposit, &admin).await?;
            println!("Deposit {} {}", deposit.id, deposit.status.as_str());
        }
        Command::RejectDeposit { admin, deposit } => {
            let deposit = ledger.reject_deposit(&deposit, &admin).await?;
            println!("Deposit {} {}", deposit.id, deposit.status.as_str());
        }
        Command::Withdraw {
            user,
            amount,
            destination,
        } => {
            let withdrawal = ledger
                .request_withdrawal(&user, amount, &destination)
                .await?;
            println!("Withdrawal {} of {} is PENDING", withdrawal.id, amount);
        }
        Command::ApproveWithdrawal { admin, withdrawal } => {
            let withdrawal = ledger.approve_withdrawal(&withdrawal, &admin).await?;
            println!(
                "Withdrawal {} {}",
                withdrawal.id,
                withdrawal.status.as_str()
            );
        }
        Command::RejectWithdrawal { admin, withdrawal } => {
            let withdrawal = ledger.reject_withdrawal(&withdrawal, &admin).await?;
            println!(
                "Withdrawal {} {} (refunded)",
                withdrawal.id,
                withdrawal.status.as_str()
            );
        }
        Command::PayWithdrawal { admin, withdrawal } => {
            let withdrawal = ledger.mark_withdrawal_paid(&withdrawal, &admin).await?;
            println!(
                "Withdrawal {} {}",
                withdrawal.id,
                withdrawal.status.as_str()
            );
        }
        Command::Balance { user } => {
            let user = ledger.get_user(&user).await?;
            print_user(&user);
        }
        Command::History { user } => {
            for entry in ledger.transactions_for_user(&user).await? {
                println!(
                    "{:>6}  {}  {:<17} {:<6} {:>12}  balance {:>12}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.kind.as_str(),
                    entry.direction.as_str(),
                    Amount::from_minor(entry.amount),
                    Amount::from_minor(entry.balance_after)
                );
            }
        }
        Command::Audit { user } => {
            let audit = ledger.verify_ledger(&user).await?;
            println!("Replayed:  {}", audit.replayed);
            println!("Stored:    {}", audit.stored);
            match audit.first_inconsistent {
                Some(id) => println!("First inconsistent row: {id}"),
                None if audit.is_consistent() => println!("Ledger is consistent"),
                None => println!("Rows chain correctly but do not reach the stored balance"),
            }
        }
        Command::Stats => print_stats(ledger).await?,
        Command::Sweep => {
            let report = ledger
                .sweep_matured_subscriptions(chrono::Utc::now())
                .await?;
            println!(
                "Processed {} matured subscriptions ({} skipped, {} failed)",
                report.processed, report.skipped, report.failed
            );
        }
        Command::Sweeper { interval_secs } => {
            let interval = Duration::from_secs(
                interval_secs
                    .unwrap_or(config.sweeper.interval_secs)
                    .max(1),
            );
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            ledger.run_sweeper(interval, shutdown).await;
            info!("Sweeper stopped");
        }
    }
    Ok(())
}
