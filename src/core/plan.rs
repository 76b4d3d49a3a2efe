//! Plan business logic - the catalogue of purchasable plans.
//!
//! Plans are created and edited by admins. Once a subscription references a plan its
//! price, ROI and duration are frozen; title, description and status stay editable.
//! Archiving hides a plan from purchase without touching existing subscriptions.

use crate::{
    core::{amount::Amount, ids, user::require_admin, validation},
    entities::{Plan, PlanColumn, PlanStatus, Subscription, SubscriptionColumn, plan},
    errors::{Entity, Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Highest accepted plan price.
pub const MAX_PRICE: Amount = Amount::from_units(100_000);
/// Highest accepted ROI percentage.
pub const MAX_ROI_PERCENT: f64 = 1000.0;
/// Longest accepted plan duration, in days.
pub const MAX_DURATION_DAYS: i32 = 3650;

/// Terms and texts of a plan, used both to create and to edit one.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTerms {
    /// Unique display title
    pub title: String,
    /// Marketing description
    pub description: String,
    /// Purchase price, locked on purchase
    pub price: Amount,
    /// Return at maturity, in percent of the price
    pub roi_percent: f64,
    /// Lock period in days
    pub duration_days: i32,
}

impl PlanTerms {
    /// Trims the texts and checks every field against the plan bounds.
    pub fn validated(self) -> Result<Self> {
        let title = validation::text("Title", &self.title, 100)?;
        let description = validation::text("Description", &self.description, 500)?;
        validation::amount("Price", self.price, Amount::from_minor(1), Some(MAX_PRICE))?;

        if !self.roi_percent.is_finite() || !(0.0..=MAX_ROI_PERCENT).contains(&self.roi_percent) {
            return Err(Error::Validation {
                message: format!("ROI must be between 0 and {MAX_ROI_PERCENT} percent"),
            });
        }
        if !(1..=MAX_DURATION_DAYS).contains(&self.duration_days) {
            return Err(Error::Validation {
                message: format!("Duration must be between 1 and {MAX_DURATION_DAYS} days"),
            });
        }

        Ok(Self {
            title,
            description,
            ..self
        })
    }

    #[allow(clippy::float_cmp)]
    fn same_financials(&self, plan: &plan::Model) -> bool {
        self.price.minor() == plan.price
            && self.roi_percent == plan.roi_percent
            && self.duration_days == plan.duration_days
    }
}

/// Looks a plan up by id on any connection or open transaction.
pub async fn get_plan_by_id<C>(db: &C, plan_id: &str) -> Result<Option<plan::Model>>
where
    C: ConnectionTrait,
{
    Ok(Plan::find_by_id(plan_id.to_string()).one(db).await?)
}

async fn require_plan<C>(db: &C, plan_id: &str) -> Result<plan::Model>
where
    C: ConnectionTrait,
{
    get_plan_by_id(db, plan_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: Entity::Plan,
            id: plan_id.to_string(),
        })
}

/// Plans that can be purchased, cheapest first.
pub async fn list_active_plans(db: &DatabaseConnection) -> Result<Vec<plan::Model>> {
    Ok(Plan::find()
        .filter(PlanColumn::Status.eq(PlanStatus::Active))
        .order_by_asc(PlanColumn::Price)
        .all(db)
        .await?)
}

/// Every plan, including archived ones, newest first.
pub async fn list_all_plans(db: &DatabaseConnection) -> Result<Vec<plan::Model>> {
    Ok(Plan::find()
        .order_by_desc(PlanColumn::CreatedAt)
        .all(db)
        .await?)
}

pub(crate) async fn find_plan_by_title<C>(db: &C, title: &str) -> Result<Option<plan::Model>>
where
    C: ConnectionTrait,
{
    Ok(Plan::find()
        .filter(PlanColumn::Title.eq(title.trim()))
        .one(db)
        .await?)
}

/// Inserts an ACTIVE plan without an admin check. Used by seeding.
pub(crate) async fn insert_plan<C>(
    db: &C,
    terms: PlanTerms,
    now: DateTime<Utc>,
) -> Result<plan::Model>
where
    C: ConnectionTrait,
{
    let terms = terms.validated()?;
    let model = plan::ActiveModel {
        id: Set(ids::new_id()),
        title: Set(terms.title),
        description: Set(terms.description),
        price: Set(terms.price.minor()),
        roi_percent: Set(terms.roi_percent),
        duration_days: Set(terms.duration_days),
        status: Set(PlanStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(model.insert(db).await?)
}

/// Creates a new ACTIVE plan. Admin only.
pub async fn create_plan(
    db: &DatabaseConnection,
    admin_id: &str,
    terms: PlanTerms,
    now: DateTime<Utc>,
) -> Result<plan::Model> {
    // Validate before opening a transaction
    let terms = terms.validated()?;

    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let plan = insert_plan(&txn, terms, now).await?;
    txn.commit().await?;

    info!(
        plan_id = %plan.id,
        title = %plan.title,
        price = %Amount::from_minor(plan.price),
        "plan created"
    );
    Ok(plan)
}

/// Replaces the terms of a plan. Admin only.
///
/// Fails with `PlanInUse` if the plan has subscriptions and the price, ROI or duration
/// would change.
pub async fn update_plan(
    db: &DatabaseConnection,
    admin_id: &str,
    plan_id: &str,
    terms: PlanTerms,
    now: DateTime<Utc>,
) -> Result<plan::Model> {
    let terms = terms.validated()?;

    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let plan = require_plan(&txn, plan_id).await?;

    if !terms.same_financials(&plan) {
        let subscriptions = Subscription::find()
            .filter(SubscriptionColumn::PlanId.eq(plan_id))
            .count(&txn)
            .await?;
        if subscriptions > 0 {
            return Err(Error::PlanInUse {
                id: plan_id.to_string(),
            });
        }
    }

    let mut active: plan::ActiveModel = plan.into();
    active.title = Set(terms.title);
    active.description = Set(terms.description);
    active.price = Set(terms.price.minor());
    active.roi_percent = Set(terms.roi_percent);
    active.duration_days = Set(terms.duration_days);
    active.updated_at = Set(now);
    let plan = active.update(&txn).await?;
    txn.commit().await?;

    info!(plan_id = %plan.id, "plan updated");
    Ok(plan)
}

/// Archives or reactivates a plan. Admin only.
pub async fn set_plan_status(
    db: &DatabaseConnection,
    admin_id: &str,
    plan_id: &str,
    status: PlanStatus,
    now: DateTime<Utc>,
) -> Result<plan::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, admin_id).await?;
    let plan = require_plan(&txn, plan_id).await?;

    let mut active: plan::ActiveModel = plan.into();
    active.status = Set(status);
    active.updated_at = Set(now);
    let plan = active.update(&txn).await?;
    txn.commit().await?;

    info!(plan_id = %plan.id, status = status.as_str(), "plan status changed");
    Ok(plan)
}
