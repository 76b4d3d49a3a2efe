//! Bootstrap data from the `[seed]` section of the config file.
//!
//! Seeding is idempotent: the admin is created only when no ADMIN account exists, and a
//! plan is inserted only when no plan with the same title exists.

use crate::{
    config::settings::SeedConfig,
    core::{
        plan::{PlanTerms, find_plan_by_title, insert_plan},
        user::{NewUser, insert_user},
    },
    entities::{User, UserColumn, UserRole, UserStatus, user},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::info;

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Whether the admin account was created by this run
    pub admin_created: bool,
    /// Plans inserted by this run
    pub plans_created: usize,
}

/// Applies `seed` in one database transaction.
pub async fn seed_database(
    db: &DatabaseConnection,
    seed: &SeedConfig,
    now: DateTime<Utc>,
) -> Result<SeedSummary> {
    let txn = db.begin().await?;
    let mut summary = SeedSummary::default();

    if let Some(admin) = &seed.admin {
        let has_admin = User::find()
            .filter(UserColumn::Role.eq(UserRole::Admin))
            .one(&txn)
            .await?
            .is_some();
        if !has_admin {
            let new_admin = NewUser {
                email: admin.email.clone(),
                full_name: admin.full_name.clone(),
                phone: admin.phone.clone(),
            };
            let created =
                insert_user(&txn, new_admin, UserRole::Admin, UserStatus::Approved, now).await?;
            let mut active: user::ActiveModel = created.into();
            active.email_verified_at = Set(Some(now));
            let created = active.update(&txn).await?;
            info!(user_id = %created.id, email = %created.email, "seeded admin account");
            summary.admin_created = true;
        }
    }

    for plan in &seed.plans {
        if find_plan_by_title(&txn, &plan.title).await?.is_some() {
            continue;
        }
        let terms = PlanTerms {
            title: plan.title.clone(),
            description: plan.description.clone(),
            price: plan.price,
            roi_percent: plan.roi_percent,
            duration_days: plan.duration_days,
        };
        let created = insert_plan(&txn, terms, now).await?;
        info!(plan_id = %created.id, title = %created.title, "seeded plan");
        summary.plans_created += 1;
    }

    txn.commit().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{SeedAdmin, SeedPlan};
    use crate::core::{amount::Amount, plan::list_all_plans, user::list_users};
    use crate::errors::Error;
    use crate::test_utils::*;

    fn seed_config() -> SeedConfig {
        SeedConfig {
            admin: Some(SeedAdmin {
                email: "admin@example.com".to_string(),
                full_name: "System Administrator".to_string(),
                phone: None,
            }),
            plans: vec![
                SeedPlan {
                    title: "Basic Plan".to_string(),
                    description: "Low risk, steady returns.".to_string(),
                    price: Amount::from_units(100),
                    roi_percent: 10.0,
                    duration_days: 30,
                },
                SeedPlan {
                    title: "Premium Plan".to_string(),
                    description: "Balanced risk and reward.".to_string(),
                    price: Amount::from_units(250),
                    roi_percent: 20.0,
                    duration_days: 90,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_seed_creates_admin_and_plans() -> Result<()> {
        let db = setup_test_db().await?;
        let summary = seed_database(&db, &seed_config(), Utc::now()).await?;
        assert_eq!(
            summary,
            SeedSummary {
                admin_created: true,
                plans_created: 2
            }
        );

        let users = list_users(&db).await?;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, UserRole::Admin);
        assert_eq!(users[0].status, UserStatus::Approved);
        assert!(users[0].email_verified_at.is_some());
        assert_eq!(list_all_plans(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        seed_database(&db, &seed_config(), Utc::now()).await?;

        let again = seed_database(&db, &seed_config(), Utc::now()).await?;
        assert_eq!(again, SeedSummary::default());
        assert_eq!(list_users(&db).await?.len(), 1);
        assert_eq!(list_all_plans(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_skips_admin_when_one_exists() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_admin(&db).await?;

        let summary = seed_database(&db, &seed_config(), Utc::now()).await?;
        assert!(!summary.admin_created);
        assert_eq!(list_users(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_seed_plan_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let mut config = seed_config();
        config.plans[1].duration_days = 0;

        let result = seed_database(&db, &config, Utc::now()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(list_users(&db).await?.is_empty());
        assert!(list_all_plans(&db).await?.is_empty());
        Ok(())
    }
}
