//! Promotion campaign lifecycle: activation, derived expiry, counters.
//!
//! Activation is all-or-nothing: tier lookup, wallet debit and the campaign
//! insert run in one database transaction, so a failed insert can never
//! leave the wallet short. The high-visibility shoutout fires on a detached
//! task only after commit; its failure is logged and never rolls anything
//! back.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ManagerProfile, PromotionTier, StationPromotion, Wallet};
use crate::services::notifier::Notifier;
use crate::services::wallet_ledger::{self, LedgerError};

/// Tiers whose activation triggers the local shoutout fan-out
pub const HIGH_VISIBILITY_TIERS: &[&str] = &["Gold Boost", "Platinum Boost"];

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_EXPIRED: &str = "expired";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(thiserror::Error, Debug)]
pub enum ActivationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Promotion tier not found")]
    TierNotFound,

    #[error("Wallet not found for manager")]
    WalletNotFound,

    #[error("Station already has an active promotion")]
    AlreadyPromoted,

    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for ActivationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Database(e) => ActivationError::Database(e),
            LedgerError::WalletNotFound => ActivationError::WalletNotFound,
            other => ActivationError::Ledger(other),
        }
    }
}

impl From<ActivationError> for AppError {
    fn from(err: ActivationError) -> Self {
        match err {
            ActivationError::Database(e) => AppError::Database(e),
            ActivationError::TierNotFound => {
                AppError::NotFound("Promotion tier not found".to_string())
            }
            ActivationError::WalletNotFound => {
                AppError::NotFound("Wallet not found for manager".to_string())
            }
            ActivationError::AlreadyPromoted => {
                AppError::Conflict("Station already has an active promotion".to_string())
            }
            ActivationError::Ledger(e) => e.into(),
        }
    }
}

/// Activates a tier for a station, billing the manager's wallet.
///
/// At most one active campaign may exist per station. A stored-active row
/// whose ends_at has already passed is superseded (marked expired) inside
/// the same transaction; a genuinely live one rejects the activation.
#[tracing::instrument(skip(pool, notifier, manager), fields(manager_id = %manager.id))]
pub async fn activate(
    pool: &PgPool,
    notifier: &Notifier,
    manager: &ManagerProfile,
    station_id: Uuid,
    tier_id: Uuid,
) -> Result<StationPromotion, ActivationError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let tier = PromotionTier::find_by_id(&mut tx, tier_id)
        .await?
        .ok_or(ActivationError::TierNotFound)?;

    if let Some(existing) = StationPromotion::find_stored_active(&mut tx, station_id).await? {
        if existing.ends_at > now {
            return Err(ActivationError::AlreadyPromoted);
        }
        // Lapsed campaign still stored as active; retire it so the partial
        // unique index admits the new row
        StationPromotion::mark_expired(&mut tx, existing.id).await?;
    }

    let wallet = Wallet::find_by_manager_for_update(&mut tx, manager.id)
        .await?
        .ok_or(ActivationError::WalletNotFound)?;

    let entry = wallet_ledger::debit_on(
        &mut tx,
        wallet.id,
        tier.price,
        json!({
            "promotion_tier": tier.name,
            "station_id": station_id,
        }),
    )
    .await?;

    let ends_at = now + Duration::hours(tier.duration_hours as i64);
    let promotion =
        StationPromotion::insert(&mut tx, station_id, tier.id, manager.id, now, ends_at).await?;

    tx.commit().await?;

    tracing::info!(
        promotion_id = %promotion.id,
        station_id = %station_id,
        tier = %tier.name,
        debited = tier.price,
        new_balance = entry.new_balance,
        ends_at = %ends_at,
        "Promotion activated"
    );

    if HIGH_VISIBILITY_TIERS.contains(&tier.name.as_str()) {
        notifier.spawn_shoutout(station_id, tier.name.clone());
    }

    Ok(promotion)
}

/// Effective status of a campaign at `now`. A stored-active row past its
/// ends_at reads as expired; expiry is never an explicit write.
pub fn effective_status(promotion: &StationPromotion, now: DateTime<Utc>) -> &'static str {
    match promotion.status.as_str() {
        STATUS_ACTIVE if now >= promotion.ends_at => STATUS_EXPIRED,
        STATUS_ACTIVE => STATUS_ACTIVE,
        STATUS_CANCELLED => STATUS_CANCELLED,
        _ => STATUS_EXPIRED,
    }
}

/// Campaign as reported to the dashboard, with the derived status
#[derive(Debug, Clone, Serialize)]
pub struct PromotionView {
    pub id: Uuid,
    pub station_id: Uuid,
    pub tier_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub views: i64,
    pub clicks: i64,
    pub status: &'static str,
}

impl PromotionView {
    pub fn from_promotion(promotion: &StationPromotion, now: DateTime<Utc>) -> Self {
        Self {
            id: promotion.id,
            station_id: promotion.station_id,
            tier_id: promotion.tier_id,
            starts_at: promotion.starts_at,
            ends_at: promotion.ends_at,
            views: promotion.views,
            clicks: promotion.clicks,
            status: effective_status(promotion, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::Notifier;
    use serde_json::json;

    fn promotion(status: &str, ends_in_hours: i64) -> StationPromotion {
        let now = Utc::now();
        StationPromotion {
            id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            tier_id: Uuid::new_v4(),
            activated_by: Uuid::new_v4(),
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(ends_in_hours),
            views: 0,
            clicks: 0,
            status: status.to_string(),
            created_at: now,
        }
    }

    #[test]
    fn live_campaign_reads_as_active() {
        let promo = promotion(STATUS_ACTIVE, 24);
        assert_eq!(effective_status(&promo, Utc::now()), STATUS_ACTIVE);
    }

    #[test]
    fn lapsed_campaign_reads_as_expired_without_a_write() {
        let promo = promotion(STATUS_ACTIVE, -1);
        assert_eq!(effective_status(&promo, Utc::now()), STATUS_EXPIRED);
        // Stored row is untouched
        assert_eq!(promo.status, STATUS_ACTIVE);
    }

    #[test]
    fn cancelled_campaign_stays_cancelled_past_its_end() {
        let promo = promotion(STATUS_CANCELLED, -5);
        assert_eq!(effective_status(&promo, Utc::now()), STATUS_CANCELLED);
    }

    #[test]
    fn boundary_instant_counts_as_expired() {
        let promo = promotion(STATUS_ACTIVE, 0);
        assert_eq!(effective_status(&promo, promo.ends_at), STATUS_EXPIRED);
    }

    #[test]
    fn high_visibility_set_matches_by_tier_name() {
        assert!(HIGH_VISIBILITY_TIERS.contains(&"Gold Boost"));
        assert!(HIGH_VISIBILITY_TIERS.contains(&"Platinum Boost"));
        assert!(!HIGH_VISIBILITY_TIERS.contains(&"Starter Boost"));
    }

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("connect");
        crate::db::run_migrations(&pool).await.expect("migrations");
        pool
    }

    async fn test_fixture(pool: &PgPool) -> (ManagerProfile, Uuid) {
        let station_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO stations (name, brand, latitude, longitude)
            VALUES ('Test Station', 'TestBrand', 6.5244, 3.3792)
            RETURNING id
            "#,
        )
        .fetch_one(pool)
        .await
        .expect("station");

        let profile = ManagerProfile::create(
            pool,
            crate::models::manager_profile::CreateManagerData {
                auth_user_id: format!("auth-{}", Uuid::new_v4()),
                email: format!("{}@example.com", Uuid::new_v4()),
                full_name: "Test Manager".to_string(),
                phone: None,
                station_id: Some(station_id),
            },
        )
        .await
        .expect("profile");

        (profile, station_id)
    }

    async fn tier_named(pool: &PgPool, name: &str) -> PromotionTier {
        PromotionTier::list_all(pool)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == name)
            .expect("seeded tier")
    }

    #[tokio::test]
    #[ignore] // Requires a live PostgreSQL at DATABASE_URL
    async fn activation_debits_and_creates_one_active_campaign() {
        let pool = test_pool().await;
        let notifier = Notifier::disabled();
        let (manager, station_id) = test_fixture(&pool).await;

        let wallet = Wallet::find_by_manager(&pool, manager.id)
            .await
            .unwrap()
            .unwrap();
        wallet_ledger::credit(&pool, wallet.id, 500_000, json!({}))
            .await
            .unwrap();

        let tier = tier_named(&pool, "Gold Boost").await;
        let promo = activate(&pool, &notifier, &manager, station_id, tier.id)
            .await
            .unwrap();

        assert_eq!(promo.status, STATUS_ACTIVE);
        assert_eq!(
            promo.ends_at,
            promo.starts_at + Duration::hours(tier.duration_hours as i64)
        );

        let wallet = Wallet::find_by_id(&pool, wallet.id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, 500_000 - tier.price);

        // Second activation while the first is live is rejected
        let err = activate(&pool, &notifier, &manager, station_id, tier.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ActivationError::AlreadyPromoted));
    }

    #[tokio::test]
    #[ignore] // Requires a live PostgreSQL at DATABASE_URL
    async fn underfunded_activation_changes_nothing() {
        let pool = test_pool().await;
        let notifier = Notifier::disabled();
        let (manager, station_id) = test_fixture(&pool).await;

        let wallet = Wallet::find_by_manager(&pool, manager.id)
            .await
            .unwrap()
            .unwrap();
        wallet_ledger::credit(&pool, wallet.id, 1000, json!({}))
            .await
            .unwrap();

        let tier = tier_named(&pool, "Gold Boost").await;
        let err = activate(&pool, &notifier, &manager, station_id, tier.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Ledger(LedgerError::InsufficientFunds { .. })
        ));

        let wallet = Wallet::find_by_id(&pool, wallet.id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, 1000);
        assert!(StationPromotion::find_active(&pool, station_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore] // Requires a live PostgreSQL at DATABASE_URL
    async fn counters_increment_exactly_once_per_event() {
        let pool = test_pool().await;
        let notifier = Notifier::disabled();
        let (manager, station_id) = test_fixture(&pool).await;

        let wallet = Wallet::find_by_manager(&pool, manager.id)
            .await
            .unwrap()
            .unwrap();
        wallet_ledger::credit(&pool, wallet.id, 500_000, json!({}))
            .await
            .unwrap();

        let tier = tier_named(&pool, "Starter Boost").await;
        let promo = activate(&pool, &notifier, &manager, station_id, tier.id)
            .await
            .unwrap();
        assert_eq!(promo.views, 0);
        assert_eq!(promo.clicks, 0);

        // Concurrent impressions: every increment lands, none are lost to a
        // read-then-write race
        let mut handles = Vec::new();
        for _ in 0..10 {
            let pool = pool.clone();
            let id = promo.id;
            handles.push(tokio::spawn(async move {
                StationPromotion::record_view(&pool, id).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }

        for _ in 0..3 {
            assert_eq!(
                StationPromotion::record_click(&pool, promo.id).await.unwrap(),
                1
            );
        }

        let promo = StationPromotion::find_by_id(&pool, promo.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(promo.views, 10);
        assert_eq!(promo.clicks, 3);

        // An unknown campaign id touches nothing
        assert_eq!(
            StationPromotion::record_view(&pool, Uuid::new_v4())
                .await
                .unwrap(),
            0
        );
    }
}
