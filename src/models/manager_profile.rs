use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManagerProfile {
    pub id: Uuid,
    pub auth_user_id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub verification_status: String, // "pending", "verified" or "rejected"
    pub station_id: Option<Uuid>,
    pub notify_price_reports: bool,
    pub notify_reviews: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateManagerData {
    pub auth_user_id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub station_id: Option<Uuid>,
}

impl ManagerProfile {
    /// Creates a profile at registration, together with its empty wallet
    pub async fn create(pool: &PgPool, data: CreateManagerData) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO manager_profiles (auth_user_id, email, full_name, phone, station_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.auth_user_id)
        .bind(&data.email)
        .bind(&data.full_name)
        .bind(&data.phone)
        .bind(data.station_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO wallets (manager_id) VALUES ($1)")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(profile)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM manager_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_auth_user_id(
        pool: &PgPool,
        auth_user_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM manager_profiles WHERE auth_user_id = $1")
            .bind(auth_user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_notification_prefs(
        pool: &PgPool,
        id: Uuid,
        notify_price_reports: bool,
        notify_reviews: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE manager_profiles
            SET notify_price_reports = $2, notify_reviews = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(notify_price_reports)
        .bind(notify_reviews)
        .execute(pool)
        .await?;
        Ok(())
    }
}
