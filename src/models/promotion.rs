use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Read-only promotion catalog entry (price in kobo)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromotionTier {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub duration_hours: i32,
    pub features: JsonValue,
}

impl PromotionTier {
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM promotion_tiers ORDER BY price")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM promotion_tiers WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}

/// An activated, time-bounded visibility boost for a station.
///
/// The stored status never transitions to "expired" by a background write;
/// expiry is derived from ends_at at read time (see services::promotion).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StationPromotion {
    pub id: Uuid,
    pub station_id: Uuid,
    pub tier_id: Uuid,
    pub activated_by: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub views: i64,
    pub clicks: i64,
    pub status: String, // "active", "expired" or "cancelled"
    pub created_at: DateTime<Utc>,
}

impl StationPromotion {
    pub async fn insert(
        conn: &mut PgConnection,
        station_id: Uuid,
        tier_id: Uuid,
        activated_by: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO station_promotions
                (station_id, tier_id, activated_by, starts_at, ends_at, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING *
            "#,
        )
        .bind(station_id)
        .bind(tier_id)
        .bind(activated_by)
        .bind(starts_at)
        .bind(ends_at)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM station_promotions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The station's current campaign: stored-active and not yet past ends_at
    pub async fn find_active(
        pool: &PgPool,
        station_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM station_promotions
            WHERE station_id = $1 AND status = 'active' AND ends_at > NOW()
            "#,
        )
        .bind(station_id)
        .fetch_optional(pool)
        .await
    }

    /// Any row still stored as active, including ones past ends_at. Used by
    /// activation to supersede a lapsed campaign inside its transaction.
    pub async fn find_stored_active(
        conn: &mut PgConnection,
        station_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM station_promotions WHERE station_id = $1 AND status = 'active' FOR UPDATE",
        )
        .bind(station_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn list_for_station(
        pool: &PgPool,
        station_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM station_promotions
            WHERE station_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(station_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Marks a stored-active row expired. Only called when activation
    /// supersedes a campaign whose ends_at has already passed.
    pub async fn mark_expired(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE station_promotions SET status = 'expired' WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// active -> cancelled; affects zero rows if the campaign was not active
    pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE station_promotions SET status = 'cancelled' WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Single-statement increment so concurrent impressions never
    /// undercount; affects zero rows for an unknown campaign id
    pub async fn record_view(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE station_promotions SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn record_click(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE station_promotions SET clicks = clicks + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
