use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Driver-submitted star rating. Immutable once created except for the
/// manager_response field.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub station_id: Uuid,
    pub user_ref: String,
    pub rating: i32,
    pub meter_accuracy: Option<i32>,
    pub comment: Option<String>,
    pub manager_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_station(
        pool: &PgPool,
        station_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM reviews
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

    /// All reviews for a station, for reputation aggregation
    pub async fn list_all_for_station(
        pool: &PgPool,
        station_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM reviews WHERE station_id = $1")
            .bind(station_id)
            .fetch_all(pool)
            .await
    }

    pub async fn set_response(
        pool: &PgPool,
        id: Uuid,
        response: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE reviews SET manager_response = $2 WHERE id = $1")
            .bind(id)
            .bind(response)
            .execute(pool)
            .await?;
        Ok(())
    }
}
