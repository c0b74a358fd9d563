use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Driver-submitted price/availability observation. Immutable once created
/// except for the manager_response field.
///
/// meter_accuracy encodes the driver's pump check: 100 means the pump meter
/// matched the dispensed volume, any other value is a failed check, and null
/// means the driver did not check.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceReport {
    pub id: Uuid,
    pub station_id: Uuid,
    pub user_ref: String,
    pub fuel_type: String, // "pms", "ago" or "dpk"
    pub reported_price: f64,
    pub available: bool,
    pub meter_accuracy: Option<i32>,
    pub notes: Option<String>,
    pub manager_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PriceReport {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM price_reports WHERE id = $1")
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
            SELECT * FROM price_reports
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

    pub async fn list_all_for_station(
        pool: &PgPool,
        station_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM price_reports WHERE station_id = $1")
            .bind(station_id)
            .fetch_all(pool)
            .await
    }

    /// Count of reports where the driver ran the pump check and it passed
    pub async fn count_verifications(
        pool: &PgPool,
        station_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM price_reports WHERE station_id = $1 AND meter_accuracy = 100",
        )
        .bind(station_id)
        .fetch_one(pool)
        .await?;
        Ok(count.0)
    }

    pub async fn set_response(
        pool: &PgPool,
        id: Uuid,
        response: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE price_reports SET manager_response = $2 WHERE id = $1")
            .bind(id)
            .bind(response)
            .execute(pool)
            .await?;
        Ok(())
    }
}
