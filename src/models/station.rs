use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Fuel products tracked per station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Pms,
    Ago,
    Dpk,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Pms => "pms",
            FuelType::Ago => "ago",
            FuelType::Dpk => "dpk",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Station {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub latitude: f64,
    pub longitude: f64,
    pub pms_price: Option<f64>,
    pub ago_price: Option<f64>,
    pub dpk_price: Option<f64>,
    pub out_of_stock: bool,
    pub verified: bool,
    pub max_daily_capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Station {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM stations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub fn price_of(&self, fuel: FuelType) -> Option<f64> {
        match fuel {
            FuelType::Pms => self.pms_price,
            FuelType::Ago => self.ago_price,
            FuelType::Dpk => self.dpk_price,
        }
    }

    /// Updates a single fuel price. Runs on a connection so the caller can
    /// group it with the matching price_logs insert in one transaction.
    pub async fn set_price(
        conn: &mut PgConnection,
        id: Uuid,
        fuel: FuelType,
        price: f64,
    ) -> Result<(), sqlx::Error> {
        let sql = match fuel {
            FuelType::Pms => {
                "UPDATE stations SET pms_price = $2, updated_at = NOW() WHERE id = $1"
            }
            FuelType::Ago => {
                "UPDATE stations SET ago_price = $2, updated_at = NOW() WHERE id = $1"
            }
            FuelType::Dpk => {
                "UPDATE stations SET dpk_price = $2, updated_at = NOW() WHERE id = $1"
            }
        };

        sqlx::query(sql).bind(id).bind(price).execute(conn).await?;
        Ok(())
    }

    pub async fn set_out_of_stock(
        pool: &PgPool,
        id: Uuid,
        out_of_stock: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE stations SET out_of_stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(out_of_stock)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_max_daily_capacity(
        pool: &PgPool,
        id: Uuid,
        litres: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE stations SET max_daily_capacity = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(litres)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// All stations other than the given one, for competitor distance checks
    pub async fn list_others(pool: &PgPool, id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM stations WHERE id != $1")
            .bind(id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_favourites(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM favourite_stations WHERE station_id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;
        Ok(count.0)
    }
}

/// Append-only record of a manager price change
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PriceLog {
    pub id: Uuid,
    pub station_id: Uuid,
    pub fuel_type: String, // "pms", "ago" or "dpk"
    pub old_price: Option<f64>,
    pub new_price: f64,
    pub changed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PriceLog {
    pub async fn append(
        conn: &mut PgConnection,
        station_id: Uuid,
        fuel: FuelType,
        old_price: Option<f64>,
        new_price: f64,
        changed_by: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO price_logs (station_id, fuel_type, old_price, new_price, changed_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(station_id)
        .bind(fuel.as_str())
        .bind(old_price)
        .bind(new_price)
        .bind(changed_by)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn list_for_station(
        pool: &PgPool,
        station_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM price_logs
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
}
