use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A gateway transaction that was initialized and is awaiting callback
/// settlement. The pending -> success transition happens at most once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub reference: String,
    pub amount: i64,
    pub status: String, // "pending", "success" or "failed"
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl PaymentIntent {
    pub async fn create(
        pool: &PgPool,
        wallet_id: Uuid,
        reference: &str,
        amount: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO payment_intents (wallet_id, reference, amount)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(wallet_id)
        .bind(reference)
        .bind(amount)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_reference(
        pool: &PgPool,
        reference: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM payment_intents WHERE reference = $1")
            .bind(reference)
            .fetch_optional(pool)
            .await
    }

    /// Conditional settlement guard: affects zero rows unless still pending,
    /// so a replayed callback cannot credit the wallet twice.
    pub async fn mark_success(
        conn: &mut sqlx::PgConnection,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = 'success', settled_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_failed(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = 'failed', settled_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
