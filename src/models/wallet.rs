use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// One prepaid balance per manager. Balance is kept in kobo and is
/// guaranteed non-negative after every committed operation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM wallets WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_manager(
        pool: &PgPool,
        manager_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM wallets WHERE manager_id = $1")
            .bind(manager_id)
            .fetch_optional(pool)
            .await
    }

    /// Row-locked lookup for use inside a multi-write transaction
    pub async fn find_by_manager_for_update(
        conn: &mut PgConnection,
        manager_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM wallets WHERE manager_id = $1 FOR UPDATE")
            .bind(manager_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_balance(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT balance FROM wallets WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Unconditional balance increase, for deposits. Returns the new balance,
    /// or None if the wallet does not exist.
    pub async fn apply_credit(
        conn: &mut PgConnection,
        id: Uuid,
        amount: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE wallets
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(conn)
        .await
    }

    /// Conditional balance decrease. Matches zero rows when the balance is
    /// short, so check-and-update is a single atomic statement and two
    /// concurrent debits can never both pass the funds check.
    pub async fn apply_debit(
        conn: &mut PgConnection,
        id: Uuid,
        amount: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE wallets
            SET balance = balance - $2, updated_at = NOW()
            WHERE id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(conn)
        .await
    }
}

/// Immutable ledger entry. Positive amount is a deposit, negative a spend.
/// Rows are append-only; the wallet balance always equals their sum.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub tx_type: String, // "deposit" or "spending"
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub async fn append(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        amount: i64,
        tx_type: &str,
        metadata: JsonValue,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO wallet_transactions (wallet_id, amount, tx_type, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(wallet_id)
        .bind(amount)
        .bind(tx_type)
        .bind(metadata)
        .fetch_one(conn)
        .await
    }

    pub async fn list_for_wallet(
        pool: &PgPool,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Sum of all ledger amounts for a wallet; must equal the wallet balance
    pub async fn sum_for_wallet(pool: &PgPool, wallet_id: Uuid) -> Result<i64, sqlx::Error> {
        let sum: (Option<i64>,) = sqlx::query_as(
            "SELECT SUM(amount)::BIGINT FROM wallet_transactions WHERE wallet_id = $1",
        )
        .bind(wallet_id)
        .fetch_one(pool)
        .await?;
        Ok(sum.0.unwrap_or(0))
    }
}
