//! Wallet ledger operations.
//!
//! Invariant: a wallet's balance equals the sum of its transaction amounts
//! after every committed operation, and never goes negative. Both writes
//! (balance update, ledger append) happen in one database transaction, and
//! the debit funds check is a single conditional UPDATE rather than a
//! read-then-write.

use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Wallet, WalletTransaction};

pub const TX_TYPE_DEPOSIT: &str = "deposit";
pub const TX_TYPE_SPENDING: &str = "spending";

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Wallet not found")]
    WalletNotFound,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Database(e) => AppError::Database(e),
            LedgerError::NonPositiveAmount(n) => {
                AppError::Validation(format!("Amount must be positive, got {}", n))
            }
            LedgerError::WalletNotFound => AppError::NotFound("Wallet not found".to_string()),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => AppError::InsufficientFunds {
                required,
                available,
            },
        }
    }
}

/// Outcome of a committed ledger operation
#[derive(Debug)]
pub struct LedgerEntry {
    pub transaction: WalletTransaction,
    pub new_balance: i64,
}

/// Credit on an already-open transaction, so callers (payment settlement)
/// can group it with their own writes.
pub async fn credit_on(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    amount: i64,
    metadata: JsonValue,
) -> Result<LedgerEntry, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }

    let new_balance = Wallet::apply_credit(conn, wallet_id, amount)
        .await?
        .ok_or(LedgerError::WalletNotFound)?;

    let transaction =
        WalletTransaction::append(conn, wallet_id, amount, TX_TYPE_DEPOSIT, metadata).await?;

    Ok(LedgerEntry {
        transaction,
        new_balance,
    })
}

/// Debit on an already-open transaction, so promotion activation can make
/// the debit and the promotion insert succeed or fail together.
pub async fn debit_on(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    amount: i64,
    metadata: JsonValue,
) -> Result<LedgerEntry, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount(amount));
    }

    let new_balance = match Wallet::apply_debit(conn, wallet_id, amount).await? {
        Some(balance) => balance,
        None => {
            // Either the wallet is missing or the balance was short; the
            // second read is only for the error report
            let available = Wallet::find_balance(conn, wallet_id)
                .await?
                .ok_or(LedgerError::WalletNotFound)?;
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available,
            });
        }
    };

    let transaction =
        WalletTransaction::append(conn, wallet_id, -amount, TX_TYPE_SPENDING, metadata).await?;

    Ok(LedgerEntry {
        transaction,
        new_balance,
    })
}

#[tracing::instrument(skip(pool, metadata))]
pub async fn credit(
    pool: &PgPool,
    wallet_id: Uuid,
    amount: i64,
    metadata: JsonValue,
) -> Result<LedgerEntry, LedgerError> {
    let mut tx = pool.begin().await?;
    let entry = credit_on(&mut tx, wallet_id, amount, metadata).await?;
    tx.commit().await?;

    tracing::info!(
        wallet_id = %wallet_id,
        amount = amount,
        new_balance = entry.new_balance,
        "Wallet credited"
    );

    Ok(entry)
}

#[tracing::instrument(skip(pool, metadata))]
pub async fn debit(
    pool: &PgPool,
    wallet_id: Uuid,
    amount: i64,
    metadata: JsonValue,
) -> Result<LedgerEntry, LedgerError> {
    let mut tx = pool.begin().await?;
    let entry = debit_on(&mut tx, wallet_id, amount, metadata).await?;
    tx.commit().await?;

    tracing::info!(
        wallet_id = %wallet_id,
        amount = amount,
        new_balance = entry.new_balance,
        "Wallet debited"
    );

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("connect");
        crate::db::run_migrations(&pool).await.expect("migrations");
        pool
    }

    async fn test_wallet(pool: &PgPool) -> Wallet {
        let profile = crate::models::ManagerProfile::create(
            pool,
            crate::models::manager_profile::CreateManagerData {
                auth_user_id: format!("auth-{}", Uuid::new_v4()),
                email: format!("{}@example.com", Uuid::new_v4()),
                full_name: "Test Manager".to_string(),
                phone: None,
                station_id: None,
            },
        )
        .await
        .expect("create profile");

        Wallet::find_by_manager(pool, profile.id)
            .await
            .expect("query")
            .expect("wallet created with profile")
    }

    #[test]
    fn insufficient_funds_maps_to_payment_required() {
        let err: AppError = LedgerError::InsufficientFunds {
            required: 2000,
            available: 1000,
        }
        .into();

        assert!(matches!(
            err,
            AppError::InsufficientFunds {
                required: 2000,
                available: 1000
            }
        ));
    }

    #[test]
    fn non_positive_amount_maps_to_validation_error() {
        let err: AppError = LedgerError::NonPositiveAmount(0).into();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    #[ignore] // Requires a live PostgreSQL at DATABASE_URL
    async fn balance_always_equals_ledger_sum() {
        let pool = test_pool().await;
        let wallet = test_wallet(&pool).await;

        credit(&pool, wallet.id, 5000, json!({})).await.unwrap();
        credit(&pool, wallet.id, 1500, json!({})).await.unwrap();
        debit(&pool, wallet.id, 2000, json!({})).await.unwrap();

        let wallet = Wallet::find_by_id(&pool, wallet.id).await.unwrap().unwrap();
        let sum = WalletTransaction::sum_for_wallet(&pool, wallet.id)
            .await
            .unwrap();

        assert_eq!(wallet.balance, 4500);
        assert_eq!(wallet.balance, sum);
    }

    #[tokio::test]
    #[ignore] // Requires a live PostgreSQL at DATABASE_URL
    async fn overdraft_leaves_wallet_and_ledger_untouched() {
        let pool = test_pool().await;
        let wallet = test_wallet(&pool).await;

        credit(&pool, wallet.id, 1000, json!({})).await.unwrap();

        let err = debit(&pool, wallet.id, 2000, json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                required: 2000,
                available: 1000
            }
        ));

        let wallet = Wallet::find_by_id(&pool, wallet.id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, 1000);

        let txs = WalletTransaction::list_for_wallet(&pool, wallet.id, 50)
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires a live PostgreSQL at DATABASE_URL
    async fn credit_then_debit_round_trips() {
        let pool = test_pool().await;
        let wallet = test_wallet(&pool).await;

        let before = wallet.balance;
        credit(&pool, wallet.id, 3000, json!({})).await.unwrap();
        let entry = debit(&pool, wallet.id, 3000, json!({})).await.unwrap();

        assert_eq!(entry.new_balance, before);
        assert_eq!(entry.transaction.amount, -3000);
        assert_eq!(entry.transaction.tx_type, TX_TYPE_SPENDING);
    }
}
