use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use url::Url;

use crate::api::middleware::auth::load_manager;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{PaymentIntent, Wallet, WalletTransaction};
use crate::services::{paystack, wallet_ledger};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/transactions", get(list_transactions))
        .route("/wallet/fund", post(fund_wallet))
        .route("/payments/callback", get(payment_callback))
}

async fn get_wallet(State(state): State<AppState>, session: Session) -> Result<Json<Wallet>> {
    let manager = load_manager(&state.pool, &session).await?;

    let wallet = Wallet::find_by_manager(&state.pool, manager.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wallet not found".to_string()))?;

    Ok(Json(wallet))
}

async fn list_transactions(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<WalletTransaction>>> {
    let manager = load_manager(&state.pool, &session).await?;

    let wallet = Wallet::find_by_manager(&state.pool, manager.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wallet not found".to_string()))?;

    let transactions = WalletTransaction::list_for_wallet(&state.pool, wallet.id, 50).await?;
    Ok(Json(transactions))
}

#[derive(Debug, Deserialize)]
struct FundRequest {
    /// Amount in kobo
    amount: i64,
}

/// Starts a wallet top-up: initializes a gateway transaction and records a
/// pending payment intent keyed by the gateway reference. The manager
/// completes the charge at the returned authorization URL.
async fn fund_wallet(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<FundRequest>,
) -> Result<Json<serde_json::Value>> {
    let manager = load_manager(&state.pool, &session).await?;

    if req.amount <= 0 {
        return Err(AppError::Validation(
            "Amount must be positive".to_string(),
        ));
    }

    let wallet = Wallet::find_by_manager(&state.pool, manager.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wallet not found".to_string()))?;

    let callback_url = format!("{}/payments/callback", state.config.base_url);

    let init = paystack::initialize_transaction(
        &state.config.paystack_base_url,
        state.config.paystack_secret_key.expose_secret(),
        &manager.email,
        req.amount,
        &callback_url,
        json!({ "wallet_id": wallet.id, "manager_id": manager.id }),
    )
    .await
    .map_err(|e| AppError::ExternalService(e.to_string()))?;

    PaymentIntent::create(&state.pool, wallet.id, &init.reference, req.amount).await?;

    tracing::info!(
        wallet_id = %wallet.id,
        amount = req.amount,
        reference = %init.reference,
        "Wallet funding initialized"
    );

    Ok(Json(json!({
        "authorization_url": init.authorization_url,
        "reference": init.reference,
    })))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    reference: Option<String>,
}

fn dashboard_redirect(base_url: &str, status: &str, message: Option<&str>) -> Redirect {
    let fallback = format!("{}/dashboard?status={}", base_url, status);

    let url = Url::parse(base_url)
        .and_then(|base| base.join("/dashboard"))
        .map(|mut url| {
            url.query_pairs_mut().append_pair("status", status);
            if let Some(msg) = message {
                url.query_pairs_mut().append_pair("message", msg);
            }
            url.to_string()
        })
        .unwrap_or(fallback);

    Redirect::to(&url)
}

/// Gateway return URL. Verifies the reference, settles the intent exactly
/// once and credits the wallet, then always redirects to the dashboard
/// with a status query parameter; errors surface as a redirect, never as
/// an error page.
async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let base_url = &state.config.base_url;

    let Some(reference) = query.reference else {
        return dashboard_redirect(base_url, "error", Some("Missing payment reference"));
    };

    match settle_payment(&state, &reference).await {
        Ok(Settlement::Credited) | Ok(Settlement::AlreadySettled) => {
            dashboard_redirect(base_url, "success", None)
        }
        Ok(Settlement::Declined) => {
            dashboard_redirect(base_url, "failed", Some("Payment was not successful"))
        }
        Err(e) => {
            tracing::error!(reference = %reference, error = %e, "Payment settlement failed");
            dashboard_redirect(base_url, "error", Some("Payment verification failed"))
        }
    }
}

enum Settlement {
    Credited,
    AlreadySettled,
    Declined,
}

async fn settle_payment(state: &AppState, reference: &str) -> Result<Settlement> {
    let intent = PaymentIntent::find_by_reference(&state.pool, reference)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown payment reference".to_string()))?;

    if intent.status == "success" {
        // Replayed callback; the wallet was already credited
        return Ok(Settlement::AlreadySettled);
    }

    let verified = paystack::verify_transaction(
        &state.config.paystack_base_url,
        state.config.paystack_secret_key.expose_secret(),
        reference,
    )
    .await
    .map_err(|e| AppError::ExternalService(e.to_string()))?;

    if !verified.is_success() {
        PaymentIntent::mark_failed(&state.pool, intent.id).await?;
        return Ok(Settlement::Declined);
    }

    if verified.amount != intent.amount {
        tracing::warn!(
            reference = %reference,
            expected = intent.amount,
            charged = verified.amount,
            "Charged amount does not match the payment intent"
        );
        PaymentIntent::mark_failed(&state.pool, intent.id).await?;
        return Err(AppError::ExternalService(
            "Charged amount does not match the initialized amount".to_string(),
        ));
    }

    // Settle and credit in one transaction; the conditional settlement
    // update makes a concurrent replay a no-op
    let mut tx = state.pool.begin().await?;
    let settled = PaymentIntent::mark_success(&mut tx, intent.id).await?;
    if settled == 0 {
        tx.rollback().await?;
        return Ok(Settlement::AlreadySettled);
    }

    wallet_ledger::credit_on(
        &mut tx,
        intent.wallet_id,
        intent.amount,
        json!({
            "payment_reference": reference,
            "channel": verified.channel,
        }),
    )
    .await
    .map_err(AppError::from)?;

    tx.commit().await?;

    tracing::info!(
        reference = %reference,
        wallet_id = %intent.wallet_id,
        amount = intent.amount,
        "Wallet top-up settled"
    );

    Ok(Settlement::Credited)
}
