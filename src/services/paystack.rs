//! Paystack payment gateway client.
//!
//! Only the initialize/verify operation pair is used: the dashboard sends
//! the manager to the returned authorization URL, and the callback route
//! verifies the reference before crediting the wallet. Amounts are in kobo
//! throughout, matching the gateway.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(thiserror::Error, Debug)]
pub enum PaystackError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Paystack API error: {0}")]
    ApiError(String),
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    amount: i64,
    callback_url: &'a str,
    metadata: JsonValue,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifiedTransaction {
    /// Gateway-side outcome: "success", "failed" or "abandoned"
    pub status: String,
    pub amount: i64,
    pub channel: Option<String>,
}

impl VerifiedTransaction {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Initializes a gateway transaction and returns the authorization URL the
/// manager must be redirected to, plus the reference to verify later.
#[tracing::instrument(skip(base_url, secret_key, metadata))]
pub async fn initialize_transaction(
    base_url: &str,
    secret_key: &str,
    email: &str,
    amount: i64,
    callback_url: &str,
    metadata: JsonValue,
) -> Result<InitializedTransaction, PaystackError> {
    let client = Client::new();
    let url = format!("{}/transaction/initialize", base_url.trim_end_matches('/'));

    let response = client
        .post(&url)
        .bearer_auth(secret_key)
        .json(&InitializeRequest {
            email,
            amount,
            callback_url,
            metadata,
        })
        .timeout(std::time::Duration::from_secs(15))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(status = %status, error = %body, "Paystack initialize failed");
        return Err(PaystackError::ApiError(format!(
            "Status {}: {}",
            status, body
        )));
    }

    let envelope: ApiEnvelope<InitializedTransaction> = response
        .json()
        .await
        .map_err(|e| PaystackError::ApiError(format!("Failed to parse response: {}", e)))?;

    if !envelope.status {
        return Err(PaystackError::ApiError(
            envelope
                .message
                .unwrap_or_else(|| "Initialization rejected".to_string()),
        ));
    }

    let data = envelope
        .data
        .ok_or_else(|| PaystackError::ApiError("Response missing data".to_string()))?;

    tracing::info!(reference = %data.reference, "Paystack transaction initialized");

    Ok(data)
}

/// Verifies a transaction by reference. A declined payment is an Ok result
/// with a non-success status; only transport and envelope problems are Err.
#[tracing::instrument(skip(base_url, secret_key))]
pub async fn verify_transaction(
    base_url: &str,
    secret_key: &str,
    reference: &str,
) -> Result<VerifiedTransaction, PaystackError> {
    let client = Client::new();
    let url = format!(
        "{}/transaction/verify/{}",
        base_url.trim_end_matches('/'),
        reference
    );

    let response = client
        .get(&url)
        .bearer_auth(secret_key)
        .timeout(std::time::Duration::from_secs(15))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!(status = %status, error = %body, "Paystack verify failed");
        return Err(PaystackError::ApiError(format!(
            "Status {}: {}",
            status, body
        )));
    }

    let envelope: ApiEnvelope<VerifiedTransaction> = response
        .json()
        .await
        .map_err(|e| PaystackError::ApiError(format!("Failed to parse response: {}", e)))?;

    if !envelope.status {
        return Err(PaystackError::ApiError(
            envelope
                .message
                .unwrap_or_else(|| "Verification rejected".to_string()),
        ));
    }

    let data = envelope
        .data
        .ok_or_else(|| PaystackError::ApiError("Response missing data".to_string()))?;

    tracing::info!(
        reference = %reference,
        status = %data.status,
        amount = data.amount,
        "Paystack transaction verified"
    );

    Ok(data)
}
