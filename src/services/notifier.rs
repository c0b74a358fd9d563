//! Local shoutout fan-out for high-visibility campaigns.
//!
//! Delivery is best-effort and decoupled from billing: the shoutout is
//! posted on a detached task after the activation transaction commits, and
//! a delivery failure is only ever logged.

use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum NotifierError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Notifier API error: {0}")]
    ApiError(String),
}

#[derive(Debug, Serialize)]
struct ShoutoutRequest {
    station_id: Uuid,
    tier: String,
}

#[derive(Clone)]
pub struct Notifier {
    client: Client,
    base_url: Option<String>,
}

impl Notifier {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// A notifier with no endpoint configured; every send is a logged no-op
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub async fn send_shoutout(
        &self,
        station_id: Uuid,
        tier_name: &str,
    ) -> Result<(), NotifierError> {
        let Some(base_url) = &self.base_url else {
            tracing::debug!(station_id = %station_id, "Notifier not configured, skipping shoutout");
            return Ok(());
        };

        let url = format!("{}/shoutouts", base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&ShoutoutRequest {
                station_id,
                tier: tier_name.to_string(),
            })
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotifierError::ApiError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Fires the shoutout on a detached task. Failure is logged, never
    /// surfaced to the caller.
    pub fn spawn_shoutout(&self, station_id: Uuid, tier_name: String) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_shoutout(station_id, &tier_name).await {
                tracing::warn!(
                    station_id = %station_id,
                    tier = %tier_name,
                    error = %e,
                    "Shoutout delivery failed"
                );
            } else {
                tracing::info!(
                    station_id = %station_id,
                    tier = %tier_name,
                    "Shoutout dispatched"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn shoutout_posts_station_and_tier() {
        let server = MockServer::start().await;
        let station_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/shoutouts"))
            .and(body_json(json!({
                "station_id": station_id,
                "tier": "Gold Boost",
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(server.uri()));
        notifier
            .send_shoutout(station_id, "Gold Boost")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn server_error_is_reported_not_swallowed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/shoutouts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let notifier = Notifier::new(Some(server.uri()));
        let err = notifier
            .send_shoutout(Uuid::new_v4(), "Platinum Boost")
            .await
            .unwrap_err();

        assert!(matches!(err, NotifierError::ApiError(_)));
    }

    #[tokio::test]
    async fn unconfigured_notifier_is_a_no_op() {
        let notifier = Notifier::disabled();
        notifier
            .send_shoutout(Uuid::new_v4(), "Gold Boost")
            .await
            .unwrap();
    }
}
