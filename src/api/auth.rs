use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::load_manager;
use crate::api::middleware::session::{AppState, SESSION_KEY_MANAGER_ID};
use crate::error::{AppError, Result};
use crate::models::ManagerProfile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/me", get(me))
        .route("/profile/notifications", put(update_notifications))
}

#[derive(Debug, Deserialize)]
struct SigninRequest {
    /// Opaque identity from the upstream auth provider. Credential
    /// verification happens there; this service only maps the identity to
    /// a manager profile.
    auth_user_id: String,
}

async fn signin(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SigninRequest>,
) -> Result<Json<ManagerProfile>> {
    let profile = ManagerProfile::find_by_auth_user_id(&state.pool, &req.auth_user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    session
        .insert(SESSION_KEY_MANAGER_ID, profile.id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?;

    tracing::info!(manager_id = %profile.id, "Manager signed in");

    Ok(Json(profile))
}

async fn signout(session: Session) -> Result<Json<serde_json::Value>> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session error: {}", e)))?;

    Ok(Json(serde_json::json!({ "signed_out": true })))
}

async fn me(State(state): State<AppState>, session: Session) -> Result<Json<ManagerProfile>> {
    let profile = load_manager(&state.pool, &session).await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
struct NotificationPrefsRequest {
    notify_price_reports: bool,
    notify_reviews: bool,
}

async fn update_notifications(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<NotificationPrefsRequest>,
) -> Result<Json<ManagerProfile>> {
    let profile = load_manager(&state.pool, &session).await?;

    ManagerProfile::update_notification_prefs(
        &state.pool,
        profile.id,
        req.notify_price_reports,
        req.notify_reviews,
    )
    .await?;

    let profile = ManagerProfile::find_by_id(&state.pool, profile.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Manager profile not found".to_string()))?;

    Ok(Json(profile))
}
