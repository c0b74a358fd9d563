use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::load_manager_with_station;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{PromotionTier, StationPromotion};
use crate::services::promotion::{self, PromotionView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/promotions/tiers", get(list_tiers))
        .route("/promotions", get(list_campaigns))
        .route("/promotions/active", get(active_campaign))
        .route("/promotions/activate", post(activate))
        .route("/promotions/:id/cancel", post(cancel))
        // Impression/click events come from the driver-facing surface and
        // carry no manager session
        .route("/promotions/:id/view", post(record_view))
        .route("/promotions/:id/click", post(record_click))
}

async fn list_tiers(State(state): State<AppState>) -> Result<Json<Vec<PromotionTier>>> {
    let tiers = PromotionTier::list_all(&state.pool).await?;
    Ok(Json(tiers))
}

async fn list_campaigns(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PromotionView>>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let now = Utc::now();
    let campaigns = StationPromotion::list_for_station(&state.pool, station_id, 50).await?;
    let views = campaigns
        .iter()
        .map(|p| PromotionView::from_promotion(p, now))
        .collect();

    Ok(Json(views))
}

async fn active_campaign(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Option<PromotionView>>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let now = Utc::now();
    let active = StationPromotion::find_active(&state.pool, station_id)
        .await?
        .map(|p| PromotionView::from_promotion(&p, now));

    Ok(Json(active))
}

#[derive(Debug, Deserialize)]
struct ActivateRequest {
    tier_id: Uuid,
}

async fn activate(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<PromotionView>> {
    let (manager, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let promotion = promotion::activate(
        &state.pool,
        &state.notifier,
        &manager,
        station_id,
        req.tier_id,
    )
    .await?;

    Ok(Json(PromotionView::from_promotion(&promotion, Utc::now())))
}

async fn cancel(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<PromotionView>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let promotion = StationPromotion::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.station_id == station_id)
        .ok_or_else(|| AppError::NotFound("Promotion not found".to_string()))?;

    let cancelled = StationPromotion::cancel(&state.pool, promotion.id).await?;
    if cancelled == 0 {
        return Err(AppError::Conflict(
            "Promotion is no longer active".to_string(),
        ));
    }

    tracing::info!(promotion_id = %promotion.id, station_id = %station_id, "Promotion cancelled");

    let promotion = StationPromotion::find_by_id(&state.pool, promotion.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Promotion not found".to_string()))?;

    Ok(Json(PromotionView::from_promotion(&promotion, Utc::now())))
}

async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let updated = StationPromotion::record_view(&state.pool, id).await?;
    if updated == 0 {
        return Err(AppError::NotFound("Promotion not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "recorded": true })))
}

async fn record_click(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let updated = StationPromotion::record_click(&state.pool, id).await?;
    if updated == 0 {
        return Err(AppError::NotFound("Promotion not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "recorded": true })))
}
