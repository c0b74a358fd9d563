use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;

use crate::api::middleware::auth::load_manager_with_station;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{PriceReport, Review, Station, StationPromotion, Wallet};
use crate::services::promotion::PromotionView;
use crate::services::reputation::{self, Reputation};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard/summary", get(summary))
}

#[derive(Debug, Serialize)]
struct DashboardSummary {
    station: Station,
    reputation: Reputation,
    favourite_count: i64,
    wallet_balance: i64,
    active_promotion: Option<PromotionView>,
}

/// One-call overview for the dashboard landing page: reputation, counts,
/// wallet balance and the current campaign with its derived status.
async fn summary(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<DashboardSummary>> {
    let (manager, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    let reviews = Review::list_all_for_station(&state.pool, station_id).await?;
    let reports = PriceReport::list_all_for_station(&state.pool, station_id).await?;
    let verification_count = PriceReport::count_verifications(&state.pool, station_id).await?;

    let reputation =
        reputation::aggregate(&reviews, &reports, station.verified, verification_count);

    let favourite_count = Station::count_favourites(&state.pool, station_id).await?;

    let wallet = Wallet::find_by_manager(&state.pool, manager.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wallet not found".to_string()))?;

    let active_promotion = StationPromotion::find_active(&state.pool, station_id)
        .await?
        .map(|p| PromotionView::from_promotion(&p, Utc::now()));

    Ok(Json(DashboardSummary {
        station,
        reputation,
        favourite_count,
        wallet_balance: wallet.balance,
        active_promotion,
    }))
}
