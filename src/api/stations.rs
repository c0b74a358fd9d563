use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::load_manager_with_station;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::station::{FuelType, PriceLog};
use crate::models::Station;
use crate::services::geo::{self, NearbyStation};

/// Upper bound for a plausible pump price (naira per litre)
const MAX_PRICE_PER_LITRE: f64 = 10_000.0;

const DEFAULT_NEARBY_RADIUS_KM: f64 = 5.0;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/station", get(get_station))
        .route("/station/prices", put(update_prices))
        .route("/station/stock", post(set_stock))
        .route("/station/capacity", put(set_capacity))
        .route("/station/nearby", get(nearby))
        .route("/station/price-logs", get(price_logs))
}

async fn get_station(State(state): State<AppState>, session: Session) -> Result<Json<Station>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(Json(station))
}

#[derive(Debug, Deserialize)]
struct UpdatePricesRequest {
    pms: Option<f64>,
    ago: Option<f64>,
    dpk: Option<f64>,
}

fn validate_price(fuel: FuelType, price: f64) -> Result<f64> {
    if !price.is_finite() {
        return Err(AppError::Validation(format!(
            "{} price must be a number",
            fuel.as_str()
        )));
    }
    if price <= 0.0 || price > MAX_PRICE_PER_LITRE {
        return Err(AppError::Validation(format!(
            "{} price must be between 0 and {}",
            fuel.as_str(),
            MAX_PRICE_PER_LITRE
        )));
    }
    Ok(price)
}

/// Updates the provided fuel prices and appends one price_logs row per
/// change, in a single transaction. Concurrent updates from two sessions
/// are last-write-wins; there is no version check.
async fn update_prices(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<UpdatePricesRequest>,
) -> Result<Json<Station>> {
    let (manager, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let changes: Vec<(FuelType, f64)> = [
        (FuelType::Pms, req.pms),
        (FuelType::Ago, req.ago),
        (FuelType::Dpk, req.dpk),
    ]
    .into_iter()
    .filter_map(|(fuel, price)| price.map(|p| (fuel, p)))
    .collect();

    if changes.is_empty() {
        return Err(AppError::Validation(
            "At least one fuel price must be provided".to_string(),
        ));
    }

    // Validate everything before the first write
    let changes: Vec<(FuelType, f64)> = changes
        .into_iter()
        .map(|(fuel, price)| validate_price(fuel, price).map(|p| (fuel, p)))
        .collect::<Result<_>>()?;

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    let mut tx = state.pool.begin().await?;
    for (fuel, price) in &changes {
        let old_price = station.price_of(*fuel);
        Station::set_price(&mut tx, station_id, *fuel, *price).await?;
        PriceLog::append(&mut tx, station_id, *fuel, old_price, *price, manager.id).await?;
    }
    tx.commit().await?;

    tracing::info!(
        station_id = %station_id,
        manager_id = %manager.id,
        changed = changes.len(),
        "Fuel prices updated"
    );

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(Json(station))
}

#[derive(Debug, Deserialize)]
struct SetStockRequest {
    out_of_stock: bool,
}

async fn set_stock(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SetStockRequest>,
) -> Result<Json<Station>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    Station::set_out_of_stock(&state.pool, station_id, req.out_of_stock).await?;

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(Json(station))
}

#[derive(Debug, Deserialize)]
struct SetCapacityRequest {
    litres: i32,
}

async fn set_capacity(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<SetCapacityRequest>,
) -> Result<Json<Station>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    if req.litres <= 0 || req.litres > 1_000_000 {
        return Err(AppError::Validation(
            "Capacity must be between 1 and 1,000,000 litres".to_string(),
        ));
    }

    Station::set_max_daily_capacity(&state.pool, station_id, req.litres).await?;

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(Json(station))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    radius_km: Option<f64>,
}

async fn nearby(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyStation>>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let radius_km = query.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > 500.0 {
        return Err(AppError::Validation(
            "radius_km must be between 0 and 500".to_string(),
        ));
    }

    let station = Station::find_by_id(&state.pool, station_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;
    let others = Station::list_others(&state.pool, station_id).await?;

    Ok(Json(geo::nearby_competitors(&station, others, radius_km)))
}

async fn price_logs(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PriceLog>>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let logs = PriceLog::list_for_station(&state.pool, station_id, 50).await?;
    Ok(Json(logs))
}
