use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::load_manager_with_station;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::{PriceReport, Review};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/station/reviews", get(list_reviews))
        .route("/station/reports", get(list_reports))
        .route("/reviews/:id/response", post(respond_to_review))
        .route("/reports/:id/response", post(respond_to_report))
}

async fn list_reviews(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Review>>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let reviews = Review::list_for_station(&state.pool, station_id, 50).await?;
    Ok(Json(reviews))
}

async fn list_reports(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PriceReport>>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;

    let reports = PriceReport::list_for_station(&state.pool, station_id, 50).await?;
    Ok(Json(reports))
}

#[derive(Debug, Deserialize)]
struct ResponseRequest {
    text: String,
}

fn validate_response(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Response cannot be empty".to_string()));
    }
    if trimmed.len() > 2000 {
        return Err(AppError::Validation(
            "Response cannot exceed 2000 characters".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Sets the manager response on a review. The response is the only mutable
/// field on a review; ownership is checked against the manager's station.
async fn respond_to_review(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<ResponseRequest>,
) -> Result<Json<Review>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;
    let text = validate_response(&req.text)?;

    let review = Review::find_by_id(&state.pool, id)
        .await?
        .filter(|r| r.station_id == station_id)
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    Review::set_response(&state.pool, review.id, text).await?;

    let review = Review::find_by_id(&state.pool, review.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    Ok(Json(review))
}

async fn respond_to_report(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<ResponseRequest>,
) -> Result<Json<PriceReport>> {
    let (_, station_id) = load_manager_with_station(&state.pool, &session).await?;
    let text = validate_response(&req.text)?;

    let report = PriceReport::find_by_id(&state.pool, id)
        .await?
        .filter(|r| r.station_id == station_id)
        .ok_or_else(|| AppError::NotFound("Price report not found".to_string()))?;

    PriceReport::set_response(&state.pool, report.id, text).await?;

    let report = PriceReport::find_by_id(&state.pool, report.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Price report not found".to_string()))?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_responses_are_rejected() {
        assert!(validate_response("").is_err());
        assert!(validate_response("   ").is_err());
    }

    #[test]
    fn oversized_responses_are_rejected() {
        let long = "x".repeat(2001);
        assert!(validate_response(&long).is_err());
    }

    #[test]
    fn responses_are_trimmed() {
        assert_eq!(validate_response("  thanks  ").unwrap(), "thanks");
    }
}
