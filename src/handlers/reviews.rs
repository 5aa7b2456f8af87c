use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::reviews;
use crate::state::AppState;

// POST /api/reviews
#[derive(Deserialize)]
pub struct SubmitReviewRequest {
    pub booking_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub feedback: Option<String>,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitReviewRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.accounts.account_exists(body.user_id).await? {
        return Err(AppError::InvalidInput("unknown user account".to_string()));
    }

    {
        let db = state.db.lock().unwrap();
        reviews::submit_review(
            &db,
            body.booking_id,
            body.user_id,
            body.rating,
            body.feedback.as_deref(),
        )?;
    }

    Ok(Json(
        serde_json::json!({ "success": true, "message": "review saved" }),
    ))
}

// GET /api/reviews/booking/:booking_id
#[derive(Serialize)]
pub struct ReviewResponse {
    rating: i32,
    feedback: Option<String>,
}

pub async fn get_review_by_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let review = {
        let db = state.db.lock().unwrap();
        queries::get_review_by_booking(&db, booking_id)?
    }
    .ok_or_else(|| AppError::NotFound("no review found for this booking".to_string()))?;

    let response = ReviewResponse {
        rating: review.rating,
        feedback: review.feedback,
    };
    Ok(Json(
        serde_json::json!({ "success": true, "data": response }),
    ))
}

// GET /api/reviews/service/:service_id
#[derive(Serialize)]
pub struct ServiceReviewResponse {
    rating: i32,
    feedback: Option<String>,
    name: String,
}

pub async fn get_reviews_by_service(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reviews = {
        let db = state.db.lock().unwrap();
        queries::get_reviews_for_service(&db, service_id)?
    };

    let response: Vec<ServiceReviewResponse> = reviews
        .into_iter()
        .map(|r| ServiceReviewResponse {
            rating: r.rating,
            feedback: r.feedback,
            name: r.reviewer_name,
        })
        .collect();

    Ok(Json(
        serde_json::json!({ "success": true, "data": response }),
    ))
}
