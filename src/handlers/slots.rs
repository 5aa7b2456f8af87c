use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/slots/occupied
#[derive(Deserialize)]
pub struct OccupiedQuery {
    pub employee_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

pub async fn occupied_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccupiedQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let employee_id = query.employee_id.unwrap_or(0);
    if employee_id <= 0 {
        return Err(AppError::InvalidInput(
            "missing or invalid employee_id".to_string(),
        ));
    }

    let date = query.date.unwrap_or_else(|| Local::now().date_naive());

    let slots = {
        let db = state.db.lock().unwrap();
        queries::occupied_slots(&db, employee_id, date)?
    };

    Ok(Json(serde_json::json!({ "success": true, "data": slots })))
}
