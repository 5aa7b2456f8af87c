use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingDetail};
use crate::errors::AppError;
use crate::models::{AddOn, BookingStatus, NewBooking};
use crate::services::booking::{self, Requester};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    id: i64,
    user_id: i64,
    service_id: i64,
    employee_id: Option<i64>,
    date: String,
    time: String,
    extras: Vec<AddOn>,
    total: i64,
    customer_name: String,
    customer_phone: String,
    note: Option<String>,
    status: String,
    created_at: String,
    service: Option<String>,
    employee: Option<String>,
}

impl From<BookingDetail> for BookingResponse {
    fn from(detail: BookingDetail) -> Self {
        let b = detail.booking;
        BookingResponse {
            id: b.id,
            user_id: b.user_id,
            service_id: b.service_id,
            employee_id: b.employee_id,
            date: b.date.format("%Y-%m-%d").to_string(),
            time: b.time,
            extras: b.extras,
            total: b.total,
            customer_name: b.customer_name,
            customer_phone: b.customer_phone,
            note: b.note,
            status: b.status.as_str().to_string(),
            created_at: b.created_at,
            service: detail.service_name,
            employee: detail.employee_name,
        }
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time_slot: String,
    #[serde(default)]
    pub extras: Vec<AddOn>,
    pub customer_name: String,
    pub customer_phone: String,
    pub note: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.user_id <= 0 {
        return Err(AppError::InvalidInput(
            "missing or invalid user_id".to_string(),
        ));
    }
    if body.service_id <= 0 {
        return Err(AppError::InvalidInput(
            "missing or invalid service_id".to_string(),
        ));
    }

    if !state.accounts.account_exists(body.user_id).await? {
        return Err(AppError::InvalidInput("unknown user account".to_string()));
    }

    let service = state
        .catalog
        .get_service(body.service_id)
        .await?
        .ok_or_else(|| AppError::InvalidInput("unknown service".to_string()))?;
    if !service.is_active {
        return Err(AppError::InvalidInput(
            "service is no longer available".to_string(),
        ));
    }

    let booking = NewBooking {
        user_id: body.user_id,
        service_id: body.service_id,
        employee_id: body.employee_id,
        date: body.date.unwrap_or_else(|| Local::now().date_naive()),
        time: body.time_slot,
        extras: body.extras,
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
        note: body.note,
    };

    let booking_id = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(&mut db, booking, service.price)?
    };

    Ok(Json(
        serde_json::json!({ "success": true, "data": { "booking_id": booking_id } }),
    ))
}

// GET /api/bookings?user_id=
#[derive(Deserialize)]
pub struct BookingsByUserQuery {
    pub user_id: Option<i64>,
}

pub async fn get_bookings_by_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsByUserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::InvalidInput("missing user_id".to_string()))?;

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_user(&db, user_id)?
    };

    let response: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();
    Ok(Json(
        serde_json::json!({ "success": true, "data": response }),
    ))
}

// GET /api/bookings/:id
pub async fn get_booking_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let detail = {
        let db = state.db.lock().unwrap();
        queries::get_booking_detail(&db, id)?
    }
    .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    let response: BookingResponse = detail.into();
    Ok(Json(
        serde_json::json!({ "success": true, "data": response }),
    ))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub user_id: i64,
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.user_id <= 0 {
        return Err(AppError::InvalidInput(
            "missing or invalid user_id".to_string(),
        ));
    }
    let new_status = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown status: {}", body.status)))?;

    let status = {
        let db = state.db.lock().unwrap();
        booking::transition(&db, id, Requester::Customer(body.user_id), new_status)?
    };

    Ok(Json(
        serde_json::json!({ "success": true, "data": { "status": status.as_str() } }),
    ))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct AdminBookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn admin_get_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status_filter = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50);

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_all_bookings(&db, status_filter, limit)?
    };

    let response: Vec<BookingResponse> = bookings.into_iter().map(Into::into).collect();
    Ok(Json(
        serde_json::json!({ "success": true, "data": response }),
    ))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct AdminUpdateStatusRequest {
    pub status: String,
}

pub async fn admin_update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<AdminUpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let new_status = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown status: {}", body.status)))?;

    let status = {
        let db = state.db.lock().unwrap();
        booking::transition(&db, id, Requester::Staff, new_status)?
    };

    Ok(Json(
        serde_json::json!({ "success": true, "data": { "status": status.as_str() } }),
    ))
}
