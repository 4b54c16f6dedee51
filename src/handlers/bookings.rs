use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::PaymentMethod;
use crate::services::{booking, lifecycle};
use crate::state::AppState;

/// Boundary DTO. Fields the client must send are still optional here so a
/// missing one produces a 400 with a usable message instead of a
/// deserialization error. Legacy clients send `num_guests`.
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    #[serde(alias = "num_guests")]
    pub guest_count: Option<i32>,
    pub total_price: Option<i64>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

impl CreateBookingRequest {
    fn into_new_booking(self) -> Result<booking::NewBooking, AppError> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T, AppError> {
            value.ok_or_else(|| AppError::Validation(format!("missing required field: {name}")))
        }

        Ok(booking::NewBooking {
            room_id: required(self.room_id, "room_id")?,
            check_in_date: required(self.check_in_date, "check_in_date")?,
            check_out_date: required(self.check_out_date, "check_out_date")?,
            guest_count: self.guest_count.unwrap_or(1),
            total_price: required(self.total_price, "total_price")?,
            notes: self.notes,
            payment_method: self.payment_method.unwrap_or(PaymentMethod::BankTransfer),
        })
    }
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::auth_user(&headers)?;
    let req = body.into_new_booking()?;

    let (created, deposit) = {
        let mut db = state.db.lock().unwrap();
        booking::create_booking(&mut db, &user.id, &req)?
    };

    let message = if created.requires_deposit {
        "booking created; a 20% deposit must be settled by bank transfer"
    } else {
        "booking created"
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": { "booking": created, "deposit": deposit },
            "message": message,
        })),
    ))
}

// GET /api/bookings/me
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = auth::auth_user(&headers)?;

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_user(&db, &user.id)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "bookings": bookings },
    })))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = auth::auth_user(&headers)?;

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound("booking".to_string()))?;

    if !user.role.is_staff() && user.id != booking.user_id {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }

    let payments = queries::get_payments_for_booking(&db, &booking.id)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "booking": booking, "payments": payments },
    })))
}

// PATCH /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = auth::auth_user(&headers)?;

    let outcome = {
        let db = state.db.lock().unwrap();
        lifecycle::cancel(&db, &id, &user)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "booking": outcome.booking,
            "forfeited_amount": outcome.forfeited_amount,
            "refundable_amount": outcome.refundable_amount,
        },
        "message": "booking cancelled; 20% of the total price is forfeited",
    })))
}

// GET /api/bookings/check/:booking_number — public lookup by human code.
pub async fn check_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_number): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_number(&db, &booking_number)?
    }
    .ok_or_else(|| AppError::NotFound("booking".to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "booking": booking },
    })))
}
