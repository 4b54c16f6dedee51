use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::auth;
use crate::errors::AppError;
use crate::services::lifecycle;
use crate::state::AppState;

// POST /api/admin/bookings/:id/confirm
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::check_admin(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db.lock().unwrap();
        lifecycle::confirm(&db, &id)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "booking": booking },
        "message": "booking confirmed",
    })))
}

// POST /api/admin/bookings/:id/check-in
pub async fn check_in_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::check_admin(&headers, &state.config.admin_token)?;

    let outcome = {
        let db = state.db.lock().unwrap();
        lifecycle::check_in(&db, &id)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "booking": outcome.booking },
        "warning": outcome.warning,
        "message": "guest checked in",
    })))
}

// POST /api/admin/bookings/:id/check-out
pub async fn check_out_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::check_admin(&headers, &state.config.admin_token)?;

    let booking = {
        let db = state.db.lock().unwrap();
        lifecycle::check_out(&db, &id)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "booking": booking },
        "message": "guest checked out",
    })))
}
