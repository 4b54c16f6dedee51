use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::queries::PaymentFilter;
use crate::errors::AppError;
use crate::models::Payment;
use crate::services::payments;
use crate::state::AppState;

// POST /api/bookings/:id/payments/confirm
#[derive(Deserialize)]
pub struct ConfirmTransferRequest {
    pub transaction_id: String,
    pub receipt_url: String,
}

pub async fn confirm_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ConfirmTransferRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = auth::auth_user(&headers)?;

    let payment = {
        let db = state.db.lock().unwrap();
        payments::confirm_transfer(&db, &id, &user, &body.transaction_id, &body.receipt_url)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "payment": payment },
        "message": "payment confirmation recorded",
    })))
}

// POST /api/bookings/:id/payments/notify
pub async fn notify_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = auth::auth_user(&headers)?;

    let payment = {
        let db = state.db.lock().unwrap();
        payments::notify_completion(&db, &id, &user)?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "payment": payment },
        "message": "payment notification recorded",
    })))
}

// GET /api/payments
#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub search: Option<String>,
    pub method: Option<String>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
struct PaymentView {
    #[serde(flatten)]
    payment: Payment,
    booking_number: String,
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::check_admin(&headers, &state.config.admin_token)?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let filter = PaymentFilter {
        search: query.search,
        method: query.method,
        status: query.status,
        from: query.from,
        to: query.to,
        page,
        limit,
    };

    let listing = {
        let db = state.db.lock().unwrap();
        payments::list(&db, &filter)?
    };

    let total_pages = (listing.total_count + limit - 1) / limit;
    let views: Vec<PaymentView> = listing
        .records
        .into_iter()
        .map(|r| PaymentView {
            payment: r.payment,
            booking_number: r.booking_number,
        })
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "payments": views,
            "summary": { "totalRevenue": listing.total_revenue },
            "pagination": {
                "page": page,
                "limit": limit,
                "totalCount": listing.total_count,
                "totalPages": total_pages,
            },
        },
    })))
}
