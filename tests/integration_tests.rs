use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceExt;

use innkeeper::config::AppConfig;
use innkeeper::db;
use innkeeper::db::queries;
use innkeeper::handlers;
use innkeeper::models::{Room, RoomStatus};
use innkeeper::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
    });
    seed_room(&state, "room-5", "5");
    state
}

fn seed_room(state: &Arc<AppState>, id: &str, number: &str) {
    let db = state.db.lock().unwrap();
    queries::create_room(
        &db,
        &Room {
            id: id.to_string(),
            room_number: number.to_string(),
            room_type: "deluxe".to_string(),
            base_price: 500_000,
            capacity: 2,
            status: RoomStatus::Available,
        },
    )
    .unwrap();
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings/me", get(handlers::bookings::my_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/cancel",
            patch(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/check/:booking_number",
            get(handlers::bookings::check_booking),
        )
        .route(
            "/api/bookings/:id/payments/confirm",
            post(handlers::payments::confirm_transfer),
        )
        .route(
            "/api/bookings/:id/payments/notify",
            post(handlers::payments::notify_payment),
        )
        .route("/api/payments", get(handlers::payments::list_payments))
        .route(
            "/api/admin/bookings/:id/confirm",
            post(handlers::admin::confirm_booking),
        )
        .route(
            "/api/admin/bookings/:id/check-in",
            post(handlers::admin::check_in_booking),
        )
        .route(
            "/api/admin/bookings/:id/check-out",
            post(handlers::admin::check_out_booking),
        )
        .with_state(state)
}

fn user_request(method: &str, uri: &str, user_id: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user_id);
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn admin_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_payload(check_in: &str, check_out: &str, method: &str, price: i64) -> serde_json::Value {
    serde_json::json!({
        "room_id": "room-5",
        "check_in_date": check_in,
        "check_out_date": check_out,
        "guest_count": 2,
        "total_price": price,
        "payment_method": method,
    })
}

/// Create a booking as `user_id` and return the response body.
async fn create_booking(
    state: &Arc<AppState>,
    user_id: &str,
    payload: serde_json::Value,
) -> serde_json::Value {
    let res = test_app(state.clone())
        .oneshot(user_request("POST", "/api/bookings", user_id, Some(payload)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

// ── Booking creation ──

#[tokio::test]
async fn test_create_booking_bank_transfer() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;

    assert_eq!(json["success"], true);
    let booking = &json["data"]["booking"];
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["requires_deposit"], false);
    assert_eq!(booking["total_price"], 1_000_000);
    assert!(booking["booking_number"].as_str().unwrap().starts_with("BK-"));
    assert!(json["data"]["deposit"].is_null());
}

#[tokio::test]
async fn test_create_booking_cash_requires_deposit() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-04-01", "2025-04-03", "cash", 2_000_000),
    )
    .await;

    let booking = &json["data"]["booking"];
    assert_eq!(booking["requires_deposit"], true);
    assert_eq!(booking["deposit_paid"], false);

    let deposit = &json["data"]["deposit"];
    assert_eq!(deposit["amount"], 400_000);
    assert_eq!(deposit["payment_type"], "deposit");
    assert_eq!(deposit["payment_method"], "bank_transfer");
    assert_eq!(deposit["payment_status"], "pending");
    assert_eq!(deposit["deposit_percentage"], 20);
}

#[tokio::test]
async fn test_create_booking_missing_field() {
    let state = test_state();
    let payload = serde_json::json!({
        "room_id": "room-5",
        "check_in_date": "2025-03-01",
        "check_out_date": "2025-03-03",
    });
    let res = test_app(state.clone())
        .oneshot(user_request("POST", "/api/bookings", "user-1", Some(payload)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("total_price"));
}

#[tokio::test]
async fn test_create_booking_accepts_num_guests_alias() {
    let state = test_state();
    let payload = serde_json::json!({
        "room_id": "room-5",
        "check_in_date": "2025-03-01",
        "check_out_date": "2025-03-03",
        "num_guests": 3,
        "total_price": 1_000_000,
    });
    let json = create_booking(&state, "user-1", payload).await;
    assert_eq!(json["data"]["booking"]["guest_count"], 3);
    // unspecified payment method falls back to bank_transfer
    assert_eq!(json["data"]["booking"]["payment_method"], "bank_transfer");
}

#[tokio::test]
async fn test_create_booking_requires_identity() {
    let state = test_state();
    let res = test_app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    booking_payload("2025-03-01", "2025-03-03", "cash", 1_000_000).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_booking_unknown_room() {
    let state = test_state();
    let mut payload = booking_payload("2025-03-01", "2025-03-03", "cash", 1_000_000);
    payload["room_id"] = serde_json::json!("room-404");
    let res = test_app(state.clone())
        .oneshot(user_request("POST", "/api/bookings", "user-1", Some(payload)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overlapping_booking_conflicts() {
    let state = test_state();
    create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;

    let res = test_app(state.clone())
        .oneshot(user_request(
            "POST",
            "/api/bookings",
            "user-2",
            Some(booking_payload("2025-03-02", "2025-03-04", "bank_transfer", 1_000_000)),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // the rejected attempt left nothing behind
    let res = test_app(state.clone())
        .oneshot(user_request("GET", "/api/bookings/me", "user-2", None))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["data"]["bookings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_back_to_back_bookings_allowed() {
    let state = test_state();
    create_booking(
        &state,
        "user-1",
        booking_payload("2025-05-10", "2025-05-12", "bank_transfer", 1_000_000),
    )
    .await;
    create_booking(
        &state,
        "user-2",
        booking_payload("2025-05-12", "2025-05-14", "bank_transfer", 1_000_000),
    )
    .await;
}

// ── Reads & ownership ──

#[tokio::test]
async fn test_get_booking_owner_and_stranger() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "cash", 1_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(user_request("GET", &format!("/api/bookings/{id}"), "user-1", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["payments"].as_array().unwrap().len(), 1);

    let res = test_app(state.clone())
        .oneshot(user_request("GET", &format!("/api/bookings/{id}"), "user-2", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_can_read_any_booking() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/api/bookings/{id}"))
                .header("x-user-id", "staff-1")
                .header("x-user-role", "staff")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_check_by_booking_number() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;
    let number = json["data"]["booking"]["booking_number"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/api/bookings/check/{number}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["booking"]["booking_number"], number);

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/bookings/check/BK-0-0000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Cancellation ──

#[tokio::test]
async fn test_cancel_and_cancel_again() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-04-01", "2025-04-03", "cash", 2_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(user_request("PATCH", &format!("/api/bookings/{id}/cancel"), "user-1", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["booking"]["status"], "cancelled");
    assert_eq!(json["data"]["forfeited_amount"], 400_000);
    assert_eq!(json["data"]["refundable_amount"], 1_600_000);

    let res = test_app(state.clone())
        .oneshot(user_request("PATCH", &format!("/api/bookings/{id}/cancel"), "user-1", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_by_stranger_forbidden() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-04-01", "2025-04-03", "bank_transfer", 1_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(user_request("PATCH", &format!("/api/bookings/{id}/cancel"), "user-2", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancelled_dates_reopen_for_booking() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    test_app(state.clone())
        .oneshot(user_request("PATCH", &format!("/api/bookings/{id}/cancel"), "user-1", None))
        .await
        .unwrap();

    // same dates are available again
    create_booking(
        &state,
        "user-2",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;
}

// ── Payment reconciliation ──

#[tokio::test]
async fn test_confirm_transfer_settles_deposit() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-04-01", "2025-04-03", "cash", 2_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();
    let number = json["data"]["booking"]["booking_number"].as_str().unwrap().to_string();

    let payload = serde_json::json!({
        "transaction_id": format!("TXN-{number}-1740000000000"),
        "receipt_url": "https://uploads.example/receipt-1.png",
    });
    let res = test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/bookings/{id}/payments/confirm"),
            "user-1",
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["payment"]["payment_status"], "completed");

    let res = test_app(state.clone())
        .oneshot(user_request("GET", &format!("/api/bookings/{id}"), "user-1", None))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["data"]["booking"]["deposit_paid"], true);
}

#[tokio::test]
async fn test_notify_payment_settles_deposit() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-04-01", "2025-04-03", "cash", 2_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/bookings/{id}/payments/notify"),
            "user-1",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // a second notification has nothing pending to settle
    let res = test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/bookings/{id}/payments/notify"),
            "user-1",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Admin payment ledger ──

#[tokio::test]
async fn test_payments_list_requires_token() {
    let state = test_state();
    let res = test_app(state)
        .oneshot(Request::builder().uri("/api/payments").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payments_list_summary_and_pagination() {
    let state = test_state();
    let first = create_booking(
        &state,
        "user-1",
        booking_payload("2025-04-01", "2025-04-03", "cash", 2_000_000),
    )
    .await;
    create_booking(
        &state,
        "user-1",
        booking_payload("2025-05-01", "2025-05-03", "cash", 1_000_000),
    )
    .await;

    let first_id = first["data"]["booking"]["id"].as_str().unwrap().to_string();
    test_app(state.clone())
        .oneshot(user_request(
            "POST",
            &format!("/api/bookings/{first_id}/payments/notify"),
            "user-1",
            None,
        ))
        .await
        .unwrap();

    let res = test_app(state.clone())
        .oneshot(admin_request("GET", "/api/payments"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["payments"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["summary"]["totalRevenue"], 400_000);
    assert_eq!(json["data"]["pagination"]["totalCount"], 2);
    assert_eq!(json["data"]["pagination"]["totalPages"], 1);

    let res = test_app(state.clone())
        .oneshot(admin_request("GET", "/api/payments?status=pending&limit=1"))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["data"]["payments"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["payments"][0]["payment_status"], "pending");
    assert_eq!(json["data"]["pagination"]["totalCount"], 1);
}

// ── Admin lifecycle endpoints ──

#[tokio::test]
async fn test_admin_lifecycle_requires_token() {
    let state = test_state();
    let res = test_app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/bookings/some-id/confirm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_confirm_check_in_check_out() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(admin_request("POST", &format!("/api/admin/bookings/{id}/confirm")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["booking"]["status"], "confirmed");

    // checking out before check-in is rejected
    let res = test_app(state.clone())
        .oneshot(admin_request("POST", &format!("/api/admin/bookings/{id}/check-out")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = test_app(state.clone())
        .oneshot(admin_request("POST", &format!("/api/admin/bookings/{id}/check-in")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["booking"]["status"], "checked_in");
    assert!(json["warning"].is_null());

    let res = test_app(state.clone())
        .oneshot(admin_request("POST", &format!("/api/admin/bookings/{id}/check-out")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["booking"]["status"], "checked_out");
}

#[tokio::test]
async fn test_admin_check_in_from_pending_warns() {
    let state = test_state();
    let json = create_booking(
        &state,
        "user-1",
        booking_payload("2025-03-01", "2025-03-03", "bank_transfer", 1_000_000),
    )
    .await;
    let id = json["data"]["booking"]["id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(admin_request("POST", &format!("/api/admin/bookings/{id}/check-in")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["data"]["booking"]["status"], "checked_in");
    assert!(json["warning"].as_str().unwrap().contains("not been confirmed"));
}

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let res = test_app(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
