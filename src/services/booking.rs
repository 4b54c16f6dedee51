use chrono::{NaiveDate, Utc};
use rand::Rng;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Payment, PaymentMethod, PaymentStatus, PaymentType};
use crate::services::availability;

pub const DEPOSIT_PERCENTAGE: i32 = 20;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guest_count: i32,
    pub total_price: i64,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
}

/// `BK-<unixMillis>-<4 digits>`. Not globally unique in theory; the UNIQUE
/// index on booking_number turns a collision into an insert failure that
/// rolls the whole transaction back.
pub fn generate_booking_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("BK-{millis}-{suffix}")
}

pub fn deposit_amount(total_price: i64) -> i64 {
    total_price * DEPOSIT_PERCENTAGE as i64 / 100
}

/// Validates the request, checks room existence and availability, and writes
/// the booking plus its pending deposit payment (cash bookings only) in one
/// transaction. Nothing is persisted on any failure path.
pub fn create_booking(
    conn: &mut Connection,
    user_id: &str,
    req: &NewBooking,
) -> Result<(Booking, Option<Payment>), AppError> {
    if req.check_out_date <= req.check_in_date {
        return Err(AppError::Validation(
            "check_out_date must be after check_in_date".to_string(),
        ));
    }
    if req.guest_count < 1 {
        return Err(AppError::Validation(
            "guest_count must be at least 1".to_string(),
        ));
    }

    if queries::get_room(conn, &req.room_id)?.is_none() {
        return Err(AppError::NotFound("room".to_string()));
    }

    let tx = conn.transaction()?;

    if availability::is_overlapping(&tx, &req.room_id, &req.check_in_date, &req.check_out_date)? {
        return Err(AppError::Conflict(
            "room is already booked for the selected dates".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    // Deposit policy carried over from the legacy system: cash bookings must
    // put 20% down via bank transfer up front.
    let requires_deposit = req.payment_method == PaymentMethod::Cash;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        booking_number: generate_booking_number(),
        user_id: user_id.to_string(),
        room_id: req.room_id.clone(),
        check_in_date: req.check_in_date,
        check_out_date: req.check_out_date,
        guest_count: req.guest_count,
        total_price: req.total_price,
        status: BookingStatus::Pending,
        payment_method: req.payment_method,
        requires_deposit,
        deposit_paid: false,
        notes: req.notes.clone(),
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(&tx, &booking)?;

    let deposit = if requires_deposit {
        let payment = Payment {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            amount: deposit_amount(req.total_price),
            payment_method: PaymentMethod::BankTransfer,
            payment_type: PaymentType::Deposit,
            deposit_percentage: Some(DEPOSIT_PERCENTAGE),
            payment_status: PaymentStatus::Pending,
            transaction_id: None,
            receipt_url: None,
            payment_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        queries::insert_payment(&tx, &payment)?;
        Some(payment)
    } else {
        None
    };

    tx.commit()?;

    tracing::info!(
        booking_number = %booking.booking_number,
        room_id = %booking.room_id,
        requires_deposit,
        "booking created"
    );

    Ok((booking, deposit))
}
