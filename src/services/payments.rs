use rusqlite::Connection;

use crate::auth::AuthUser;
use crate::db::queries;
use crate::db::queries::{PaymentFilter, PaymentListing};
use crate::errors::AppError;
use crate::models::{Booking, Payment, PaymentStatus, PaymentType};

fn load_booking(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking".to_string()))
}

fn check_owner(booking: &Booking, actor: &AuthUser) -> Result<(), AppError> {
    if !actor.role.is_staff() && actor.id != booking.user_id {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }
    Ok(())
}

fn settle(
    conn: &Connection,
    booking: &Booking,
    mut payment: Payment,
    transaction_id: Option<&str>,
    receipt_url: Option<&str>,
    notes: Option<&str>,
) -> Result<Payment, AppError> {
    queries::complete_payment(conn, &payment.id, transaction_id, receipt_url, notes)?;

    if payment.payment_type == PaymentType::Deposit {
        queries::set_deposit_paid(conn, &booking.id)?;
    }

    payment.payment_status = PaymentStatus::Completed;
    payment.transaction_id = transaction_id.map(str::to_string).or(payment.transaction_id);
    payment.receipt_url = receipt_url.map(str::to_string).or(payment.receipt_url);
    payment.notes = notes.map(str::to_string).or(payment.notes);

    tracing::info!(
        booking_number = %booking.booking_number,
        payment_id = %payment.id,
        payment_type = payment.payment_type.as_str(),
        "payment marked completed"
    );
    Ok(payment)
}

/// Reconciliation path (a): the customer submits a transfer reference
/// (`TXN-<booking_number>-<epochMillis>`, generated client-side) together
/// with an uploaded receipt. This is a claim of payment, not a
/// gateway-verified confirmation.
pub fn confirm_transfer(
    conn: &Connection,
    booking_id: &str,
    actor: &AuthUser,
    transaction_id: &str,
    receipt_url: &str,
) -> Result<Payment, AppError> {
    let booking = load_booking(conn, booking_id)?;
    check_owner(&booking, actor)?;

    let payment = queries::find_pending_payment(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("pending payment".to_string()))?;

    settle(
        conn,
        &booking,
        payment,
        Some(transaction_id),
        Some(receipt_url),
        None,
    )
}

/// Reconciliation path (b): a bare "I paid" acknowledgment without a
/// receipt, used by the deposit flow.
pub fn notify_completion(
    conn: &Connection,
    booking_id: &str,
    actor: &AuthUser,
) -> Result<Payment, AppError> {
    let booking = load_booking(conn, booking_id)?;
    check_owner(&booking, actor)?;

    let payment = queries::find_pending_payment(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("pending payment".to_string()))?;

    settle(
        conn,
        &booking,
        payment,
        None,
        None,
        Some("customer reported payment as completed"),
    )
}

pub fn list(conn: &Connection, filter: &PaymentFilter) -> Result<PaymentListing, AppError> {
    Ok(queries::list_payments(conn, filter)?)
}
