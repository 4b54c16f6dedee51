use rusqlite::Connection;

use crate::auth::AuthUser;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

/// Share of total_price the customer forfeits on cancellation. The remainder
/// is refundable through the back office; no refund payment row is written.
pub const CANCEL_FORFEIT_PERCENTAGE: i32 = 20;

#[derive(Debug)]
pub struct CheckInOutcome {
    pub booking: Booking,
    /// Set when check-in happens before staff confirmed the booking. Front
    /// desk treats it as a warning, not a block.
    pub warning: Option<String>,
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub booking: Booking,
    pub forfeited_amount: i64,
    pub refundable_amount: i64,
}

fn load(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound("booking".to_string()))
}

fn transition(conn: &Connection, booking: &mut Booking, to: BookingStatus) -> Result<(), AppError> {
    queries::update_booking_status(conn, &booking.id, to)?;
    booking.status = to;
    tracing::info!(
        booking_number = %booking.booking_number,
        status = to.as_str(),
        "booking status changed"
    );
    Ok(())
}

pub fn confirm(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    let mut booking = load(conn, id)?;
    if booking.status != BookingStatus::Pending {
        return Err(AppError::IllegalTransition(format!(
            "cannot confirm a {} booking",
            booking.status.as_str()
        )));
    }
    transition(conn, &mut booking, BookingStatus::Confirmed)?;
    Ok(booking)
}

pub fn check_in(conn: &Connection, id: &str) -> Result<CheckInOutcome, AppError> {
    let mut booking = load(conn, id)?;
    let warning = match booking.status {
        BookingStatus::Confirmed => None,
        BookingStatus::Pending => Some(
            "booking has not been confirmed; checking in anyway".to_string(),
        ),
        other => {
            return Err(AppError::IllegalTransition(format!(
                "cannot check in a {} booking",
                other.as_str()
            )))
        }
    };
    transition(conn, &mut booking, BookingStatus::CheckedIn)?;
    Ok(CheckInOutcome { booking, warning })
}

pub fn check_out(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    let mut booking = load(conn, id)?;
    if booking.status != BookingStatus::CheckedIn {
        return Err(AppError::IllegalTransition(format!(
            "cannot check out a {} booking",
            booking.status.as_str()
        )));
    }
    transition(conn, &mut booking, BookingStatus::CheckedOut)?;
    Ok(booking)
}

/// Owner-or-staff only; allowed from pending or confirmed. Cancelling an
/// already-cancelled booking is rejected rather than silently succeeding.
pub fn cancel(conn: &Connection, id: &str, actor: &AuthUser) -> Result<CancelOutcome, AppError> {
    let mut booking = load(conn, id)?;

    if !actor.role.is_staff() && actor.id != booking.user_id {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }

    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::IllegalTransition(
            "booking is already cancelled".to_string(),
        ));
    }
    if !booking.status.is_cancellable() {
        return Err(AppError::IllegalTransition(format!(
            "cannot cancel a {} booking",
            booking.status.as_str()
        )));
    }

    transition(conn, &mut booking, BookingStatus::Cancelled)?;

    let forfeited_amount = booking.total_price * CANCEL_FORFEIT_PERCENTAGE as i64 / 100;
    let refundable_amount = booking.total_price - forfeited_amount;

    Ok(CancelOutcome {
        booking,
        forfeited_amount,
        refundable_amount,
    })
}
