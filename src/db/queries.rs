use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, Payment, PaymentMethod, PaymentStatus, PaymentType, Room, RoomStatus,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn now_str() -> String {
    Utc::now().naive_utc().format(DATETIME_FMT).to_string()
}

// ── Rooms ──

pub fn create_room(conn: &Connection, room: &Room) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO rooms (id, room_number, room_type, base_price, capacity, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            room.id,
            room.room_number,
            room.room_type,
            room.base_price,
            room.capacity,
            room.status.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_room(conn: &Connection, id: &str) -> anyhow::Result<Option<Room>> {
    let result = conn.query_row(
        "SELECT id, room_number, room_type, base_price, capacity, status FROM rooms WHERE id = ?1",
        params![id],
        |row| {
            let status: String = row.get(5)?;
            Ok(Room {
                id: row.get(0)?,
                room_number: row.get(1)?,
                room_type: row.get(2)?,
                base_price: row.get(3)?,
                capacity: row.get(4)?,
                status: RoomStatus::parse(&status),
            })
        },
    );

    match result {
        Ok(room) => Ok(Some(room)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, booking_number, user_id, room_id, check_in_date, check_out_date,
                               guest_count, total_price, status, payment_method, requires_deposit,
                               deposit_paid, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            booking.id,
            booking.booking_number,
            booking.user_id,
            booking.room_id,
            booking.check_in_date.format(DATE_FMT).to_string(),
            booking.check_out_date.format(DATE_FMT).to_string(),
            booking.guest_count,
            booking.total_price,
            booking.status.as_str(),
            booking.payment_method.as_str(),
            booking.requires_deposit as i32,
            booking.deposit_paid as i32,
            booking.notes,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

/// Count non-cancelled bookings on a room whose `[check_in, check_out)`
/// interval intersects the requested one. Half-open, so a checkout that
/// equals another booking's check-in is not a conflict.
pub fn count_overlapping(
    conn: &Connection,
    room_id: &str,
    check_in: &NaiveDate,
    check_out: &NaiveDate,
) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE room_id = ?1 AND status != 'cancelled'
           AND check_in_date < ?2 AND check_out_date > ?3",
        params![
            room_id,
            check_out.format(DATE_FMT).to_string(),
            check_in.format(DATE_FMT).to_string(),
        ],
        |row| row.get(0),
    )?;
    Ok(count)
}

const BOOKING_COLS: &str = "id, booking_number, user_id, room_id, check_in_date, check_out_date, \
                            guest_count, total_price, status, payment_method, requires_deposit, \
                            deposit_paid, notes, created_at, updated_at";

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_number(
    conn: &Connection,
    booking_number: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings WHERE booking_number = ?1"),
        params![booking_number],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLS} FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn set_deposit_paid(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET deposit_paid = 1, updated_at = ?1 WHERE id = ?2",
        params![now_str(), booking_id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let check_in_str: String = row.get(4)?;
    let check_out_str: String = row.get(5)?;
    let status_str: String = row.get(8)?;
    let method_str: String = row.get(9)?;
    let created_at_str: String = row.get(13)?;
    let updated_at_str: String = row.get(14)?;

    Ok(Booking {
        id: row.get(0)?,
        booking_number: row.get(1)?,
        user_id: row.get(2)?,
        room_id: row.get(3)?,
        check_in_date: NaiveDate::parse_from_str(&check_in_str, DATE_FMT)?,
        check_out_date: NaiveDate::parse_from_str(&check_out_str, DATE_FMT)?,
        guest_count: row.get(6)?,
        total_price: row.get(7)?,
        status: BookingStatus::parse(&status_str),
        payment_method: PaymentMethod::parse(&method_str),
        requires_deposit: row.get::<_, i32>(10)? != 0,
        deposit_paid: row.get::<_, i32>(11)? != 0,
        notes: row.get(12)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}

// ── Payments ──

const PAYMENT_COLS: &str = "id, booking_id, amount, payment_method, payment_type, \
                            deposit_percentage, payment_status, transaction_id, receipt_url, \
                            payment_date, notes, created_at, updated_at";

pub fn insert_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, amount, payment_method, payment_type,
                               deposit_percentage, payment_status, transaction_id, receipt_url,
                               payment_date, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            payment.id,
            payment.booking_id,
            payment.amount,
            payment.payment_method.as_str(),
            payment.payment_type.as_str(),
            payment.deposit_percentage,
            payment.payment_status.as_str(),
            payment.transaction_id,
            payment.receipt_url,
            payment
                .payment_date
                .map(|d| d.format(DATETIME_FMT).to_string()),
            payment.notes,
            payment.created_at.format(DATETIME_FMT).to_string(),
            payment.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_payments_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLS} FROM payments WHERE booking_id = ?1 ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![booking_id], |row| Ok(parse_payment_row(row)))?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row??);
    }
    Ok(payments)
}

/// Oldest still-pending payment on a booking, the one a customer
/// confirmation settles.
pub fn find_pending_payment(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Option<Payment>> {
    let result = conn.query_row(
        &format!(
            "SELECT {PAYMENT_COLS} FROM payments
             WHERE booking_id = ?1 AND payment_status = 'pending'
             ORDER BY created_at ASC LIMIT 1"
        ),
        params![booking_id],
        |row| Ok(parse_payment_row(row)),
    );

    match result {
        Ok(payment) => Ok(Some(payment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn complete_payment(
    conn: &Connection,
    payment_id: &str,
    transaction_id: Option<&str>,
    receipt_url: Option<&str>,
    notes: Option<&str>,
) -> anyhow::Result<bool> {
    let now = now_str();
    let count = conn.execute(
        "UPDATE payments
         SET payment_status = 'completed',
             transaction_id = COALESCE(?1, transaction_id),
             receipt_url = COALESCE(?2, receipt_url),
             notes = COALESCE(?3, notes),
             payment_date = ?4,
             updated_at = ?4
         WHERE id = ?5",
        params![transaction_id, receipt_url, notes, now, payment_id],
    )?;
    Ok(count > 0)
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let method_str: String = row.get(3)?;
    let type_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let payment_date_str: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        amount: row.get(2)?,
        payment_method: PaymentMethod::parse(&method_str),
        payment_type: PaymentType::parse(&type_str),
        deposit_percentage: row.get(5)?,
        payment_status: PaymentStatus::parse(&status_str),
        transaction_id: row.get(7)?,
        receipt_url: row.get(8)?,
        payment_date: payment_date_str
            .and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FMT).ok()),
        notes: row.get(10)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}

// ── Payment ledger listing ──

#[derive(Debug, Default, Clone)]
pub struct PaymentFilter {
    /// Matched against the owning booking's number.
    pub search: Option<String>,
    pub method: Option<String>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: i64,
    pub limit: i64,
}

pub struct PaymentRecord {
    pub payment: Payment,
    pub booking_number: String,
}

pub struct PaymentListing {
    pub records: Vec<PaymentRecord>,
    pub total_count: i64,
    pub total_revenue: i64,
}

fn filter_clauses(
    filter: &PaymentFilter,
    include_status: bool,
) -> (Vec<&'static str>, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut clauses: Vec<&'static str> = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(search) = &filter.search {
        clauses.push("b.booking_number LIKE '%' || ? || '%'");
        values.push(Box::new(search.clone()));
    }
    if let Some(method) = &filter.method {
        clauses.push("p.payment_method = ?");
        values.push(Box::new(method.clone()));
    }
    if include_status {
        if let Some(status) = &filter.status {
            clauses.push("p.payment_status = ?");
            values.push(Box::new(status.clone()));
        }
    }
    if let Some(from) = &filter.from {
        clauses.push("p.created_at >= ?");
        values.push(Box::new(from.format(DATE_FMT).to_string()));
    }
    if let Some(to) = &filter.to {
        clauses.push("p.created_at < date(?, '+1 day')");
        values.push(Box::new(to.format(DATE_FMT).to_string()));
    }

    (clauses, values)
}

fn where_sql(clauses: &[&str]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

pub fn list_payments(conn: &Connection, filter: &PaymentFilter) -> anyhow::Result<PaymentListing> {
    let (clauses, values) = filter_clauses(filter, true);
    let where_sql_listing = where_sql(&clauses);
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|v| v.as_ref()).collect();

    let total_count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM payments p JOIN bookings b ON p.booking_id = b.id {where_sql_listing}"
        ),
        params_refs.as_slice(),
        |row| row.get(0),
    )?;

    // Revenue rollup: completed payments within the same search/method/date
    // window. The listing's own status filter does not narrow the rollup.
    let (mut revenue_clauses, revenue_values) = filter_clauses(filter, false);
    revenue_clauses.push("p.payment_status = 'completed'");
    let revenue_refs: Vec<&dyn rusqlite::types::ToSql> =
        revenue_values.iter().map(|v| v.as_ref()).collect();
    let total_revenue: i64 = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(p.amount), 0) FROM payments p
             JOIN bookings b ON p.booking_id = b.id {}",
            where_sql(&revenue_clauses)
        ),
        revenue_refs.as_slice(),
        |row| row.get(0),
    )?;

    let offset = (filter.page.max(1) - 1) * filter.limit;
    let mut stmt = conn.prepare(&format!(
        "SELECT p.id, p.booking_id, p.amount, p.payment_method, p.payment_type,
                p.deposit_percentage, p.payment_status, p.transaction_id, p.receipt_url,
                p.payment_date, p.notes, p.created_at, p.updated_at, b.booking_number
         FROM payments p JOIN bookings b ON p.booking_id = b.id
         {where_sql_listing} ORDER BY p.created_at DESC LIMIT {} OFFSET {}",
        filter.limit, offset
    ))?;

    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let booking_number: String = row.get(13)?;
        Ok((parse_payment_row(row), booking_number))
    })?;

    let mut records = vec![];
    for row in rows {
        let (payment, booking_number) = row?;
        records.push(PaymentRecord {
            payment: payment?,
            booking_number,
        });
    }

    Ok(PaymentListing {
        records,
        total_count,
        total_revenue,
    })
}
