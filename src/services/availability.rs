use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;

/// True when any non-cancelled booking on the room intersects the requested
/// `[check_in, check_out)` range. Pure read; callers run it inside the same
/// transaction as the insert it guards.
pub fn is_overlapping(
    conn: &Connection,
    room_id: &str,
    check_in: &NaiveDate,
    check_out: &NaiveDate,
) -> anyhow::Result<bool> {
    let count = queries::count_overlapping(conn, room_id, check_in, check_out)?;
    Ok(count > 0)
}
