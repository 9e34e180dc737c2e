//! # Booking Storage
//!
//! Inserts are guarded against overlapping stays on the same listing.

use chrono::Utc;
use rusqlite::{Row, params};

use super::Database;
use super::listings::{LISTING_COLUMNS, LISTING_COLUMN_COUNT, listing_from_row};
use crate::error::not_found;
use crate::models::{Booking, NewBooking};
use crate::{CoreError, Result};

const BOOKING_COLUMNS: &str =
    "b.id, b.created_at, b.listing_id, b.guest_id, b.check_in, b.check_out, b.price, b.total";
const BOOKING_COLUMN_COUNT: usize = 8;

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        created_at: row.get(1)?,
        listing_id: row.get(2)?,
        guest_id: row.get(3)?,
        check_in: row.get(4)?,
        check_out: row.get(5)?,
        price: row.get(6)?,
        total: row.get(7)?,
        listing: listing_from_row(row, BOOKING_COLUMN_COUNT)?,
    })
}

fn select_bookings(filter: &str) -> String {
    debug_assert_eq!(LISTING_COLUMNS.split(',').count(), LISTING_COLUMN_COUNT);
    format!(
        "SELECT {BOOKING_COLUMNS}, {LISTING_COLUMNS}
         FROM bookings b
         INNER JOIN listings l ON l.id = b.listing_id
         INNER JOIN users u ON u.id = l.owner_id
         {filter}"
    )
}

impl Database {
    /// Reserve a stay. Fails with [`CoreError::BookingConflict`] when any
    /// existing booking of the same listing overlaps `[check_in, check_out)`.
    ///
    /// The overlap check and the insert are one statement.
    pub fn insert_booking(&self, booking: &NewBooking) -> Result<i64> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO bookings (created_at, listing_id, guest_id, check_in, check_out, price, total)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
             WHERE NOT EXISTS (
                 SELECT 1 FROM bookings
                 WHERE listing_id = ?2 AND check_in < ?5 AND check_out > ?4
             )",
            params![
                Utc::now(),
                booking.listing_id,
                booking.guest_id,
                booking.check_in,
                booking.check_out,
                booking.price,
                booking.total,
            ],
        )?;
        if inserted == 0 {
            return Err(CoreError::BookingConflict);
        }
        Ok(conn.last_insert_rowid())
    }

    pub fn get_booking(&self, id: i64) -> Result<Booking> {
        let sql = select_bookings("WHERE b.id = ?1");
        self.conn()
            .query_row(&sql, params![id], booking_from_row)
            .map_err(not_found)
    }

    /// Cancel a booking made by `guest_id`.
    pub fn delete_booking(&self, id: i64, guest_id: i64) -> Result<()> {
        let changed = self.conn().execute(
            "DELETE FROM bookings WHERE id = ?1 AND guest_id = ?2",
            params![id, guest_id],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// Bookings made by `guest_id`, newest first.
    pub fn bookings_for_guest(&self, guest_id: i64) -> Result<Vec<Booking>> {
        let conn = self.conn();
        let sql = select_bookings("WHERE b.guest_id = ?1 ORDER BY b.created_at DESC, b.id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let bookings = stmt
            .query_map(params![guest_id], booking_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookings)
    }

    /// Bookings of one listing, newest first.
    pub fn bookings_for_listing(&self, listing_id: i64) -> Result<Vec<Booking>> {
        let conn = self.conn();
        let sql =
            select_bookings("WHERE b.listing_id = ?1 ORDER BY b.created_at DESC, b.id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let bookings = stmt
            .query_map(params![listing_id], booking_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookings)
    }
}
