use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, NewBooking, Review};

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &NewBooking, total: i64) -> rusqlite::Result<i64> {
    let date = booking.date.format("%Y-%m-%d").to_string();
    let extras_json = serde_json::to_string(&booking.extras).unwrap_or_else(|_| "[]".to_string());

    conn.execute(
        "INSERT INTO bookings (user_id, service_id, employee_id, date, time, extras, total, customer_name, customer_phone, note, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.user_id,
            booking.service_id,
            booking.employee_id,
            date,
            booking.time,
            extras_json,
            total,
            booking.customer_name,
            booking.customer_phone,
            booking.note,
            BookingStatus::Pending.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn occupied_slots(
    conn: &Connection,
    employee_id: i64,
    date: NaiveDate,
) -> rusqlite::Result<Vec<String>> {
    let date = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT time FROM bookings
         WHERE employee_id = ?1 AND date = ?2 AND status != 'cancelled'
         ORDER BY time ASC",
    )?;

    let rows = stmt.query_map(params![employee_id, date], |row| row.get(0))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

pub fn slot_taken(
    conn: &Connection,
    employee_id: i64,
    date: NaiveDate,
    time: &str,
) -> rusqlite::Result<bool> {
    let date = date.format("%Y-%m-%d").to_string();
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM bookings
         WHERE employee_id = ?1 AND date = ?2 AND time = ?3 AND status != 'cancelled'",
        params![employee_id, date, time],
        |row| row.get(0),
    )
}

pub fn get_booking_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, service_id, employee_id, date, time, extras, total, customer_name, customer_phone, note, status, created_at
         FROM bookings WHERE id = ?1",
        params![id],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Booking row joined with the service and employee names, for the
/// customer- and admin-facing listings.
pub struct BookingDetail {
    pub booking: Booking,
    pub service_name: Option<String>,
    pub employee_name: Option<String>,
}

pub fn get_booking_detail(conn: &Connection, id: i64) -> rusqlite::Result<Option<BookingDetail>> {
    let result = conn.query_row(
        "SELECT b.id, b.user_id, b.service_id, b.employee_id, b.date, b.time, b.extras, b.total, b.customer_name, b.customer_phone, b.note, b.status, b.created_at,
                s.name, e.full_name
         FROM bookings b
         LEFT JOIN services s ON b.service_id = s.id
         LEFT JOIN employees e ON b.employee_id = e.id
         WHERE b.id = ?1",
        params![id],
        parse_booking_detail_row,
    );

    match result {
        Ok(detail) => Ok(Some(detail)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn get_bookings_for_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<BookingDetail>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.user_id, b.service_id, b.employee_id, b.date, b.time, b.extras, b.total, b.customer_name, b.customer_phone, b.note, b.status, b.created_at,
                s.name, e.full_name
         FROM bookings b
         LEFT JOIN services s ON b.service_id = s.id
         LEFT JOIN employees e ON b.employee_id = e.id
         WHERE b.user_id = ?1
         ORDER BY b.created_at DESC, b.id DESC",
    )?;

    let rows = stmt.query_map(params![user_id], parse_booking_detail_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> rusqlite::Result<Vec<BookingDetail>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            "SELECT b.id, b.user_id, b.service_id, b.employee_id, b.date, b.time, b.extras, b.total, b.customer_name, b.customer_phone, b.note, b.status, b.created_at, \
                    s.name, e.full_name \
             FROM bookings b \
             LEFT JOIN services s ON b.service_id = s.id \
             LEFT JOIN employees e ON b.employee_id = e.id \
             WHERE b.status = ?1 ORDER BY b.date DESC, b.time DESC LIMIT ?2"
                .to_string(),
            vec![
                Box::new(status.as_str().to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            "SELECT b.id, b.user_id, b.service_id, b.employee_id, b.date, b.time, b.extras, b.total, b.customer_name, b.customer_phone, b.note, b.status, b.created_at, \
                    s.name, e.full_name \
             FROM bookings b \
             LEFT JOIN services s ON b.service_id = s.id \
             LEFT JOIN employees e ON b.employee_id = e.id \
             ORDER BY b.date DESC, b.time DESC LIMIT ?1"
                .to_string(),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_booking_detail_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

/// Guarded status update: only touches the row while it still holds the
/// status the caller observed. Returns the affected-row count.
pub fn update_booking_status(
    conn: &Connection,
    id: i64,
    from: BookingStatus,
    to: BookingStatus,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![to.as_str(), id, from.as_str()],
    )
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let date_str: String = row.get(4)?;
    let extras_json: String = row.get(6)?;
    let status_str: String = row.get(11)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        employee_id: row.get(3)?,
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        time: row.get(5)?,
        extras: serde_json::from_str(&extras_json).unwrap_or_default(),
        total: row.get(7)?,
        customer_name: row.get(8)?,
        customer_phone: row.get(9)?,
        note: row.get(10)?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Pending),
        created_at: row.get(12)?,
    })
}

fn parse_booking_detail_row(row: &rusqlite::Row) -> rusqlite::Result<BookingDetail> {
    Ok(BookingDetail {
        booking: parse_booking_row(row)?,
        service_name: row.get(13)?,
        employee_name: row.get(14)?,
    })
}

// ── Reviews ──

pub fn upsert_review(
    conn: &Connection,
    booking_id: i64,
    user_id: i64,
    rating: i32,
    feedback: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO reviews (booking_id, user_id, rating, feedback)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(booking_id) DO UPDATE SET
           rating = excluded.rating,
           feedback = excluded.feedback",
        params![booking_id, user_id, rating, feedback],
    )?;
    Ok(())
}

pub fn get_review_by_booking(conn: &Connection, booking_id: i64) -> rusqlite::Result<Option<Review>> {
    let result = conn.query_row(
        "SELECT id, booking_id, user_id, rating, feedback, created_at
         FROM reviews WHERE booking_id = ?1",
        params![booking_id],
        |row| {
            Ok(Review {
                id: row.get(0)?,
                booking_id: row.get(1)?,
                user_id: row.get(2)?,
                rating: row.get(3)?,
                feedback: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    );

    match result {
        Ok(review) => Ok(Some(review)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct ServiceReview {
    pub rating: i32,
    pub feedback: Option<String>,
    pub reviewer_name: String,
}

pub fn get_reviews_for_service(
    conn: &Connection,
    service_id: i64,
) -> rusqlite::Result<Vec<ServiceReview>> {
    let mut stmt = conn.prepare(
        "SELECT r.rating, r.feedback, u.name
         FROM reviews r
         JOIN bookings b ON r.booking_id = b.id
         JOIN users u ON r.user_id = u.id
         WHERE b.service_id = ?1
         ORDER BY r.created_at DESC, r.id DESC",
    )?;

    let rows = stmt.query_map(params![service_id], |row| {
        Ok(ServiceReview {
            rating: row.get(0)?,
            feedback: row.get(1)?,
            reviewer_name: row.get(2)?,
        })
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}
