use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;

/// Attaches a review to a completed booking. Keyed on the booking id:
/// resubmission overwrites the stored rating and feedback, so the call
/// is idempotent and a booking never carries two reviews.
pub fn submit_review(
    conn: &Connection,
    booking_id: i64,
    user_id: i64,
    rating: i32,
    feedback: Option<&str>,
) -> Result<(), AppError> {
    if booking_id <= 0 || user_id <= 0 {
        return Err(AppError::InvalidInput(
            "missing or invalid booking_id or user_id".to_string(),
        ));
    }
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidInput(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if booking.user_id != user_id {
        return Err(AppError::Forbidden(
            "booking does not belong to this user".to_string(),
        ));
    }

    if booking.status != BookingStatus::Completed {
        return Err(AppError::InvalidInput(
            "booking must be completed before it can be reviewed".to_string(),
        ));
    }

    queries::upsert_review(conn, booking_id, user_id, rating, feedback)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::NewBooking;
    use crate::services::booking::{self, Requester};
    use chrono::NaiveDate;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, name, phone) VALUES (1, 'Alice', '0901000001'), (2, 'Bob', '0901000002');
             INSERT INTO services (id, name, price, status) VALUES (1, 'Haircut', 150000, 'active');
             INSERT INTO employees (id, full_name) VALUES (1, 'Tuan');",
        )
        .unwrap();
        conn
    }

    fn booked(conn: &mut Connection) -> i64 {
        let booking = NewBooking {
            user_id: 1,
            service_id: 1,
            employee_id: Some(1),
            date: NaiveDate::parse_from_str("2024-06-01", "%Y-%m-%d").unwrap(),
            time: "10:00".to_string(),
            extras: vec![],
            customer_name: "Alice".to_string(),
            customer_phone: "0901000001".to_string(),
            note: None,
        };
        booking::create_booking(conn, booking, 150000).unwrap()
    }

    fn completed(conn: &mut Connection) -> i64 {
        let id = booked(conn);
        for next in [
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
            BookingStatus::Completed,
        ] {
            booking::transition(conn, id, Requester::Staff, next).unwrap();
        }
        id
    }

    #[test]
    fn test_review_stored() {
        let mut conn = setup_db();
        let id = completed(&mut conn);

        submit_review(&conn, id, 1, 5, Some("great cut")).unwrap();

        let review = queries::get_review_by_booking(&conn, id).unwrap().unwrap();
        assert_eq!(review.rating, 5);
        assert_eq!(review.feedback.as_deref(), Some("great cut"));
    }

    #[test]
    fn test_resubmission_overwrites_not_duplicates() {
        let mut conn = setup_db();
        let id = completed(&mut conn);

        submit_review(&conn, id, 1, 5, Some("great")).unwrap();
        submit_review(&conn, id, 1, 3, Some("on second thought")).unwrap();

        let review = queries::get_review_by_booking(&conn, id).unwrap().unwrap();
        assert_eq!(review.rating, 3);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM reviews WHERE booking_id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_rating_out_of_bounds() {
        let mut conn = setup_db();
        let id = completed(&mut conn);

        assert!(matches!(
            submit_review(&conn, id, 1, 0, None),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            submit_review(&conn, id, 1, 6, None),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_booking() {
        let conn = setup_db();
        assert!(matches!(
            submit_review(&conn, 9999, 1, 5, None),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_wrong_customer() {
        let mut conn = setup_db();
        let id = completed(&mut conn);

        assert!(matches!(
            submit_review(&conn, id, 2, 5, None),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_rejects_unfinished_booking() {
        let mut conn = setup_db();
        let id = booked(&mut conn);

        assert!(matches!(
            submit_review(&conn, id, 1, 5, None),
            Err(AppError::InvalidInput(_))
        ));
    }
}
