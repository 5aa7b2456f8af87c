use chrono::NaiveTime;
use rusqlite::{ffi, Connection};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingStatus, NewBooking};

/// Who is asking for a status change. Customers are ownership-checked
/// and may only cancel a still-pending booking; staff may perform any
/// legal transition.
#[derive(Debug, Clone, Copy)]
pub enum Requester {
    Customer(i64),
    Staff,
}

/// Creates a booking inside a single transaction: the slot-conflict
/// check and the insert either both happen or neither does. The partial
/// unique index on (employee_id, date, time) backstops the check under
/// concurrent writers; its violation is reported as a slot conflict.
pub fn create_booking(
    conn: &mut Connection,
    booking: NewBooking,
    service_price: i64,
) -> Result<i64, AppError> {
    if NaiveTime::parse_from_str(&booking.time, "%H:%M").is_err() {
        return Err(AppError::InvalidInput(format!(
            "invalid time slot: {}",
            booking.time
        )));
    }
    if let Some(employee_id) = booking.employee_id {
        if employee_id <= 0 {
            return Err(AppError::InvalidInput(
                "missing or invalid employee_id".to_string(),
            ));
        }
    }

    // Frozen at creation; later catalog changes never touch it.
    let total = service_price + booking.extras.iter().map(|a| a.price).sum::<i64>();

    let tx = conn.transaction()?;

    if let Some(employee_id) = booking.employee_id {
        if queries::slot_taken(&tx, employee_id, booking.date, &booking.time)? {
            return Err(AppError::SlotConflict);
        }
    }

    let id = match queries::insert_booking(&tx, &booking, total) {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => return Err(AppError::SlotConflict),
        Err(e) if is_fk_violation(&e) => {
            return Err(AppError::InvalidInput(
                "unknown employee, service, or user reference".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    tx.commit()?;
    Ok(id)
}

pub fn transition(
    conn: &Connection,
    booking_id: i64,
    requester: Requester,
    new_status: BookingStatus,
) -> Result<BookingStatus, AppError> {
    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if let Requester::Customer(user_id) = requester {
        if booking.user_id != user_id {
            return Err(AppError::Forbidden(
                "booking does not belong to this user".to_string(),
            ));
        }
        if new_status != BookingStatus::Cancelled {
            return Err(AppError::Forbidden(
                "customers may only cancel their bookings".to_string(),
            ));
        }
    }

    if !booking.status.can_transition_to(new_status) {
        return Err(AppError::InvalidTransition {
            from: booking.status.as_str(),
            to: new_status.as_str(),
        });
    }

    // Once confirmed, cancellation goes through the shop.
    if matches!(requester, Requester::Customer(_)) && booking.status != BookingStatus::Pending {
        return Err(AppError::Forbidden(
            "bookings can only be cancelled by the customer while still pending".to_string(),
        ));
    }

    let updated = queries::update_booking_status(conn, booking_id, booking.status, new_status)?;
    if updated == 0 {
        return Err(AppError::NotFound("booking not found".to_string()));
    }
    Ok(new_status)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
}

fn is_fk_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::AddOn;
    use chrono::NaiveDate;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, name, phone) VALUES (1, 'Alice', '0901000001'), (2, 'Bob', '0901000002');
             INSERT INTO services (id, name, price, status) VALUES (1, 'Haircut', 150000, 'active');
             INSERT INTO employees (id, full_name) VALUES (1, 'Tuan'), (2, 'Minh'), (3, 'Huy');",
        )
        .unwrap();
        conn
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_booking(employee_id: Option<i64>, day: &str, time: &str) -> NewBooking {
        NewBooking {
            user_id: 1,
            service_id: 1,
            employee_id,
            date: date(day),
            time: time.to_string(),
            extras: vec![],
            customer_name: "Alice".to_string(),
            customer_phone: "0901000001".to_string(),
            note: None,
        }
    }

    #[test]
    fn test_create_booking_starts_pending() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();

        let booking = queries::get_booking_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total, 150000);
    }

    #[test]
    fn test_total_includes_add_ons() {
        let mut conn = setup_db();
        let mut booking = new_booking(Some(1), "2024-06-01", "10:00");
        booking.extras = vec![
            AddOn {
                name: "Beard trim".to_string(),
                price: 50000,
            },
            AddOn {
                name: "Hair wash".to_string(),
                price: 20000,
            },
        ];

        let id = create_booking(&mut conn, booking, 150000).unwrap();
        let stored = queries::get_booking_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored.total, 220000);
        assert_eq!(stored.extras.len(), 2);
    }

    #[test]
    fn test_total_frozen_after_catalog_change() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();

        conn.execute("UPDATE services SET price = 999999 WHERE id = 1", [])
            .unwrap();

        let stored = queries::get_booking_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored.total, 150000);
    }

    #[test]
    fn test_slot_conflict_same_slot() {
        let mut conn = setup_db();
        create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000).unwrap();

        let result = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000);
        assert!(matches!(result, Err(AppError::SlotConflict)));
    }

    #[test]
    fn test_different_employee_same_slot_is_fine() {
        let mut conn = setup_db();
        create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000).unwrap();

        let result = create_booking(&mut conn, new_booking(Some(2), "2024-06-01", "10:00"), 150000);
        assert!(result.is_ok());
    }

    #[test]
    fn test_cancelled_booking_frees_slot() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();
        transition(&conn, id, Requester::Staff, BookingStatus::Cancelled).unwrap();

        let result = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000);
        assert!(result.is_ok());
    }

    #[test]
    fn test_unassigned_bookings_never_conflict() {
        let mut conn = setup_db();
        create_booking(&mut conn, new_booking(None, "2024-06-01", "10:00"), 150000).unwrap();

        let result = create_booking(&mut conn, new_booking(None, "2024-06-01", "10:00"), 150000);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_time_slot_rejected() {
        let mut conn = setup_db();
        let result = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "25:99"), 150000);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_employee_rejected() {
        let mut conn = setup_db();
        let result = create_booking(&mut conn, new_booking(Some(42), "2024-06-01", "10:00"), 150000);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_staff_walks_full_lifecycle() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();

        for next in [
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
            BookingStatus::Completed,
        ] {
            let status = transition(&conn, id, Requester::Staff, next).unwrap();
            assert_eq!(status, next);
        }

        let stored = queries::get_booking_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Completed);
    }

    #[test]
    fn test_backwards_transition_rejected() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();
        transition(&conn, id, Requester::Staff, BookingStatus::Confirmed).unwrap();

        let result = transition(&conn, id, Requester::Staff, BookingStatus::Pending);
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    }

    #[test]
    fn test_cancel_already_cancelled_is_invalid_transition() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();
        transition(&conn, id, Requester::Staff, BookingStatus::Cancelled).unwrap();

        let result = transition(&conn, id, Requester::Staff, BookingStatus::Cancelled);
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    }

    #[test]
    fn test_customer_cancels_own_pending_booking() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();

        let status = transition(&conn, id, Requester::Customer(1), BookingStatus::Cancelled)
            .unwrap();
        assert_eq!(status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_customer_cannot_cancel_confirmed_booking() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();
        transition(&conn, id, Requester::Staff, BookingStatus::Confirmed).unwrap();

        let result = transition(&conn, id, Requester::Customer(1), BookingStatus::Cancelled);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_customer_cannot_confirm() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();

        let result = transition(&conn, id, Requester::Customer(1), BookingStatus::Confirmed);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_customer_cannot_touch_someone_elses_booking() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();

        let result = transition(&conn, id, Requester::Customer(2), BookingStatus::Cancelled);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_transition_unknown_booking() {
        let conn = setup_db();
        let result = transition(&conn, 9999, Requester::Staff, BookingStatus::Confirmed);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_transition_only_touches_status() {
        let mut conn = setup_db();
        let id = create_booking(&mut conn, new_booking(Some(1), "2024-06-01", "10:00"), 150000)
            .unwrap();
        let before = queries::get_booking_by_id(&conn, id).unwrap().unwrap();

        transition(&conn, id, Requester::Staff, BookingStatus::Confirmed).unwrap();

        let after = queries::get_booking_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(after.status, BookingStatus::Confirmed);
        assert_eq!(after.total, before.total);
        assert_eq!(after.time, before.time);
        assert_eq!(after.customer_name, before.customer_name);
        assert_eq!(after.created_at, before.created_at);
    }
}
