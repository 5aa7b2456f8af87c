use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An extra service attached to a booking, with its price captured at
/// booking time rather than referenced live from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOn {
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub date: NaiveDate,
    pub time: String,
    pub extras: Vec<AddOn>,
    pub total: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub note: Option<String>,
    pub status: BookingStatus,
    pub created_at: String,
}

/// Input for a booking insert; the total is computed by the booking
/// service and passed alongside.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub date: NaiveDate,
    pub time: String,
    pub extras: Vec<AddOn>,
    pub customer_name: String,
    pub customer_phone: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Strict parse: unknown labels are rejected, not defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// The legal transition graph: forward one step at a time, with
    /// cancellation reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed)
                | (Confirmed, InProgress)
                | (InProgress, Completed)
                | (Pending | Confirmed | InProgress, Cancelled)
        )
    }
}
