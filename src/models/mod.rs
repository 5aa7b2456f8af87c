pub mod booking;
pub mod review;

pub use booking::{AddOn, Booking, BookingStatus, NewBooking};
pub use review::Review;
