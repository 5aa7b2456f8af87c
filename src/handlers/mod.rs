pub mod bookings;
pub mod health;
pub mod reviews;
pub mod slots;
