pub mod accounts;
pub mod booking;
pub mod catalog;
pub mod reviews;
