pub mod availability;
pub mod booking;
pub mod lifecycle;
pub mod payments;
