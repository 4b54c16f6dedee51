pub mod booking;
pub mod payment;
pub mod room;

pub use booking::{Booking, BookingStatus, PaymentMethod};
pub use payment::{Payment, PaymentStatus, PaymentType};
pub use room::{Room, RoomStatus};
