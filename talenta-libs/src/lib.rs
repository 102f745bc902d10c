pub mod availability;
pub mod booking;
pub mod paths;
pub mod slots;
pub mod store;
pub mod time;

pub use availability::{DayOfWeek, WeeklyAvailability};
pub use booking::{Booking, BookingAction, BookingError, BookingStatus, PaymentStatus, Role};
pub use slots::{expand, DisplaySlot, SlotExpander, SlotOrder};
pub use time::{LocalTime, SlotError, TimeRange};
