#![no_main]
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use talenta_libs::booking::{Booking, BookingAction, BookingError, BookingStatus, Role};

fuzz_target!(|actions: Vec<(Role, BookingAction)>| {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let mut booking = Booking::request("expert", "artist", "service", start, 1);

    for (role, action) in actions.iter() {
        match booking.apply(*role, action) {
            Ok(next) => {
                assert!(
                    !booking.status.is_terminal() || next.status == booking.status,
                    "Left terminal status {:?} via {:?}",
                    booking.status,
                    action
                );
                assert!(
                    booking.status == BookingStatus::Pending
                        || next.status != BookingStatus::Pending,
                    "Returned to PENDING via {:?}",
                    action
                );
                if let BookingAction::AcceptOrReject { .. } = action {
                    assert_eq!(*role, Role::Expert, "Non-expert decided a booking");
                }
                booking = next;
            }
            Err(BookingError::Permission { role: denied }) => {
                assert_eq!(denied, *role);
                assert_ne!(*role, Role::Expert);
            }
            Err(BookingError::InvalidTransition { from, .. }) => {
                assert_eq!(from, booking.status);
            }
        }
    }
});
