use crate::availability::WeeklyAvailability;
use crate::booking::{Booking, BookingAction, BookingError, Role};
use crate::paths::Collection;
use crate::slots::{DisplaySlot, SlotExpander};
use crate::time::SlotError;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    #[error("No document at {path}")]
    NotFound { path: String },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub trait BookingStore {
    fn booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError>;
    fn save_booking(&mut self, booking: &Booking) -> Result<(), StoreError>;
}

pub trait AvailabilityStore {
    fn availability(&self, expert_id: &str) -> Result<Option<WeeklyAvailability>, StoreError>;
    fn save_availability(
        &mut self,
        expert_id: &str,
        availability: &WeeklyAvailability,
    ) -> Result<(), StoreError>;
}

/// Everything that can go wrong between a user action and the store
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ActionError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// In-process documents keyed by their collection path
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    bookings: HashMap<String, Booking>,
    availability: HashMap<String, WeeklyAvailability>,
    reject_writes: Option<String>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Fails every following write with `StoreError::Unavailable(reason)`
    pub fn reject_writes(&mut self, reason: &str) {
        self.reject_writes = Some(reason.to_string());
    }

    pub fn accept_writes(&mut self) {
        self.reject_writes = None;
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        match &self.reject_writes {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl BookingStore for MemoryStore {
    fn booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .bookings
            .get(&Collection::Bookings.document(booking_id))
            .cloned())
    }

    fn save_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        self.check_writable()?;
        self.bookings.insert(
            Collection::Bookings.document(&booking.booking_id),
            booking.clone(),
        );
        Ok(())
    }
}

impl AvailabilityStore for MemoryStore {
    fn availability(&self, expert_id: &str) -> Result<Option<WeeklyAvailability>, StoreError> {
        Ok(self
            .availability
            .get(&Collection::ExpertAvailability.document(expert_id))
            .cloned())
    }

    fn save_availability(
        &mut self,
        expert_id: &str,
        availability: &WeeklyAvailability,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        self.availability.insert(
            Collection::ExpertAvailability.document(expert_id),
            availability.clone(),
        );
        Ok(())
    }
}

/// Slots an expert offers on `date`. Experts without saved availability offer none.
pub fn slots_for_expert<S: AvailabilityStore>(
    store: &S,
    expert_id: &str,
    date: NaiveDate,
    expander: &SlotExpander,
) -> Result<Vec<DisplaySlot>, ActionError> {
    match store.availability(expert_id)? {
        Some(availability) => Ok(expander.expand(&availability, date)?),
        None => {
            debug!("Expert {} has not published availability", expert_id);
            Ok(vec![])
        }
    }
}

/// Validates, normalizes and saves an expert's weekly availability
pub fn publish_availability<S: AvailabilityStore>(
    store: &mut S,
    expert_id: &str,
    availability: &WeeklyAvailability,
) -> Result<WeeklyAvailability, ActionError> {
    availability.validate()?;
    let normalized = availability.normalized();

    store.save_availability(expert_id, &normalized)?;
    info!(
        "Published availability for {} in {}: {} weekly hour(s)",
        expert_id,
        normalized.timezone,
        normalized
            .schedule
            .keys()
            .map(|&day| normalized.hours_on(day))
            .sum::<usize>()
    );

    Ok(normalized)
}

/// A booking as shown on screen, with the last error the user has not dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    booking: Booking,
    error: Option<String>,
}

impl BookingView {
    pub fn new(booking: Booking) -> BookingView {
        BookingView {
            booking,
            error: None,
        }
    }

    /// Loads a booking through `store`
    pub fn load<S: BookingStore>(store: &S, booking_id: &str) -> Result<BookingView, StoreError> {
        store
            .booking(booking_id)?
            .map(BookingView::new)
            .ok_or_else(|| StoreError::NotFound {
                path: Collection::Bookings.document(booking_id),
            })
    }

    pub fn booking(&self) -> &Booking {
        &self.booking
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Applies `action`, writes the result and only then shows it.
    /// On failure the shown booking is kept and the message is recorded.
    pub fn perform<S: BookingStore>(
        &mut self,
        store: &mut S,
        actor: Role,
        action: &BookingAction,
    ) -> Result<(), ActionError> {
        let result = self
            .booking
            .apply(actor, action)
            .map_err(ActionError::from)
            .and_then(|next| {
                store.save_booking(&next)?;
                Ok(next)
            });

        match result {
            Ok(next) => {
                self.booking = next;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                warn!("Booking {}: {}", self.booking.booking_id, err);
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::DayOfWeek;
    use crate::booking::{BookingStatus, PaymentStatus};
    use crate::time::TimeRange;
    use chrono::{TimeZone, Utc};

    fn pending() -> Booking {
        Booking::request(
            "expert-1",
            "artist-1",
            "voice-coaching",
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            1,
        )
    }

    #[test]
    fn accepted_transition_is_written_then_shown() {
        let mut store = MemoryStore::new();
        let booking = pending();
        store.save_booking(&booking).unwrap();

        let mut view = BookingView::load(&store, &booking.booking_id).unwrap();
        view.perform(&mut store, Role::Expert, &BookingAction::AcceptOrReject { accept: true })
            .unwrap();

        assert_eq!(view.booking().status, BookingStatus::Accepted);
        assert_eq!(view.error(), None);
        assert_eq!(
            store.booking(&booking.booking_id).unwrap().map(|b| b.status),
            Some(BookingStatus::Accepted)
        );
    }

    #[test]
    fn failed_write_keeps_local_state() {
        let mut store = MemoryStore::new();
        let mut view = BookingView::new(pending());

        store.reject_writes("offline");
        let err = view
            .perform(&mut store, Role::Artist, &BookingAction::MarkPaid { is_paid: true })
            .unwrap_err();

        assert_eq!(err, ActionError::Store(StoreError::Unavailable("offline".to_string())));
        assert_eq!(view.booking().payment_status, PaymentStatus::NotPaid);
        assert_eq!(view.error(), Some("Store unavailable: offline"));

        // The user retries once the store is back
        store.accept_writes();
        view.perform(&mut store, Role::Artist, &BookingAction::MarkPaid { is_paid: true })
            .unwrap();
        assert_eq!(view.booking().payment_status, PaymentStatus::Paid);
        assert_eq!(view.error(), None);
    }

    #[test]
    fn permission_error_is_not_written() {
        let mut store = MemoryStore::new();
        let mut view = BookingView::new(pending());

        let result = view.perform(
            &mut store,
            Role::Artist,
            &BookingAction::AcceptOrReject { accept: true },
        );

        assert!(matches!(result, Err(ActionError::Booking(BookingError::Permission { .. }))));
        assert_eq!(view.booking().status, BookingStatus::Pending);
        assert_eq!(view.error(), Some("Only experts can accept or reject bookings"));
        assert_eq!(store.booking(&view.booking().booking_id), Ok(None));

        view.clear_error();
        assert_eq!(view.error(), None);
    }

    #[test]
    fn loading_a_missing_booking() {
        let store = MemoryStore::new();
        assert_eq!(
            BookingView::load(&store, "nope"),
            Err(StoreError::NotFound {
                path: "bookings/nope".to_string()
            })
        );
    }

    #[test]
    fn published_availability_is_expanded() {
        let mut store = MemoryStore::new();
        let availability = WeeklyAvailability::new("UTC")
            .with(DayOfWeek::Monday, TimeRange::parse("11:00", "12:00").unwrap())
            .with(DayOfWeek::Monday, TimeRange::parse("09:00", "11:30").unwrap());

        let published = publish_availability(&mut store, "expert-1", &availability).unwrap();
        assert_eq!(
            published.ranges(DayOfWeek::Monday),
            &[TimeRange::parse("09:00", "12:00").unwrap()]
        );

        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let expander = SlotExpander::for_zone("UTC").unwrap();
        let slots = slots_for_expert(&store, "expert-1", monday, &expander).unwrap();

        assert_eq!(
            slots.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["09:00", "10:00", "11:00"]
        );
        assert_eq!(slots_for_expert(&store, "expert-2", monday, &expander), Ok(vec![]));
    }

    #[test]
    fn publishing_rejects_unknown_zone() {
        let mut store = MemoryStore::new();
        let availability = WeeklyAvailability::new("Moon/Tranquility");

        assert!(matches!(
            publish_availability(&mut store, "expert-1", &availability),
            Err(ActionError::Slot(SlotError::TimeZone { .. }))
        ));
        assert_eq!(store.availability("expert-1"), Ok(None));
    }
}
