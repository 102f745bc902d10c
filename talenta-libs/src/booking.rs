use chrono::{DateTime, Duration, Utc};
use log::info;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum BookingStatus {
    Pending,
    Accepted,
    Confirmed,
    Completed,
    Cancelled,
    Unattended,
    Rejected,
    Rescheduled,
}

impl BookingStatus {
    /// No action moves a booking out of these
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum PaymentStatus {
    Pending,
    Paid,
    NotPaid,
}

/// Role of the user performing an action
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Role {
    Artist,
    Expert,
    Sponsor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum BookingAction {
    AcceptOrReject {
        accept: bool,
    },
    Reschedule {
        #[cfg_attr(feature = "serde", serde(rename = "newStartDateTime"))]
        new_start: DateTime<Utc>,
    },
    MarkPaid {
        #[cfg_attr(feature = "serde", serde(rename = "isPaid"))]
        is_paid: bool,
    },
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for BookingAction {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(match u.int_in_range(0..=2u8)? {
            0 => BookingAction::AcceptOrReject {
                accept: u.arbitrary()?,
            },
            1 => {
                // Anywhere within a few years of the epoch of the app
                let seconds = u.int_in_range(1_600_000_000..=1_900_000_000i64)?;
                BookingAction::Reschedule {
                    new_start: DateTime::from_timestamp(seconds, 0)
                        .ok_or(arbitrary::Error::IncorrectFormat)?,
                }
            }
            _ => BookingAction::MarkPaid {
                is_paid: u.arbitrary()?,
            },
        })
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BookingError {
    #[error("Only experts can accept or reject bookings")]
    Permission { role: Role },
    #[error("Cannot {action} a booking that is {from:?}")]
    InvalidTransition {
        from: BookingStatus,
        action: &'static str,
    },
}

/// A session booked by an artist with an expert
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Booking {
    pub booking_id: String,
    pub expert_id: String,
    pub artist_id: String,
    pub service_id: String,
    pub scheduled_start_time: DateTime<Utc>,
    pub time_in_hrs: u32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

impl Booking {
    /// A fresh booking request: pending and not paid
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use talenta_libs::booking::{Booking, BookingStatus, PaymentStatus};
    ///
    /// let start = Utc.with_ymd_and_hms(2024, 1, 1, 3, 30, 0).unwrap();
    /// let booking = Booking::request("expert", "artist", "portfolio-review", start, 2);
    ///
    /// assert_eq!(booking.status, BookingStatus::Pending);
    /// assert_eq!(booking.payment_status, PaymentStatus::NotPaid);
    /// assert_eq!(booking.end_time(), Utc.with_ymd_and_hms(2024, 1, 1, 5, 30, 0).single());
    /// ```
    pub fn request(
        expert_id: &str,
        artist_id: &str,
        service_id: &str,
        scheduled_start_time: DateTime<Utc>,
        time_in_hrs: u32,
    ) -> Booking {
        Booking {
            booking_id: Uuid::new_v4().to_string(),
            expert_id: expert_id.to_string(),
            artist_id: artist_id.to_string(),
            service_id: service_id.to_string(),
            scheduled_start_time,
            time_in_hrs,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::NotPaid,
        }
    }

    /// `None` when the duration runs past the representable calendar
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_start_time
            .checked_add_signed(Duration::hours(i64::from(self.time_in_hrs)))
    }

    /// The booking after `actor` performs `action`. `self` is left untouched.
    ///
    /// # Errors
    /// `BookingError::Permission` when a non-expert accepts or rejects,
    /// `BookingError::InvalidTransition` when accepting or rejecting anything but
    /// a pending booking, or rescheduling a terminal one.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use talenta_libs::booking::{Booking, BookingAction, BookingError, BookingStatus, Role};
    ///
    /// let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    /// let booking = Booking::request("expert", "artist", "mentoring", start, 1);
    ///
    /// let accept = BookingAction::AcceptOrReject { accept: true };
    ///
    /// assert_eq!(
    ///     booking.apply(Role::Artist, &accept),
    ///     Err(BookingError::Permission { role: Role::Artist })
    /// );
    /// assert_eq!(
    ///     booking.apply(Role::Expert, &accept).map(|b| b.status),
    ///     Ok(BookingStatus::Accepted)
    /// );
    /// ```
    pub fn apply(&self, actor: Role, action: &BookingAction) -> Result<Booking, BookingError> {
        let mut next = self.clone();

        match *action {
            BookingAction::AcceptOrReject { accept } => {
                if actor != Role::Expert {
                    return Err(BookingError::Permission { role: actor });
                }
                if self.status != BookingStatus::Pending {
                    return Err(BookingError::InvalidTransition {
                        from: self.status,
                        action: if accept { "accept" } else { "reject" },
                    });
                }
                next.status = if accept {
                    BookingStatus::Accepted
                } else {
                    BookingStatus::Rejected
                };
            }
            BookingAction::Reschedule { new_start } => {
                if self.status.is_terminal() {
                    return Err(BookingError::InvalidTransition {
                        from: self.status,
                        action: "reschedule",
                    });
                }
                next.scheduled_start_time = new_start;
                next.status = BookingStatus::Rescheduled;
            }
            BookingAction::MarkPaid { is_paid } => {
                // Unpaid goes back to PENDING, never NOT_PAID
                next.payment_status = if is_paid {
                    PaymentStatus::Paid
                } else {
                    PaymentStatus::Pending
                };
            }
        }

        info!(
            "Booking {}: {:?}/{:?} -> {:?}/{:?} by {:?}",
            self.booking_id,
            self.status,
            self.payment_status,
            next.status,
            next.payment_status,
            actor
        );

        Ok(next)
    }
}
