use crate::availability::{DayOfWeek, WeeklyAvailability};
use crate::time::{parse_zone, LocalTime, SlotError};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use core::fmt;
use core::str::FromStr;
use itertools::Itertools;
use log::{debug, trace};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A bookable hourly start, as the viewer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct DisplaySlot {
    /// `HH:mm` in the viewer's zone
    pub time: String,
    /// The viewer-local date, which may differ from the requested date
    pub date: NaiveDate,
    pub starts_at: DateTime<Utc>,
}

impl fmt::Display for DisplaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.time)
    }
}

/// How slots collected across several ranges are ordered
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum SlotOrder {
    /// Range by range, hour by hour. Duplicates and out of order entries
    /// survive when ranges overlap or cross midnight after conversion.
    #[default]
    AsGenerated,
    /// Chronological, each displayed date and time once. When the viewer's
    /// clock falls back, the earlier of two instants shown alike is kept.
    Sorted,
}

impl FromStr for SlotOrder {
    type Err = SlotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "as-generated" | "as_generated" => Ok(SlotOrder::AsGenerated),
            "sorted" => Ok(SlotOrder::Sorted),
            _ => Err(SlotError::UnknownOrder {
                value: value.to_string(),
            }),
        }
    }
}

/// Expands weekly availability into the hourly slots one viewer sees
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SlotExpander {
    viewer: Tz,
    order: SlotOrder,
}

impl SlotExpander {
    pub fn new(viewer: Tz) -> SlotExpander {
        SlotExpander {
            viewer,
            order: SlotOrder::default(),
        }
    }

    /// Builds an expander for a viewer zone identifier
    ///
    /// # Errors
    /// `SlotError::TimeZone` when the identifier is not in the tz database.
    pub fn for_zone(viewer: &str) -> Result<SlotExpander, SlotError> {
        Ok(SlotExpander::new(parse_zone(viewer)?))
    }

    pub fn with_order(mut self, order: SlotOrder) -> SlotExpander {
        self.order = order;
        self
    }

    pub fn viewer(&self) -> Tz {
        self.viewer
    }

    pub fn order(&self) -> SlotOrder {
        self.order
    }

    /// Slots `availability` offers on `date`, converted into the viewer's zone.
    ///
    /// Local times the provider's zone skips (a DST gap) produce no slot; times
    /// it repeats resolve to the earlier instant.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use talenta_libs::availability::{DayOfWeek, WeeklyAvailability};
    /// use talenta_libs::slots::SlotExpander;
    /// use talenta_libs::time::TimeRange;
    ///
    /// let availability = WeeklyAvailability::new("Asia/Kolkata")
    ///     .with(DayOfWeek::Monday, TimeRange::parse("09:00", "12:00").unwrap());
    ///
    /// let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// // The end is exclusive: 09:00, 10:00 and 11:00 IST, nothing at 12:00
    /// let slots = SlotExpander::for_zone("UTC")
    ///     .unwrap()
    ///     .expand(&availability, monday)
    ///     .unwrap();
    ///
    /// assert_eq!(
    ///     slots.iter().map(|s| s.time.as_str()).collect::<Vec<_>>(),
    ///     vec!["03:30", "04:30", "05:30"]
    /// );
    /// ```
    ///
    /// # Errors
    /// `SlotError::TimeZone` when the provider's zone is unknown.
    pub fn expand(
        &self,
        availability: &WeeklyAvailability,
        date: NaiveDate,
    ) -> Result<Vec<DisplaySlot>, SlotError> {
        let provider = availability.zone()?;
        let day = DayOfWeek::of(date);
        let ranges = availability.ranges(day);

        if ranges.is_empty() {
            debug!("No availability on {:?} {}", day, date);
            return Ok(vec![]);
        }

        let slots = ranges
            .iter()
            .flat_map(|range| range.hourly())
            .filter_map(|time| self.convert(provider, date, time))
            .collect_vec();

        debug!(
            "Expanded {} range(s) on {:?} {} into {} slot(s) for {}",
            ranges.len(),
            day,
            date,
            slots.len(),
            self.viewer
        );

        Ok(match self.order {
            SlotOrder::AsGenerated => slots,
            SlotOrder::Sorted => slots
                .into_iter()
                .sorted_by_key(|slot| slot.starts_at)
                .unique_by(|slot| (slot.date, slot.time.clone()))
                .collect(),
        })
    }

    /// Expands several dates, keeping their order
    pub fn expand_days(
        &self,
        availability: &WeeklyAvailability,
        dates: &[NaiveDate],
    ) -> Result<Vec<(NaiveDate, Vec<DisplaySlot>)>, SlotError> {
        availability.validate()?;

        #[cfg(feature = "rayon")]
        let days = dates.par_iter();
        #[cfg(not(feature = "rayon"))]
        let days = dates.iter();

        days.map(|&date| {
            self.expand(availability, date)
                .map(|slots| (date, slots))
        })
        .collect()
    }

    fn convert(&self, provider: Tz, date: NaiveDate, time: LocalTime) -> Option<DisplaySlot> {
        let local = date.and_time(time.to_naive()?);

        let Some(instant) = provider.from_local_datetime(&local).earliest() else {
            trace!("{} does not exist in {}, skipping", local, provider);
            return None;
        };

        let seen = instant.with_timezone(&self.viewer);

        Some(DisplaySlot {
            time: seen.format("%H:%M").to_string(),
            date: seen.date_naive(),
            starts_at: instant.with_timezone(&Utc),
        })
    }
}

/// Expands with the default slot order
pub fn expand(
    availability: &WeeklyAvailability,
    date: NaiveDate,
    viewer: Tz,
) -> Result<Vec<DisplaySlot>, SlotError> {
    SlotExpander::new(viewer).expand(availability, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeRange;
    use chrono_tz::{America, Asia, Europe, UTC};

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn times(slots: &[DisplaySlot]) -> Vec<&str> {
        slots.iter().map(|s| s.time.as_str()).collect()
    }

    fn monday() -> NaiveDate {
        date(2024, 1, 1)
    }

    #[test]
    fn no_ranges_no_slots() {
        let availability = WeeklyAvailability::new("UTC");
        assert_eq!(expand(&availability, monday(), UTC), Ok(vec![]));

        let availability = WeeklyAvailability::new("UTC").with(DayOfWeek::Tuesday, range("09:00", "10:00"));
        assert_eq!(expand(&availability, monday(), UTC), Ok(vec![]));
    }

    #[test]
    fn same_zone_is_end_exclusive() {
        let availability =
            WeeklyAvailability::new("Europe/Paris").with(DayOfWeek::Monday, range("09:00", "11:00"));

        let slots = expand(&availability, monday(), Europe::Paris).unwrap();
        assert_eq!(times(&slots), vec!["09:00", "10:00"]);
    }

    #[test]
    fn end_of_day_yields_last_hour() {
        let availability = WeeklyAvailability::new("UTC").with(DayOfWeek::Monday, range("23:00", "24:00"));

        let slots = expand(&availability, monday(), UTC).unwrap();
        assert_eq!(times(&slots), vec!["23:00"]);
        assert_eq!(slots[0].date, monday());
    }

    #[test]
    fn equal_bounds_yield_nothing() {
        let availability = WeeklyAvailability::new("UTC")
            .with(DayOfWeek::Monday, range("10:00", "10:00"))
            .with(DayOfWeek::Monday, range("12:00", "11:00"));

        assert_eq!(expand(&availability, monday(), UTC), Ok(vec![]));
    }

    #[test]
    fn fractional_offsets_shift_minutes() {
        let availability =
            WeeklyAvailability::new("Asia/Kolkata").with(DayOfWeek::Monday, range("09:00", "12:00"));

        let slots = expand(&availability, monday(), UTC).unwrap();
        assert_eq!(times(&slots), vec!["03:30", "04:30", "05:30"]);
        assert_eq!(
            slots[0].starts_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn round_trips_through_the_same_zone() {
        let availability =
            WeeklyAvailability::new("Asia/Kolkata").with(DayOfWeek::Monday, range("00:00", "24:00"));

        let slots = expand(&availability, monday(), Asia::Kolkata).unwrap();
        let expected = range("00:00", "24:00")
            .hourly()
            .map(|t| t.to_string())
            .collect::<Vec<_>>();

        assert_eq!(times(&slots), expected);
        assert!(slots.iter().all(|s| s.date == monday()));
    }

    #[test]
    fn crossing_midnight_keeps_generation_order() {
        // Tokyo is UTC+9: 08:00 and 10:00 land on either side of UTC midnight
        let availability = WeeklyAvailability::new("Asia/Tokyo")
            .with(DayOfWeek::Monday, range("10:00", "11:00"))
            .with(DayOfWeek::Monday, range("08:00", "10:00"));

        let slots = expand(&availability, monday(), UTC).unwrap();
        assert_eq!(times(&slots), vec!["01:00", "23:00", "00:00"]);
        assert_eq!(slots[1].date, date(2023, 12, 31));

        let sorted = SlotExpander::new(UTC)
            .with_order(SlotOrder::Sorted)
            .expand(&availability, monday())
            .unwrap();
        assert_eq!(times(&sorted), vec!["23:00", "00:00", "01:00"]);
    }

    #[test]
    fn overlapping_ranges_duplicate_unless_sorted() {
        let availability = WeeklyAvailability::new("UTC")
            .with(DayOfWeek::Monday, range("09:00", "11:00"))
            .with(DayOfWeek::Monday, range("10:00", "12:00"));

        let slots = expand(&availability, monday(), UTC).unwrap();
        assert_eq!(times(&slots), vec!["09:00", "10:00", "10:00", "11:00"]);

        let sorted = SlotExpander::new(UTC)
            .with_order(SlotOrder::Sorted)
            .expand(&availability, monday())
            .unwrap();
        assert_eq!(times(&sorted), vec!["09:00", "10:00", "11:00"]);
    }

    #[test]
    fn spring_forward_gap_is_skipped() {
        // 2024-03-10 02:00 does not exist in New York
        let sunday = date(2024, 3, 10);
        let availability =
            WeeklyAvailability::new("America/New_York").with(DayOfWeek::Sunday, range("01:00", "04:00"));

        let slots = expand(&availability, sunday, America::New_York).unwrap();
        assert_eq!(times(&slots), vec!["01:00", "03:00"]);
    }

    #[test]
    fn fall_back_takes_earlier_instant() {
        // 2024-11-03 01:00 happens twice in New York
        let sunday = date(2024, 11, 3);
        let availability =
            WeeklyAvailability::new("America/New_York").with(DayOfWeek::Sunday, range("01:00", "02:00"));

        let slots = expand(&availability, sunday, UTC).unwrap();
        assert_eq!(times(&slots), vec!["05:00"]);
    }

    #[test]
    fn unknown_provider_zone_is_an_error() {
        let availability = WeeklyAvailability::new("Nowhere/Special").with(DayOfWeek::Monday, range("09:00", "10:00"));

        assert_eq!(
            expand(&availability, monday(), UTC),
            Err(SlotError::TimeZone {
                zone: "Nowhere/Special".to_string()
            })
        );
        assert!(SlotExpander::for_zone("Nowhere/Else").is_err());
    }

    #[test]
    fn expands_several_days_in_order() {
        let availability = WeeklyAvailability::new("UTC")
            .with(DayOfWeek::Monday, range("09:00", "10:00"))
            .with(DayOfWeek::Wednesday, range("15:00", "17:00"));

        let dates = monday().iter_days().take(3).collect::<Vec<_>>();
        let days = SlotExpander::new(UTC).expand_days(&availability, &dates).unwrap();

        assert_eq!(
            days.iter()
                .map(|(date, slots)| (*date, times(slots).len()))
                .collect::<Vec<_>>(),
            vec![(dates[0], 1), (dates[1], 0), (dates[2], 2)]
        );
    }

    #[test]
    fn viewer_fall_back_shows_each_time_once() {
        // 05:00Z and 06:00Z are both 01:00 in New York on 2024-11-03
        let sunday = date(2024, 11, 3);
        let availability = WeeklyAvailability::new("UTC").with(DayOfWeek::Sunday, range("05:00", "07:00"));

        let generated = expand(&availability, sunday, America::New_York).unwrap();
        assert_eq!(times(&generated), vec!["01:00", "01:00"]);

        let sorted = SlotExpander::new(America::New_York)
            .with_order(SlotOrder::Sorted)
            .expand(&availability, sunday)
            .unwrap();
        assert_eq!(times(&sorted), vec!["01:00"]);
        assert_eq!(
            sorted[0].starts_at,
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn sorted_runs_across_viewer_midnight() {
        // The provider's Monday ends at 04:30 on the viewer's Tuesday
        let availability = WeeklyAvailability::new("UTC").with(DayOfWeek::Monday, range("00:00", "24:00"));

        let sorted = SlotExpander::new(Asia::Kolkata)
            .with_order(SlotOrder::Sorted)
            .expand(&availability, monday())
            .unwrap();

        assert_eq!(sorted.len(), 24);
        assert_eq!(sorted.first().map(|s| s.time.as_str()), Some("05:30"));
        assert_eq!(sorted.last().map(|s| s.time.as_str()), Some("04:30"));
        assert_eq!(sorted.last().map(|s| s.date), Some(date(2024, 1, 2)));
    }

    #[test]
    fn slot_order_from_config() {
        assert_eq!("sorted".parse(), Ok(SlotOrder::Sorted));
        assert_eq!(" As-Generated ".parse(), Ok(SlotOrder::AsGenerated));
        assert_eq!(
            "random".parse::<SlotOrder>(),
            Err(SlotError::UnknownOrder {
                value: "random".to_string()
            })
        );
    }
}
