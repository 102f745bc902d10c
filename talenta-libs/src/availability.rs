use crate::time::{parse_zone, SlotError, TimeMerge, TimeRange};
use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day keys of an expert's weekly schedule, Sunday first
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// The weekday `date` falls on.
    /// A calendar date names the same weekday in every zone, so the date is
    /// read as a date of the provider's calendar.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use talenta_libs::availability::DayOfWeek;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// assert_eq!(DayOfWeek::of(date), DayOfWeek::Monday);
    /// ```
    pub fn of(date: NaiveDate) -> DayOfWeek {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }
}

/// An expert's recurring weekly availability, expressed in their own zone
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct WeeklyAvailability {
    pub timezone: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub schedule: BTreeMap<DayOfWeek, Vec<TimeRange>>,
}

impl WeeklyAvailability {
    pub fn new(timezone: &str) -> WeeklyAvailability {
        WeeklyAvailability {
            timezone: timezone.to_string(),
            schedule: BTreeMap::new(),
        }
    }

    /// Builder helper appending a range to `day`
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::availability::{DayOfWeek, WeeklyAvailability};
    /// use talenta_libs::time::TimeRange;
    ///
    /// let availability = WeeklyAvailability::new("Europe/Berlin")
    ///     .with(DayOfWeek::Monday, TimeRange::parse("09:00", "12:00").unwrap())
    ///     .with(DayOfWeek::Monday, TimeRange::parse("14:00", "16:00").unwrap());
    ///
    /// assert_eq!(availability.ranges(DayOfWeek::Monday).len(), 2);
    /// assert!(availability.ranges(DayOfWeek::Sunday).is_empty());
    /// ```
    pub fn with(mut self, day: DayOfWeek, range: TimeRange) -> WeeklyAvailability {
        self.schedule.entry(day).or_default().push(range);
        self
    }

    pub fn ranges(&self, day: DayOfWeek) -> &[TimeRange] {
        self.schedule.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The provider's reference frame
    pub fn zone(&self) -> Result<Tz, SlotError> {
        parse_zone(&self.timezone)
    }

    pub fn validate(&self) -> Result<(), SlotError> {
        self.zone().map(|_| ())
    }

    /// Sorts each day, merges overlapping ranges and drops days left empty.
    /// Only ranges starting on the same minute past the hour are merged, so the
    /// hourly starts a day offers stay the same.
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::availability::{DayOfWeek, WeeklyAvailability};
    /// use talenta_libs::time::TimeRange;
    ///
    /// let availability = WeeklyAvailability::new("UTC")
    ///     .with(DayOfWeek::Friday, TimeRange::parse("13:00", "15:00").unwrap())
    ///     .with(DayOfWeek::Friday, TimeRange::parse("09:00", "14:00").unwrap())
    ///     .with(DayOfWeek::Sunday, TimeRange::parse("10:00", "10:00").unwrap())
    ///     .normalized();
    ///
    /// assert_eq!(
    ///     availability.ranges(DayOfWeek::Friday),
    ///     &[TimeRange::parse("09:00", "15:00").unwrap()]
    /// );
    /// assert!(!availability.schedule.contains_key(&DayOfWeek::Sunday));
    /// ```
    pub fn normalized(&self) -> WeeklyAvailability {
        let schedule = self
            .schedule
            .iter()
            .map(|(&day, ranges)| (day, merge_on_grid(ranges)))
            .filter(|(_, ranges)| !ranges.is_empty())
            .collect();

        WeeklyAvailability {
            timezone: self.timezone.clone(),
            schedule,
        }
    }

    /// Distinct hourly start times `day` offers
    pub fn hours_on(&self, day: DayOfWeek) -> usize {
        self.ranges(day)
            .iter()
            .flat_map(|range| range.hourly())
            .unique()
            .count()
    }
}

fn merge_on_grid(ranges: &[TimeRange]) -> Vec<TimeRange> {
    ranges
        .iter()
        .into_group_map_by(|range| range.start.minute())
        .into_values()
        .flat_map(|grid| grid.into_iter().sorted_unstable().time_merge())
        .sorted_unstable()
        .collect()
}
