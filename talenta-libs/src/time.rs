use chrono::NaiveTime;
use chrono_tz::Tz;
use core::fmt;
use core::str::FromStr;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MINUTES_PER_HOUR: u16 = 60;
pub const MINUTES_PER_DAY: u16 = 24 * MINUTES_PER_HOUR;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SlotError {
    #[error("Invalid time of day `{value}`, expected HH:mm")]
    Parse { value: String },
    #[error("Unrecognized timezone `{zone}`")]
    TimeZone { zone: String },
    #[error("Unknown slot order `{value}`, expected `as-generated` or `sorted`")]
    UnknownOrder { value: String },
}

/// Resolves an IANA zone identifier
///
/// # Examples
/// ```
/// use talenta_libs::time::{parse_zone, SlotError};
///
/// assert_eq!(parse_zone("Asia/Kolkata"), Ok(chrono_tz::Asia::Kolkata));
/// assert_eq!(
///     parse_zone("Mars/Olympus_Mons"),
///     Err(SlotError::TimeZone { zone: "Mars/Olympus_Mons".to_string() })
/// );
/// ```
pub fn parse_zone(name: &str) -> Result<Tz, SlotError> {
    name.parse::<Tz>().map_err(|_| SlotError::TimeZone {
        zone: name.to_string(),
    })
}

/// A wall-clock time of day, stored as minutes past midnight.
/// `24:00` is representable and denotes the end of the day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct LocalTime(u16);

impl LocalTime {
    pub const MIDNIGHT: LocalTime = LocalTime(0);
    pub const END_OF_DAY: LocalTime = LocalTime(MINUTES_PER_DAY);

    /// Builds a time from hours and minutes.
    /// Returns `None` outside of `00:00..=24:00`
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::time::LocalTime;
    ///
    /// assert_eq!(LocalTime::from_hm(24, 0), Some(LocalTime::END_OF_DAY));
    /// assert_eq!(LocalTime::from_hm(24, 30), None);
    /// assert_eq!(LocalTime::from_hm(9, 60), None);
    /// ```
    pub fn from_hm(hour: u16, minute: u16) -> Option<LocalTime> {
        match (hour, minute) {
            (24, 0) => Some(LocalTime::END_OF_DAY),
            (0..=23, 0..=59) => Some(LocalTime(hour * MINUTES_PER_HOUR + minute)),
            _ => None,
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / MINUTES_PER_HOUR
    }

    pub fn minute(self) -> u16 {
        self.0 % MINUTES_PER_HOUR
    }

    /// `None` for `24:00`, which has no `NaiveTime` counterpart
    pub fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(u32::from(self.hour()), u32::from(self.minute()), 0)
    }
}

impl FromStr for LocalTime {
    type Err = SlotError;

    /// Parses `H:mm` or `HH:mm`
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::time::LocalTime;
    ///
    /// let time: LocalTime = "9:30".parse().unwrap();
    /// assert_eq!(time.to_string(), "09:30");
    ///
    /// assert!("09:3".parse::<LocalTime>().is_err());
    /// assert!("25:00".parse::<LocalTime>().is_err());
    /// assert!("noon".parse::<LocalTime>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotError::Parse {
            value: value.to_string(),
        };

        let (hour, minute) = value.split_once(':').ok_or_else(invalid)?;

        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
            return Err(invalid());
        }

        let hour = hour.parse::<u16>().map_err(|_| invalid())?;
        let minute = minute.parse::<u16>().map_err(|_| invalid())?;

        LocalTime::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for LocalTime {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LocalTime> for String {
    fn from(time: LocalTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for LocalTime {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(LocalTime(u.int_in_range(0..=MINUTES_PER_DAY)?))
    }
}

/// Half-open [start, end) range of wall-clock time within a single day
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct TimeRange {
    pub start: LocalTime,
    pub end: LocalTime,
}

impl TimeRange {
    /// Construct a new Time Range
    /// Range is half-open on [start, end)
    /// # Examples
    /// ```
    /// use talenta_libs::time::{LocalTime, TimeRange};
    ///
    /// let range = TimeRange::new(LocalTime::MIDNIGHT, LocalTime::END_OF_DAY);
    ///
    /// assert_eq!(range.hours(), 24);
    /// ```
    pub fn new(start: LocalTime, end: LocalTime) -> TimeRange {
        TimeRange { start, end }
    }

    /// Parses both ends as `HH:mm`
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::time::TimeRange;
    ///
    /// let range = TimeRange::parse("23:00", "24:00").unwrap();
    /// assert_eq!(range.hours(), 1);
    ///
    /// assert!(TimeRange::parse("23:00", "24:01").is_err());
    /// ```
    pub fn parse(start: &str, end: &str) -> Result<TimeRange, SlotError> {
        Ok(TimeRange::new(start.parse()?, end.parse()?))
    }

    /// `start >= end` describes no time at all
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// Hourly start times from `start`, while strictly before `end`
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::time::TimeRange;
    ///
    /// let starts = TimeRange::parse("09:30", "12:00")
    ///     .unwrap()
    ///     .hourly()
    ///     .map(|t| t.to_string())
    ///     .collect::<Vec<_>>();
    ///
    /// assert_eq!(starts, vec!["09:30", "10:30", "11:30"]);
    /// ```
    pub fn hourly(self) -> impl Iterator<Item = LocalTime> {
        (self.start.0..self.end.0)
            .step_by(usize::from(MINUTES_PER_HOUR))
            .map(LocalTime)
    }

    pub fn hours(self) -> usize {
        self.hourly().count()
    }

    fn touches(self, other: TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

pub trait TimeMerge {
    fn time_merge(self) -> Vec<TimeRange>;
}

impl<'a, T> TimeMerge for T
where
    T: Iterator<Item = &'a TimeRange>,
{
    /// Combines overlapping and touching TimeRanges together.
    /// Expects its input sorted by start; empty ranges are dropped.
    ///
    /// # Examples
    /// ```
    /// use talenta_libs::time::{TimeMerge, TimeRange};
    ///
    /// let ranges = vec![
    ///     TimeRange::parse("08:00", "09:00").unwrap(),
    ///     TimeRange::parse("09:00", "10:00").unwrap(),
    ///     TimeRange::parse("09:30", "11:00").unwrap(),
    ///     TimeRange::parse("12:00", "12:00").unwrap(),
    ///     TimeRange::parse("13:00", "14:00").unwrap(),
    /// ];
    ///
    /// assert_eq!(
    ///     ranges.iter().time_merge(),
    ///     vec![
    ///         TimeRange::parse("08:00", "11:00").unwrap(),
    ///         TimeRange::parse("13:00", "14:00").unwrap(),
    ///     ]
    /// );
    /// ```
    fn time_merge(self) -> Vec<TimeRange> {
        let size_hint = self.size_hint().1.unwrap_or(0);
        let (last, mut acc) = self.filter(|time| !time.is_empty()).fold(
            (None, Vec::with_capacity(size_hint)),
            |(last, mut acc): (Option<TimeRange>, Vec<TimeRange>), &curr| match last {
                None => (Some(curr), acc),
                Some(time) if time.touches(curr) => (
                    Some(TimeRange::new(
                        time.start.min(curr.start),
                        time.end.max(curr.end),
                    )),
                    acc,
                ),
                Some(time) => {
                    acc.push(time);
                    (Some(curr), acc)
                }
            },
        );

        if let Some(time) = last {
            acc.push(time);
        }

        acc
    }
}
