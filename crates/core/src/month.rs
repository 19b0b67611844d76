//! Calendar month (`YYYY-MM`) with inclusive UTC boundaries.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A calendar month.
///
/// Serialized as `"YYYY-MM"`. Ordering is chronological.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    /// Build a month from a four-digit year and a 1-based month number.
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=9999).contains(&year) {
            return Err(DomainError::validation(format!("year out of range: {year}")));
        }
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| DomainError::validation(format!("invalid month: {year}-{month}")))?;
        Ok(Self { first_day })
    }

    /// The month containing `at`.
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            first_day: at.date_naive().with_day(1).unwrap_or(at.date_naive()),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// First instant of the month: day 1, 00:00:00.000.
    pub fn start(&self) -> DateTime<Utc> {
        self.first_day.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last instant of the month: last day, 23:59:59.999.
    pub fn end(&self) -> DateTime<Utc> {
        self.next().start() - TimeDelta::milliseconds(1)
    }

    /// Inclusive containment check against [`start`](Self::start)/[`end`](Self::end).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start() && at <= self.end()
    }

    pub fn next(&self) -> Self {
        // Years are bounded to four digits, so the following month always exists.
        let first_day = self
            .first_day
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Self { first_day }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("month must be YYYY-MM, got {s:?}"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Month {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(value: Month) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_and_displays() {
        let m: Month = "2024-01".parse().unwrap();
        assert_eq!(m.year(), 2024);
        assert_eq!(m.month(), 1);
        assert_eq!(m.to_string(), "2024-01");
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["2024-1", "2024-13", "24-01", "2024/01", "", "2024-00", "abcd-ef"] {
            assert!(bad.parse::<Month>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn boundaries_are_inclusive_to_the_millisecond() {
        let feb: Month = "2024-02".parse().unwrap();
        assert_eq!(feb.start(), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(
            feb.end(),
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap() + TimeDelta::milliseconds(999)
        );
        assert!(feb.contains(feb.end()));
        assert!(!feb.contains(feb.end() + TimeDelta::milliseconds(1)));
        assert!(!feb.contains(feb.start() - TimeDelta::milliseconds(1)));
    }

    #[test]
    fn december_rolls_into_next_year() {
        let dec: Month = "2023-12".parse().unwrap();
        assert_eq!(dec.next().to_string(), "2024-01");
        assert_eq!(dec.end(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() - TimeDelta::milliseconds(1));
    }

    #[test]
    fn of_truncates_to_first_day() {
        let at = Utc.with_ymd_and_hms(2024, 3, 17, 12, 30, 0).unwrap();
        assert_eq!(Month::of(at).to_string(), "2024-03");
    }

    #[test]
    fn orders_chronologically_and_serializes_as_string() {
        let a: Month = "2023-12".parse().unwrap();
        let b: Month = "2024-01".parse().unwrap();
        assert!(a < b);
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"2024-01\"");
    }
}
