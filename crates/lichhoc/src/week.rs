//! Calendar week conventions.
//!
//! "Same week" depends on which weekday a week starts on, so the convention is
//! always passed explicitly instead of being read from a locale.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First day of a calendar week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// ISO 8601 weeks
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    /// The seven weekdays in display order
    pub fn days(self) -> [Weekday; 7] {
        let mut day = self.weekday();
        let mut days = [day; 7];
        for slot in days.iter_mut().skip(1) {
            day = day.succ();
            *slot = day;
        }
        days
    }
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(WeekStart::Monday),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            _ => Err(format!("Invalid week start '{}'. Expected monday or sunday", s)),
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekStart::Monday => f.write_str("monday"),
            WeekStart::Sunday => f.write_str("sunday"),
        }
    }
}

/// First day of the week containing `date`, `None` if it precedes `NaiveDate::MIN`
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> Option<NaiveDate> {
    let offset = match week_start {
        WeekStart::Monday => date.weekday().num_days_from_monday(),
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
    };
    date.checked_sub_days(Days::new(u64::from(offset)))
}

pub fn same_week(a: NaiveDate, b: NaiveDate, week_start: WeekStart) -> bool {
    match (start_of_week(a, week_start), start_of_week(b, week_start)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Full weeks covering a month, for a calendar grid.
///
/// The first row starts on the week containing the 1st, the last row ends on
/// the week containing the last day. Returns `None` for an invalid month or
/// when a row would fall outside the representable date range.
pub fn month_grid(year: i32, month: u32, week_start: WeekStart) -> Option<Vec<[NaiveDate; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut cursor = start_of_week(first, week_start)?;

    let mut weeks = Vec::new();
    loop {
        let mut week = [cursor; 7];
        for (offset, slot) in (0u64..).zip(week.iter_mut()) {
            *slot = cursor.checked_add_days(Days::new(offset))?;
        }
        weeks.push(week);

        match week[6].succ_opt() {
            Some(next) if next.month() == month => cursor = next,
            _ => break,
        }
    }

    Some(weeks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_start_parse() {
        assert_eq!("monday".parse::<WeekStart>().unwrap(), WeekStart::Monday);
        assert_eq!("Sunday".parse::<WeekStart>().unwrap(), WeekStart::Sunday);
        assert_eq!("SUN".parse::<WeekStart>().unwrap(), WeekStart::Sunday);
        assert!("friday".parse::<WeekStart>().is_err());
    }

    #[test]
    fn test_week_start_days_order() {
        let days = WeekStart::Sunday.days();
        assert_eq!(days[0], Weekday::Sun);
        assert_eq!(days[1], Weekday::Mon);
        assert_eq!(days[6], Weekday::Sat);

        let days = WeekStart::Monday.days();
        assert_eq!(days[0], Weekday::Mon);
        assert_eq!(days[6], Weekday::Sun);
    }

    #[test]
    fn test_start_of_week_monday() {
        // 2024-05-10 is a Friday
        assert_eq!(start_of_week(date(2024, 5, 10), WeekStart::Monday), Some(date(2024, 5, 6)));
        assert_eq!(start_of_week(date(2024, 5, 6), WeekStart::Monday), Some(date(2024, 5, 6)));
        assert_eq!(start_of_week(date(2024, 5, 12), WeekStart::Monday), Some(date(2024, 5, 6)));
    }

    #[test]
    fn test_start_of_week_sunday() {
        assert_eq!(start_of_week(date(2024, 5, 10), WeekStart::Sunday), Some(date(2024, 5, 5)));
        assert_eq!(start_of_week(date(2024, 5, 12), WeekStart::Sunday), Some(date(2024, 5, 12)));
    }

    #[test]
    fn test_same_week_depends_on_convention() {
        // Friday and the following Sunday
        let friday = date(2024, 5, 10);
        let sunday = date(2024, 5, 12);

        assert!(same_week(friday, sunday, WeekStart::Monday));
        assert!(!same_week(friday, sunday, WeekStart::Sunday));
    }

    #[test]
    fn test_same_week_across_year_boundary() {
        // 2024-12-30 (Mon) and 2025-01-02 (Thu)
        assert!(same_week(date(2024, 12, 30), date(2025, 1, 2), WeekStart::Monday));
    }

    #[test]
    fn test_same_month() {
        assert!(same_month(date(2024, 5, 1), date(2024, 5, 31)));
        assert!(!same_month(date(2024, 5, 31), date(2024, 6, 1)));
        assert!(!same_month(date(2023, 5, 10), date(2024, 5, 10)));
    }

    #[test]
    fn test_month_grid_covers_month() {
        // May 2024 starts on Wednesday, ends on Friday
        let weeks = month_grid(2024, 5, WeekStart::Monday).unwrap();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][0], date(2024, 4, 29));
        assert_eq!(weeks[4][6], date(2024, 6, 2));
    }

    #[test]
    fn test_month_grid_sunday_start() {
        let weeks = month_grid(2024, 5, WeekStart::Sunday).unwrap();
        assert_eq!(weeks[0][0], date(2024, 4, 28));
        assert_eq!(weeks.last().unwrap()[6], date(2024, 6, 1));
    }

    #[test]
    fn test_month_grid_exact_weeks() {
        // February 2021 starts on Monday and has exactly 28 days
        let weeks = month_grid(2021, 2, WeekStart::Monday).unwrap();
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0][0], date(2021, 2, 1));
        assert_eq!(weeks[3][6], date(2021, 2, 28));
    }

    #[test]
    fn test_month_grid_invalid_month() {
        assert!(month_grid(2024, 13, WeekStart::Monday).is_none());
    }

    #[test]
    fn test_month_grid_past_last_representable_date() {
        // The last month's final row runs past NaiveDate::MAX
        let year = NaiveDate::MAX.year();
        assert!(month_grid(year, 12, WeekStart::Monday).is_none());
        assert!(month_grid(year, 12, WeekStart::Sunday).is_none());
        assert!(month_grid(year, 6, WeekStart::Monday).is_some());
    }

    #[test]
    fn test_same_week_at_range_limits() {
        assert!(same_week(NaiveDate::MAX, NaiveDate::MAX, WeekStart::Monday));
        assert!(!same_week(NaiveDate::MAX, date(2024, 5, 10), WeekStart::Monday));
    }
}
