//! Expansion of a recurrence rule into concrete lesson dates.
//!
//! A rule is anchored at a first date and bounded either by a last date
//! (inclusive) or by a number of occurrences. Weekdays use the
//! Sunday-first numbering `0..=6`.

use chrono::{Datelike, Months, NaiveDate};

/// Upper bound on the number of dates produced by a date-bounded rule.
pub const MAX_RANGE_LESSONS: usize = 300;

/// Count-bounded rules never look further ahead than this.
const COUNT_HORIZON: Months = Months::new(12);

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("weekday {0} is out of range, expected 0 (Sunday) to 6 (Saturday)")]
    InvalidWeekday(u8),
}

/// Set of weekdays, bit `n` standing for `n` days from Sunday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn from_days(days: &[u8]) -> Result<Self, ScheduleError> {
        days.iter().try_fold(Self::default(), |set, &day| {
            if day > 6 {
                return Err(ScheduleError::InvalidWeekday(day));
            }
            Ok(Self(set.0 | 1 << day))
        })
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.0 & (1 << date.weekday().num_days_from_sunday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    /// Last date, inclusive.
    Date(NaiveDate),
    /// Number of occurrences, always non-zero.
    Count(u32),
    /// Date-bounded rule without a last date; no day is on or before it.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub first: NaiveDate,
    pub until: Until,
    pub weekdays: WeekdaySet,
}

impl RecurrenceRule {
    /// Build a rule from its wire representation.
    ///
    /// A non-zero `count` wins over `last`; a zero count is treated as absent.
    /// With neither bound the rule is date-bounded and yields nothing.
    pub fn parse(
        first: &str,
        last: Option<&str>,
        count: Option<u32>,
        days: &[u8],
    ) -> Result<Self, ScheduleError> {
        let first = parse_date(first)?;
        let weekdays = WeekdaySet::from_days(days)?;
        let until = match (count, last) {
            (Some(n), _) if n > 0 => Until::Count(n),
            (_, Some(last)) => Until::Date(parse_date(last)?),
            (_, None) => Until::Open,
        };

        Ok(Self {
            first,
            until,
            weekdays,
        })
    }

    /// All matching dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        if self.weekdays.is_empty() {
            return Vec::new();
        }

        let weekdays = self.weekdays;
        match self.until {
            Until::Open => Vec::new(),
            Until::Date(last) => self
                .first
                .iter_days()
                .take_while(|day| *day <= last)
                .filter(|day| weekdays.contains(*day))
                .take(MAX_RANGE_LESSONS)
                .collect(),
            Until::Count(count) => {
                let horizon = self
                    .first
                    .checked_add_months(COUNT_HORIZON)
                    .unwrap_or(NaiveDate::MAX);
                self.first
                    .iter_days()
                    .take_while(|day| *day < horizon)
                    .filter(|day| weekdays.contains(*day))
                    .take(count as usize)
                    .collect()
            }
        }
    }
}

/// Parse and expand a rule in one step.
pub fn generate(
    first: &str,
    last: Option<&str>,
    count: Option<u32>,
    days: &[u8],
) -> Result<Vec<NaiveDate>, ScheduleError> {
    RecurrenceRule::parse(first, last, count, days).map(|rule| rule.dates())
}

fn parse_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ScheduleError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn range_mode_mondays_and_wednesdays_in_january() {
        let dates = generate("2024-01-01", Some("2024-01-31"), None, &[1, 3]).unwrap();

        let expected: Vec<NaiveDate> = [
            "2024-01-01", "2024-01-03", "2024-01-08", "2024-01-10", "2024-01-15",
            "2024-01-17", "2024-01-22", "2024-01-24", "2024-01-29", "2024-01-31",
        ]
        .iter()
        .map(|s| date(s))
        .collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn count_mode_five_sundays() {
        let dates = generate("2024-01-01", None, Some(5), &[0]).unwrap();

        let expected: Vec<NaiveDate> = [
            "2024-01-07", "2024-01-14", "2024-01-21", "2024-01-28", "2024-02-04",
        ]
        .iter()
        .map(|s| date(s))
        .collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn count_wins_over_last_date() {
        let dates = generate("2024-01-01", Some("2024-01-02"), Some(3), &[1]).unwrap();
        assert_eq!(dates.len(), 3);
        assert_eq!(dates[2], date("2024-01-15"));
    }

    #[test]
    fn zero_count_falls_back_to_range_mode() {
        let dates = generate("2024-01-01", Some("2024-01-14"), Some(0), &[1]).unwrap();
        assert_eq!(dates, vec![date("2024-01-01"), date("2024-01-08")]);
    }

    #[test]
    fn count_mode_stops_after_one_year() {
        // 2024 has 53 Mondays, 2025-01-06 is outside the horizon
        let dates = generate("2024-01-01", None, Some(100), &[1]).unwrap();
        assert_eq!(dates.len(), 53);
        assert_eq!(dates.last(), Some(&date("2024-12-30")));
    }

    #[test]
    fn count_mode_horizon_is_exclusive() {
        let dates = generate("2024-01-01", None, Some(400), &[0, 1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(dates.len(), 366);
        assert_eq!(dates.last(), Some(&date("2024-12-31")));
    }

    #[test]
    fn range_mode_is_capped() {
        let dates = generate("2024-01-01", Some("2030-12-31"), None, &[0, 1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(dates.len(), MAX_RANGE_LESSONS);
        assert_eq!(dates.first(), Some(&date("2024-01-01")));
        assert_eq!(dates.last(), Some(&date("2024-10-26")));
    }

    #[test]
    fn range_mode_stays_within_bounds_and_weekdays() {
        let first = date("2023-11-17");
        let last = date("2024-03-02");
        let rule = RecurrenceRule {
            first,
            until: Until::Date(last),
            weekdays: WeekdaySet::from_days(&[2, 5, 6]).unwrap(),
        };

        let dates = rule.dates();
        assert!(!dates.is_empty());
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(dates.iter().all(|d| *d >= first && *d <= last));
        assert!(dates
            .iter()
            .all(|d| matches!(d.weekday(), Weekday::Tue | Weekday::Fri | Weekday::Sat)));
    }

    #[test]
    fn empty_weekdays_yield_nothing() {
        assert!(generate("2024-01-01", Some("2024-12-31"), None, &[]).unwrap().is_empty());
        assert!(generate("2024-01-01", None, Some(10), &[]).unwrap().is_empty());
    }

    #[test]
    fn last_before_first_yields_nothing() {
        let dates = generate("2024-02-01", Some("2024-01-01"), None, &[0, 1, 2, 3, 4, 5, 6]).unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn same_first_and_last_date() {
        let dates = generate("2024-01-03", Some("2024-01-03"), None, &[3]).unwrap();
        assert_eq!(dates, vec![date("2024-01-03")]);
    }

    #[test]
    fn rejects_unparseable_dates() {
        assert_eq!(
            generate("2024-13-01", Some("2024-12-31"), None, &[1]),
            Err(ScheduleError::InvalidDate("2024-13-01".into()))
        );
        assert_eq!(
            generate("2024-01-01", Some("tomorrow"), None, &[1]),
            Err(ScheduleError::InvalidDate("tomorrow".into()))
        );
    }

    #[test]
    fn rejects_out_of_range_weekday() {
        assert_eq!(
            generate("2024-01-01", Some("2024-12-31"), None, &[1, 7]),
            Err(ScheduleError::InvalidWeekday(7))
        );
    }

    #[test]
    fn missing_bound_yields_nothing() {
        assert_eq!(generate("2024-01-01", None, None, &[1]), Ok(Vec::new()));
        assert_eq!(generate("2024-01-01", None, Some(0), &[1]), Ok(Vec::new()));

        let rule = RecurrenceRule::parse("2024-01-01", None, None, &[1]).unwrap();
        assert_eq!(rule.until, Until::Open);
    }

    #[test]
    fn missing_bound_still_validates_input() {
        assert_eq!(
            generate("2024-01-01", None, None, &[8]),
            Err(ScheduleError::InvalidWeekday(8))
        );
        assert_eq!(
            generate("someday", None, None, &[1]),
            Err(ScheduleError::InvalidDate("someday".into()))
        );
    }

    #[test]
    fn weekday_numbering_starts_on_sunday() {
        let set = WeekdaySet::from_days(&[0]).unwrap();
        assert!(set.contains(date("2024-01-07")));
        assert!(!set.contains(date("2024-01-08")));
    }
}
