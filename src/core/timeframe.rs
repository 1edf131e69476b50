//! Relative date windows used to filter time-based queries.

use crate::core::error::Error;
use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    // Calendar periods
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "q")]
    Quarter,
    #[serde(rename = "y")]
    Year,
    #[serde(rename = "all")]
    All,
    #[serde(rename = "custom")]
    Custom,
    // Rolling periods ending at the reference date
    #[serde(rename = "r1w")]
    Rolling1W,
    #[serde(rename = "r1m")]
    Rolling1M,
    #[serde(rename = "r3m")]
    Rolling3M,
    #[serde(rename = "r1y")]
    Rolling1Y,
    // Lookback windows used by the investing views
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    AllTime,
}

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Stable text used inside cache keys.
    pub fn cache_key(&self) -> String {
        format!("{}..{}", self.start, self.end)
    }
}

/// Earliest date covered by the `all` calendar window.
pub fn all_time_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

fn first_of_quarter(date: NaiveDate) -> NaiveDate {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

fn monday_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(date - Duration::days(30 * months as i64))
}

/// First and last day of the month containing `date`.
pub fn month_range(date: NaiveDate) -> DateRange {
    DateRange::new(first_of_month(date), last_of_month(date))
}

impl Timeframe {
    pub const ALL_VARIANTS: [Timeframe; 16] = [
        Timeframe::Week,
        Timeframe::Month,
        Timeframe::Quarter,
        Timeframe::Year,
        Timeframe::All,
        Timeframe::Custom,
        Timeframe::Rolling1W,
        Timeframe::Rolling1M,
        Timeframe::Rolling3M,
        Timeframe::Rolling1Y,
        Timeframe::OneWeek,
        Timeframe::OneMonth,
        Timeframe::ThreeMonths,
        Timeframe::YearToDate,
        Timeframe::OneYear,
        Timeframe::AllTime,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::Week => "w",
            Timeframe::Month => "m",
            Timeframe::Quarter => "q",
            Timeframe::Year => "y",
            Timeframe::All => "all",
            Timeframe::Custom => "custom",
            Timeframe::Rolling1W => "r1w",
            Timeframe::Rolling1M => "r1m",
            Timeframe::Rolling3M => "r3m",
            Timeframe::Rolling1Y => "r1y",
            Timeframe::OneWeek => "1W",
            Timeframe::OneMonth => "1M",
            Timeframe::ThreeMonths => "3M",
            Timeframe::YearToDate => "YTD",
            Timeframe::OneYear => "1Y",
            Timeframe::AllTime => "ALL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Week | Timeframe::OneWeek => "Week",
            Timeframe::Month | Timeframe::OneMonth => "Month",
            Timeframe::Quarter | Timeframe::ThreeMonths => "Quarter",
            Timeframe::Year | Timeframe::OneYear => "Year",
            Timeframe::All | Timeframe::AllTime => "All",
            Timeframe::Custom => "Custom",
            Timeframe::Rolling1W => "7d",
            Timeframe::Rolling1M => "30d",
            Timeframe::Rolling3M => "90d",
            Timeframe::Rolling1Y => "1y",
            Timeframe::YearToDate => "YTD",
        }
    }

    pub fn is_all_time(&self) -> bool {
        matches!(self, Timeframe::All | Timeframe::AllTime)
    }

    /// Longer windows are charted per month rather than per day.
    pub fn groups_by_month(&self) -> bool {
        matches!(
            self,
            Timeframe::Quarter | Timeframe::Year | Timeframe::All | Timeframe::AllTime
        )
    }

    /// Start of a lookback window ending at `now`, or `None` when the window
    /// is unbounded. Calendar windows and custom ranges have no lookback
    /// meaning and are rejected.
    pub fn lookback_start(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, Error> {
        let start = match self {
            Timeframe::All | Timeframe::AllTime => return Ok(None),
            Timeframe::OneWeek | Timeframe::Rolling1W => now - Duration::days(7),
            Timeframe::OneMonth => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
            Timeframe::ThreeMonths => now
                .checked_sub_months(Months::new(3))
                .unwrap_or(now - Duration::days(90)),
            Timeframe::YearToDate => {
                let new_year = |year| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
                // At the first instant of a year the window is the year just ended.
                match new_year(now.year()).filter(|start| *start < now) {
                    Some(start) => start,
                    None => new_year(now.year() - 1).unwrap_or(now - Duration::days(365)),
                }
            }
            Timeframe::OneYear => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(now - Duration::days(365)),
            Timeframe::Rolling1M => now - Duration::days(30),
            Timeframe::Rolling3M => now - Duration::days(90),
            Timeframe::Rolling1Y => now - Duration::days(365),
            Timeframe::Week
            | Timeframe::Month
            | Timeframe::Quarter
            | Timeframe::Year
            | Timeframe::Custom => {
                return Err(Error::UnsupportedTimeframe(self.code().to_string()));
            }
        };
        Ok(Some(start))
    }

    /// Inclusive window around `reference`. `custom` is only consulted for
    /// [`Timeframe::Custom`]; without it the current month is used.
    pub fn range(&self, reference: NaiveDate, custom: Option<DateRange>) -> DateRange {
        let ending_today = |start: NaiveDate| DateRange::new(start, reference);
        match self {
            Timeframe::Custom => custom.unwrap_or_else(|| month_range(reference)),
            Timeframe::Week => {
                let start = monday_of_week(reference);
                DateRange::new(start, start + Days::new(6))
            }
            Timeframe::Month => month_range(reference),
            Timeframe::Quarter => {
                let start = first_of_quarter(reference);
                let end = start
                    .checked_add_months(Months::new(3))
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(reference);
                DateRange::new(start, end)
            }
            Timeframe::Year => {
                let start = first_of_year(reference);
                let end = NaiveDate::from_ymd_opt(reference.year(), 12, 31).unwrap_or(reference);
                DateRange::new(start, end)
            }
            Timeframe::All | Timeframe::AllTime => ending_today(all_time_start()),
            Timeframe::Rolling1W | Timeframe::OneWeek => ending_today(reference - Days::new(7)),
            Timeframe::Rolling1M | Timeframe::OneMonth => ending_today(reference - Days::new(30)),
            Timeframe::Rolling3M => ending_today(reference - Days::new(90)),
            Timeframe::Rolling1Y => ending_today(reference - Days::new(365)),
            Timeframe::ThreeMonths => ending_today(sub_months(reference, 3)),
            Timeframe::YearToDate => ending_today(first_of_year(reference)),
            Timeframe::OneYear => ending_today(sub_months(reference, 12)),
        }
    }

    pub fn align_to_period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Timeframe::Week => monday_of_week(date),
            Timeframe::Month => first_of_month(date),
            Timeframe::Quarter => first_of_quarter(date),
            Timeframe::Year => first_of_year(date),
            _ => date,
        }
    }

    /// Moves to the start of the previous (`forward == false`) or next
    /// calendar period. Non-calendar timeframes return `base` unchanged.
    pub fn step_period(&self, base: NaiveDate, forward: bool) -> NaiveDate {
        let start = self.align_to_period_start(base);
        let months = match self {
            Timeframe::Week => {
                return if forward {
                    start + Days::new(7)
                } else {
                    start - Days::new(7)
                };
            }
            Timeframe::Month => 1,
            Timeframe::Quarter => 3,
            Timeframe::Year => 12,
            _ => return base,
        };
        let stepped = if forward {
            start.checked_add_months(Months::new(months))
        } else {
            start.checked_sub_months(Months::new(months))
        };
        stepped.unwrap_or(base)
    }

    pub fn period_name(&self, date: NaiveDate) -> String {
        match self {
            Timeframe::Week => format!("Week of {}", date.format("%b %-d, %Y")),
            Timeframe::Quarter => format!("Q{} {}", date.month0() / 3 + 1, date.year()),
            Timeframe::Year => date.format("%Y").to_string(),
            Timeframe::All => "All Time".to_string(),
            _ => date.format("%B %Y").to_string(),
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL_VARIANTS
            .into_iter()
            .find(|tf| tf.code() == s.trim())
            .ok_or_else(|| Error::UnsupportedTimeframe(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lookback_start_is_before_now() {
        let now = Utc::now();
        for tf in [
            Timeframe::OneWeek,
            Timeframe::OneMonth,
            Timeframe::ThreeMonths,
            Timeframe::YearToDate,
            Timeframe::OneYear,
            Timeframe::Rolling1W,
            Timeframe::Rolling1M,
            Timeframe::Rolling3M,
            Timeframe::Rolling1Y,
        ] {
            let start = tf.lookback_start(now).unwrap().unwrap();
            assert!(start < now, "{tf} start {start} not before {now}");
        }
    }

    #[test]
    fn test_lookback_start_all_time_is_unbounded() {
        let now = Utc::now();
        assert_eq!(Timeframe::AllTime.lookback_start(now).unwrap(), None);
        assert_eq!(Timeframe::All.lookback_start(now).unwrap(), None);
    }

    #[test]
    fn test_lookback_start_rejects_calendar_windows() {
        let err = Timeframe::Week.lookback_start(Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported timeframe: w");
        assert!(Timeframe::Custom.lookback_start(Utc::now()).is_err());
    }

    #[test]
    fn test_lookback_start_calendar_arithmetic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let one_month = Timeframe::OneMonth.lookback_start(now).unwrap().unwrap();
        assert_eq!(one_month.date_naive(), date(2024, 2, 29));

        let ytd = Timeframe::YearToDate.lookback_start(now).unwrap().unwrap();
        assert_eq!(ytd, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let one_year = Timeframe::OneYear.lookback_start(now).unwrap().unwrap();
        assert_eq!(one_year.date_naive(), date(2023, 3, 31));
    }

    #[test]
    fn test_year_to_date_at_new_year_covers_previous_year() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let start = Timeframe::YearToDate.lookback_start(midnight).unwrap().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());

        let a_second_later = midnight + Duration::seconds(1);
        let start = Timeframe::YearToDate
            .lookback_start(a_second_later)
            .unwrap()
            .unwrap();
        assert_eq!(start, midnight);
    }

    #[test]
    fn test_calendar_ranges() {
        let reference = date(2024, 5, 15); // Wednesday
        assert_eq!(
            Timeframe::Week.range(reference, None),
            DateRange::new(date(2024, 5, 13), date(2024, 5, 19))
        );
        assert_eq!(
            Timeframe::Month.range(reference, None),
            DateRange::new(date(2024, 5, 1), date(2024, 5, 31))
        );
        assert_eq!(
            Timeframe::Quarter.range(reference, None),
            DateRange::new(date(2024, 4, 1), date(2024, 6, 30))
        );
        assert_eq!(
            Timeframe::Year.range(reference, None),
            DateRange::new(date(2024, 1, 1), date(2024, 12, 31))
        );
        assert_eq!(
            Timeframe::All.range(reference, None),
            DateRange::new(date(2020, 1, 1), reference)
        );
    }

    #[test]
    fn test_rolling_and_custom_ranges() {
        let reference = date(2024, 5, 15);
        assert_eq!(
            Timeframe::Rolling1M.range(reference, None),
            DateRange::new(date(2024, 4, 15), reference)
        );
        assert_eq!(
            Timeframe::ThreeMonths.range(reference, None),
            DateRange::new(date(2024, 2, 15), reference)
        );
        let custom = DateRange::new(date(2023, 1, 1), date(2023, 1, 31));
        assert_eq!(Timeframe::Custom.range(reference, Some(custom)), custom);
        assert_eq!(
            Timeframe::Custom.range(reference, None),
            month_range(reference)
        );
    }

    #[test]
    fn test_month_range_handles_leap_february() {
        assert_eq!(
            month_range(date(2024, 2, 10)),
            DateRange::new(date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            month_range(date(2023, 12, 31)),
            DateRange::new(date(2023, 12, 1), date(2023, 12, 31))
        );
    }

    #[test]
    fn test_step_period() {
        assert_eq!(
            Timeframe::Month.step_period(date(2024, 1, 31), true),
            date(2024, 2, 1)
        );
        assert_eq!(
            Timeframe::Quarter.step_period(date(2024, 2, 10), false),
            date(2023, 10, 1)
        );
        assert_eq!(
            Timeframe::Week.step_period(date(2024, 5, 15), true),
            date(2024, 5, 20)
        );
        assert_eq!(
            Timeframe::Rolling1W.step_period(date(2024, 5, 15), true),
            date(2024, 5, 15)
        );
    }

    #[test]
    fn test_period_name_and_codes() {
        assert_eq!(Timeframe::Quarter.period_name(date(2024, 8, 1)), "Q3 2024");
        assert_eq!(Timeframe::Month.period_name(date(2024, 8, 1)), "August 2024");
        assert_eq!(
            Timeframe::Week.period_name(date(2024, 8, 5)),
            "Week of Aug 5, 2024"
        );
        for tf in Timeframe::ALL_VARIANTS {
            assert_eq!(tf.code().parse::<Timeframe>().unwrap(), tf);
        }
        assert!("2W".parse::<Timeframe>().is_err());
    }
}
