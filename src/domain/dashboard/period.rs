use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// Months of history behind the pipeline coverage ratio.
pub const HISTORY_MONTHS: u32 = 6;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// A calendar month selected in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReportingPeriod {
    pub year: i32,
    pub month: u32,
    #[serde(skip)]
    first_day: NaiveDate,
    #[serde(skip)]
    last_day: NaiveDate,
    #[serde(skip)]
    history_start: NaiveDate,
}

impl ReportingPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last_day = first_day
            .checked_add_months(Months::new(1))?
            .pred_opt()?;
        let history_start = first_day.checked_sub_months(Months::new(HISTORY_MONTHS))?;

        Some(Self {
            year,
            month,
            first_day,
            last_day,
            history_start,
        })
    }

    pub fn containing(date: NaiveDate) -> Self {
        // The first of any representable month is itself representable.
        Self::new(date.year(), date.month()).unwrap_or_else(|| Self::fallback(date))
    }

    /// Month and year from query parameters. The month is clamped to 1..=12;
    /// values that do not parse fall back to the month containing `today`.
    pub fn from_query(year: Option<&str>, month: Option<&str>, today: NaiveDate) -> Self {
        let month = parse_int(month)
            .map(|m| m.clamp(1, 12) as u32)
            .unwrap_or(today.month());
        let year = parse_int(year)
            .and_then(|y| i32::try_from(y).ok())
            .unwrap_or(today.year());

        Self::new(year, month).unwrap_or_else(|| Self::containing(today))
    }

    /// First and last day of the month, inclusive.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day, self.last_day)
    }

    /// The six whole months before this one, inclusive.
    pub fn history_range(&self) -> (NaiveDate, NaiveDate) {
        let end = self.first_day.pred_opt().unwrap_or(self.first_day);
        (self.history_start, end)
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month as usize).saturating_sub(1) % 12]
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }

    fn fallback(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            first_day: date,
            last_day: date,
            history_start: date,
        }
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}
