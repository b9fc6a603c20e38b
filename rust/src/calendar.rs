//! Calendar helpers: working days, Fridays, quarters and leave expansion.
//!
//! The public-holiday calendar itself is supplied by the caller; this module
//! only filters against it.

use chrono::{Datelike, Months, NaiveDate, Weekday};
use std::collections::{BTreeMap, BTreeSet};

use crate::sites::ConfigError;

/// Months in which a quarter starts.
const QUARTER_START_MONTHS: [u32; 4] = [1, 4, 7, 10];

/// Inclusive iterator over every date from `start` to `end`.
///
/// Empty when `end` is before `start`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Business days of a period and the public holidays that were removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkingDays {
    pub days: Vec<NaiveDate>,
    /// Weekday public holidays with their names, in date order
    pub holidays: Vec<(NaiveDate, String)>,
}

/// Weekdays between `start` and `end` (inclusive), minus public holidays.
pub fn working_days(
    start: NaiveDate,
    end: NaiveDate,
    public_holidays: &BTreeMap<NaiveDate, String>,
) -> WorkingDays {
    let mut result = WorkingDays::default();
    for day in date_range(start, end) {
        if is_weekend(day) {
            continue;
        }
        match public_holidays.get(&day) {
            Some(name) => result.holidays.push((day, name.clone())),
            None => result.days.push(day),
        }
    }
    result
}

#[inline]
pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

#[inline]
pub fn is_friday(day: NaiveDate) -> bool {
    day.weekday() == Weekday::Fri
}

pub fn fridays(days: &[NaiveDate]) -> Vec<NaiveDate> {
    days.iter().copied().filter(|&d| is_friday(d)).collect()
}

/// Quarter number (1-4) of a date.
pub fn quarter_of(day: NaiveDate) -> u32 {
    day.month0() / 3 + 1
}

/// Storage identifier of the quarter containing `day`, e.g. `T2_2025`.
pub fn quarter_id(day: NaiveDate) -> String {
    format!("T{}_{}", quarter_of(day), day.year())
}

/// First and last day of the three-month period starting at `start`.
pub fn quarter_bounds(start: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let end = start.checked_add_months(Months::new(3))?.pred_opt()?;
    Some((start, end))
}

/// Start of the first quarter beginning in a month strictly after `today`'s.
pub fn next_quarter_start(today: NaiveDate) -> Option<NaiveDate> {
    let month = today.month();
    match QUARTER_START_MONTHS.iter().find(|&&m| month < m) {
        Some(&m) => NaiveDate::from_ymd_opt(today.year(), m, 1),
        None => NaiveDate::from_ymd_opt(today.year() + 1, QUARTER_START_MONTHS[0], 1),
    }
}

/// `first` followed by the next `count` quarter starts.
pub fn quarter_starts(first: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut starts = Vec::with_capacity(count + 1);
    let mut current = Some(first);
    while let Some(day) = current {
        starts.push(day);
        if starts.len() > count {
            break;
        }
        current = day.checked_add_months(Months::new(3));
    }
    starts
}

/// Expand leave into `YYYY-MM-DD` strings usable as holidays.
///
/// `ranges` are inclusive date ranges; `manual` is a comma-separated list of
/// extra dates. The result is sorted and free of duplicates.
pub fn expand_leave(
    owner: &str,
    ranges: &[(NaiveDate, NaiveDate)],
    manual: &str,
) -> Result<Vec<String>, ConfigError> {
    let mut days: BTreeSet<NaiveDate> = ranges
        .iter()
        .flat_map(|&(start, end)| date_range(start, end))
        .collect();

    for value in manual.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            ConfigError::InvalidHoliday {
                owner: owner.to_string(),
                value: value.to_string(),
            }
        })?;
        days.insert(day);
    }

    Ok(days
        .into_iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect())
}
