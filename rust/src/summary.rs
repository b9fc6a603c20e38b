//! Read-only views over a finished allocation.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use std::fmt;

use crate::config::AllocatorConfig;
use crate::models::Allocation;

/// Label all Majorelle variants fold into in grouped totals.
const GROUPED_MAJORELLE: &str = "Majo";

/// One line of the tabular view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleRow {
    pub date: NaiveDate,
    /// Empty when the slot is unfilled
    pub affectation_1: String,
    pub affectation_2: String,
}

/// Rows in date order, one per working day.
pub fn rows(allocation: &Allocation) -> Vec<ScheduleRow> {
    allocation
        .schedule
        .iter()
        .map(|(&date, [first, second])| ScheduleRow {
            date,
            affectation_1: first.clone().unwrap_or_default(),
            affectation_2: second.clone().unwrap_or_default(),
        })
        .collect()
}

/// Fold every name starting with `majo` (any case) into `Majo`.
pub fn simplified_name(name: &str) -> &str {
    let is_majo = name
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("majo"));
    if is_majo {
        GROUPED_MAJORELLE
    } else {
        name
    }
}

/// Slot count per name, highest first, ties by name.
pub fn site_totals(allocation: &Allocation, grouped: bool) -> Vec<(String, u32)> {
    let mut counts: FxHashMap<&str, u32> = FxHashMap::default();
    for name in allocation
        .schedule
        .values()
        .flat_map(|slots| slots.iter().flatten())
    {
        let label = if grouped {
            simplified_name(name)
        } else {
            name.as_str()
        };
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut totals: Vec<(String, u32)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FridayStatus {
    Optimal,
    Acceptable,
    ToReview,
}

impl FridayStatus {
    pub fn classify(count: u32, config: &AllocatorConfig) -> Self {
        if count == config.friday_target {
            FridayStatus::Optimal
        } else if (config.friday_min..=config.friday_max).contains(&count) {
            FridayStatus::Acceptable
        } else {
            FridayStatus::ToReview
        }
    }
}

impl fmt::Display for FridayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FridayStatus::Optimal => "Optimal",
            FridayStatus::Acceptable => "Acceptable",
            FridayStatus::ToReview => "To review",
        };
        f.write_str(label)
    }
}

/// Final Friday count and status per Majorelle site, in key order.
pub fn friday_report(
    allocation: &Allocation,
    config: &AllocatorConfig,
) -> Vec<(String, u32, FridayStatus)> {
    allocation
        .friday_counts
        .iter()
        .map(|(key, &count)| (key.clone(), count, FridayStatus::classify(count, config)))
        .collect()
}
