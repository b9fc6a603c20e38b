//! Core data types for the allocation engine.

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// Note: results use BTreeMap so that two runs can be compared for equality

/// One day's two slots, each a site display name or unfilled.
pub type DayAssignment = [Option<String>; 2];

/// A radiologist attached to an `advanced_split` site.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct PersonConfig {
    #[pyo3(get, set)]
    pub name: String,
    /// Allowed weekdays, 0 = Monday. Empty means Monday to Friday.
    #[pyo3(get, set)]
    pub available_weekdays: Vec<u8>,
    /// Days off as `YYYY-MM-DD` strings
    #[pyo3(get, set)]
    pub holidays: Vec<String>,
}

impl PersonConfig {
    /// Person available Monday to Friday with no days off.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_weekdays(mut self, weekdays: &[u8]) -> Self {
        self.available_weekdays = weekdays.to_vec();
        self
    }

    pub fn with_holidays(mut self, holidays: &[&str]) -> Self {
        self.holidays = holidays.iter().map(|h| h.to_string()).collect();
        self
    }
}

#[pymethods]
impl PersonConfig {
    #[new]
    #[pyo3(signature = (name, available_weekdays=None, holidays=None))]
    fn new(name: String, available_weekdays: Option<Vec<u8>>, holidays: Option<Vec<String>>) -> Self {
        Self {
            name,
            available_weekdays: available_weekdays.unwrap_or_default(),
            holidays: holidays.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PersonConfig(name={:?}, holidays={})",
            self.name,
            self.holidays.len()
        )
    }
}

/// Raw configuration record for one site, as produced by the config loader.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct SiteConfig {
    #[pyo3(get, set)]
    pub key: String,
    #[pyo3(get, set)]
    pub name: String,
    /// Staffing weight; negative values count as zero
    #[pyo3(get, set)]
    pub nb_radiologists: i64,
    /// Allowed weekdays, 0 = Monday. Empty means no restriction.
    #[pyo3(get, set)]
    pub available_weekdays: Vec<u8>,
    /// Closed days as `YYYY-MM-DD` strings
    #[pyo3(get, set)]
    pub holidays: Vec<String>,
    #[pyo3(get, set)]
    pub pair_same_day: bool,
    #[pyo3(get, set)]
    pub advanced_split: bool,
    #[pyo3(get, set)]
    pub people: Vec<PersonConfig>,
}

impl SiteConfig {
    /// Unrestricted site with the given weight.
    pub fn weighted(key: &str, name: &str, nb_radiologists: i64) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            nb_radiologists,
            ..Self::default()
        }
    }

    pub fn with_weekdays(mut self, weekdays: &[u8]) -> Self {
        self.available_weekdays = weekdays.to_vec();
        self
    }

    pub fn with_holidays(mut self, holidays: &[&str]) -> Self {
        self.holidays = holidays.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn paired(mut self) -> Self {
        self.pair_same_day = true;
        self
    }

    pub fn with_people(mut self, people: Vec<PersonConfig>) -> Self {
        self.advanced_split = true;
        self.people = people;
        self
    }
}

#[pymethods]
impl SiteConfig {
    #[new]
    #[pyo3(signature = (
        key,
        name,
        nb_radiologists,
        available_weekdays=None,
        holidays=None,
        pair_same_day=false,
        advanced_split=false,
        people=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        key: String,
        name: String,
        nb_radiologists: i64,
        available_weekdays: Option<Vec<u8>>,
        holidays: Option<Vec<String>>,
        pair_same_day: bool,
        advanced_split: bool,
        people: Option<Vec<PersonConfig>>,
    ) -> Self {
        Self {
            key,
            name,
            nb_radiologists,
            available_weekdays: available_weekdays.unwrap_or_default(),
            holidays: holidays.unwrap_or_default(),
            pair_same_day,
            advanced_split,
            people: people.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SiteConfig(key={:?}, name={:?}, nb_radiologists={}, pair_same_day={})",
            self.key, self.name, self.nb_radiologists, self.pair_same_day
        )
    }
}

/// A soft constraint shortfall. Never fatal: the allocation still completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationWarning {
    /// Pairing adjustment could not bring the quota sum back to the slot count.
    QuotaMismatch { residual: u32 },
    /// A Majorelle site is open on fewer Fridays than its target.
    FewAvailableFridays {
        site: String,
        available: usize,
        target: u32,
    },
    /// The Majorelle sites together cannot all reach their Friday target.
    InsufficientFridays { possible: usize, required: usize },
    /// The sequence ran dry before this day was reached.
    SequenceExhausted { day: NaiveDate },
    /// A paired site found no second occurrence for its day.
    PairIncomplete { site: String, day: NaiveDate },
    /// A sequence entry could not be placed by backfilling.
    Unplaced { site: String },
    /// Rebalancing left a Majorelle site under the Friday floor.
    RebalanceFailed { site: String, fridays: u32 },
    /// Final Friday count outside the acceptable range.
    FridayTargetMissed { site: String, fridays: u32 },
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaMismatch { residual } => {
                write!(f, "Quota sum exceeds slot count by {}", residual)
            }
            Self::FewAvailableFridays {
                site,
                available,
                target,
            } => write!(
                f,
                "Site {} has only {} Fridays available (need {})",
                site, available, target
            ),
            Self::InsufficientFridays { possible, required } => write!(
                f,
                "Only {} Friday reservations possible for {} required",
                possible, required
            ),
            Self::SequenceExhausted { day } => {
                write!(f, "No more sites to allocate from {}", day)
            }
            Self::PairIncomplete { site, day } => {
                write!(f, "No second occurrence of paired site {} on {}", site, day)
            }
            Self::Unplaced { site } => write!(f, "Unable to place {}", site),
            Self::RebalanceFailed { site, fridays } => write!(
                f,
                "Unable to rebalance {} (stays at {} Fridays)",
                site, fridays
            ),
            Self::FridayTargetMissed { site, fridays } => {
                write!(f, "{} ends with {} Fridays", site, fridays)
            }
        }
    }
}

/// Outcome of one `ScheduleAllocator::allocate` run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
    /// Day -> two slots of site display names
    pub schedule: BTreeMap<NaiveDate, DayAssignment>,
    /// Slots owed per site key after pairing adjustment
    pub quotas: BTreeMap<String, u32>,
    /// Fridays reserved for each Majorelle site key
    pub friday_allocation: BTreeMap<String, Vec<NaiveDate>>,
    /// Fridays actually held by each Majorelle site key in the final schedule
    pub friday_counts: BTreeMap<String, u32>,
    /// Site keys left in the sequence after backfilling
    pub unplaced: Vec<String>,
    pub warnings: Vec<AllocationWarning>,
}

impl Allocation {
    /// Number of unfilled slots over the whole period.
    pub fn unfilled_slots(&self) -> usize {
        self.schedule
            .values()
            .map(|slots| slots.iter().filter(|s| s.is_none()).count())
            .sum()
    }

    /// Slots of a given day, if it was scheduled.
    pub fn day(&self, day: NaiveDate) -> Option<&DayAssignment> {
        self.schedule.get(&day)
    }
}

/// Allocation outcome exposed to Python.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct AllocationResult {
    #[pyo3(get)]
    pub schedule: BTreeMap<NaiveDate, Vec<Option<String>>>,
    #[pyo3(get)]
    pub quotas: HashMap<String, u32>,
    #[pyo3(get)]
    pub friday_allocation: HashMap<String, Vec<NaiveDate>>,
    #[pyo3(get)]
    pub friday_counts: HashMap<String, u32>,
    #[pyo3(get)]
    pub unplaced: Vec<String>,
    #[pyo3(get)]
    pub warnings: Vec<String>,
}

impl From<Allocation> for AllocationResult {
    fn from(allocation: Allocation) -> Self {
        Self {
            schedule: allocation
                .schedule
                .into_iter()
                .map(|(day, slots)| (day, slots.to_vec()))
                .collect(),
            quotas: allocation.quotas.into_iter().collect(),
            friday_allocation: allocation.friday_allocation.into_iter().collect(),
            friday_counts: allocation.friday_counts.into_iter().collect(),
            unplaced: allocation.unplaced,
            warnings: allocation.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[pymethods]
impl AllocationResult {
    fn __repr__(&self) -> String {
        format!(
            "AllocationResult(days={}, unplaced={}, warnings={})",
            self.schedule.len(),
            self.unplaced.len(),
            self.warnings.len()
        )
    }
}
