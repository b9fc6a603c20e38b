//! Rust implementation of the radiology site allocator.
//!
//! This module provides the quota, sequencing and placement engine behind
//! the quarterly planning, plus the calendar helpers the planner needs.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap};

pub mod calendar;
mod config;
pub mod interner;
pub mod logging;
mod models;
pub mod quota;
pub mod scheduler;
pub mod sequence;
pub mod sites;
pub mod staffing;
pub mod summary;

pub use config::AllocatorConfig;
pub use models::{
    Allocation, AllocationResult, AllocationWarning, DayAssignment, PersonConfig, SiteConfig,
};
pub use scheduler::ScheduleAllocator;
pub use sites::{ConfigError, Site, SiteRegistry};

/// Validate the configuration and allocate sites over `working_days`.
///
/// Only configuration problems are errors; allocation shortfalls are
/// reported as warnings on the returned `Allocation`.
pub fn allocate(
    sites: Vec<SiteConfig>,
    working_days: &[NaiveDate],
    config: &AllocatorConfig,
) -> Result<Allocation, ConfigError> {
    let registry = SiteRegistry::new(sites, config)?;
    Ok(ScheduleAllocator::new(&registry, working_days, config).allocate())
}

fn to_py_err(e: ConfigError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

/// Allocate sites to the two daily slots of each working day.
///
/// # Arguments
/// * `sites` - Site configuration records
/// * `working_days` - Ordered business days (weekends and public holidays removed)
/// * `config` - Allocator settings, defaults when omitted
/// * `assign_people` - Label `advanced_split` slots with a radiologist
///
/// # Raises
/// * ValueError if the configuration is invalid
#[pyfunction]
#[pyo3(signature = (sites, working_days, config=None, assign_people=true))]
fn allocate_schedule(
    sites: Vec<SiteConfig>,
    working_days: Vec<NaiveDate>,
    config: Option<AllocatorConfig>,
    assign_people: bool,
) -> PyResult<AllocationResult> {
    let config = config.unwrap_or_default();
    let registry = SiteRegistry::new(sites, &config).map_err(to_py_err)?;
    let mut allocation = ScheduleAllocator::new(&registry, &working_days, &config).allocate();

    if assign_people {
        allocation.schedule = staffing::assign_people(&allocation.schedule, &registry);
    }

    Ok(allocation.into())
}

/// Slot quotas per site key for `total_slots`, after the pairing adjustment.
#[pyfunction]
#[pyo3(signature = (sites, total_slots, config=None))]
fn compute_quotas(
    sites: Vec<SiteConfig>,
    total_slots: u32,
    config: Option<AllocatorConfig>,
) -> PyResult<HashMap<String, u32>> {
    let config = config.unwrap_or_default();
    let registry = SiteRegistry::new(sites, &config).map_err(to_py_err)?;

    let base = quota::calculate_quotas(&registry, total_slots);
    let (adjusted, residual) =
        quota::adjust_for_paired_sites(&base, &registry, total_slots, &config);
    if residual > 0 {
        tracing::warn!("{}", AllocationWarning::QuotaMismatch { residual });
    }

    Ok(adjusted
        .into_iter()
        .map(|(id, quota)| (registry.get(id).key.clone(), quota))
        .collect())
}

/// Working days between `start` and `end` and the public holidays removed.
///
/// # Returns
/// * (working days, [(holiday date, holiday name)])
#[pyfunction]
#[pyo3(signature = (start, end, public_holidays=None))]
fn get_working_days(
    start: NaiveDate,
    end: NaiveDate,
    public_holidays: Option<HashMap<NaiveDate, String>>,
) -> (Vec<NaiveDate>, Vec<(NaiveDate, String)>) {
    let holidays: BTreeMap<NaiveDate, String> =
        public_holidays.unwrap_or_default().into_iter().collect();
    let result = calendar::working_days(start, end, &holidays);
    (result.days, result.holidays)
}

#[pyfunction(name = "quarter_id")]
fn py_quarter_id(day: NaiveDate) -> String {
    calendar::quarter_id(day)
}

#[pyfunction(name = "quarter_bounds")]
fn py_quarter_bounds(start: NaiveDate) -> PyResult<(NaiveDate, NaiveDate)> {
    calendar::quarter_bounds(start)
        .ok_or_else(|| pyo3::exceptions::PyValueError::new_err("Quarter out of date range"))
}

#[pyfunction(name = "next_quarter_start")]
fn py_next_quarter_start(today: NaiveDate) -> PyResult<NaiveDate> {
    calendar::next_quarter_start(today)
        .ok_or_else(|| pyo3::exceptions::PyValueError::new_err("Quarter out of date range"))
}

#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<SiteConfig>()?;
    m.add_class::<PersonConfig>()?;
    m.add_class::<AllocationResult>()?;

    // Config types
    m.add_class::<AllocatorConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(allocate_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(compute_quotas, m)?)?;

    // Calendar
    m.add_function(wrap_pyfunction!(get_working_days, m)?)?;
    m.add_function(wrap_pyfunction!(py_quarter_id, m)?)?;
    m.add_function(wrap_pyfunction!(py_quarter_bounds, m)?)?;
    m.add_function(wrap_pyfunction!(py_next_quarter_start, m)?)?;

    Ok(())
}
