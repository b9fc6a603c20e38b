//! Configuration types for the allocation engine.

use pyo3::prelude::*;

use crate::sites::ConfigError;

/// Tuning knobs for quota computation and Friday fairness.
#[pyclass]
#[derive(Clone, Debug)]
pub struct AllocatorConfig {
    /// Logging verbosity (0-3), see `crate::logging`
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Key prefix identifying sites bound by the Friday-fairness contract
    #[pyo3(get, set)]
    pub majorelle_prefix: String,
    /// Case-insensitive key prefix of sites the pairing adjustment never trims
    #[pyo3(get, set)]
    pub reserved_prefix: String,
    /// Number of leading key characters forming a site's prefix group
    #[pyo3(get, set)]
    pub group_prefix_len: usize,
    /// Fridays reserved for each Majorelle site
    #[pyo3(get, set)]
    pub friday_target: u32,
    /// Floor enforced by the rebalance phase
    #[pyo3(get, set)]
    pub friday_min: u32,
    /// Ceiling tolerated while backfilling
    #[pyo3(get, set)]
    pub friday_max: u32,
    /// Number of contiguous periods the quarter's Fridays are split into
    #[pyo3(get, set)]
    pub friday_periods: usize,
    /// Trim attempts allowed per candidate site when re-balancing paired quotas
    #[pyo3(get, set)]
    pub pairing_retry_factor: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            majorelle_prefix: "majorelle_".to_string(),
            reserved_prefix: "majo".to_string(),
            group_prefix_len: 9,
            friday_target: 4,
            friday_min: 3,
            friday_max: 5,
            friday_periods: 4,
            pairing_retry_factor: 10,
        }
    }
}

impl AllocatorConfig {
    /// Check that the Friday bounds are ordered `min <= target <= max`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.friday_min > self.friday_target || self.friday_target > self.friday_max {
            return Err(ConfigError::InvalidFridayBounds {
                min: self.friday_min,
                target: self.friday_target,
                max: self.friday_max,
            });
        }
        Ok(())
    }

    /// Whether a site key is exempt from quota trimming.
    pub fn is_reserved_key(&self, key: &str) -> bool {
        key.to_lowercase()
            .starts_with(&self.reserved_prefix.to_lowercase())
    }
}

#[pymethods]
impl AllocatorConfig {
    #[new]
    #[pyo3(signature = (
        verbosity=None,
        majorelle_prefix=None,
        reserved_prefix=None,
        group_prefix_len=None,
        friday_target=None,
        friday_min=None,
        friday_max=None,
        friday_periods=None,
        pairing_retry_factor=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        verbosity: Option<u8>,
        majorelle_prefix: Option<String>,
        reserved_prefix: Option<String>,
        group_prefix_len: Option<usize>,
        friday_target: Option<u32>,
        friday_min: Option<u32>,
        friday_max: Option<u32>,
        friday_periods: Option<usize>,
        pairing_retry_factor: Option<usize>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            majorelle_prefix: majorelle_prefix.unwrap_or(defaults.majorelle_prefix),
            reserved_prefix: reserved_prefix.unwrap_or(defaults.reserved_prefix),
            group_prefix_len: group_prefix_len.unwrap_or(defaults.group_prefix_len),
            friday_target: friday_target.unwrap_or(defaults.friday_target),
            friday_min: friday_min.unwrap_or(defaults.friday_min),
            friday_max: friday_max.unwrap_or(defaults.friday_max),
            friday_periods: friday_periods.unwrap_or(defaults.friday_periods),
            pairing_retry_factor: pairing_retry_factor.unwrap_or(defaults.pairing_retry_factor),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "AllocatorConfig(majorelle_prefix={:?}, fridays={}/{}/{})",
            self.majorelle_prefix, self.friday_min, self.friday_target, self.friday_max
        )
    }
}
