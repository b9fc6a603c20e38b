//! Friday reservations and counters for Majorelle sites.
//!
//! Each Majorelle site is owed `friday_target` Fridays per quarter. The
//! reservations are drawn up front, spread over contiguous periods of the
//! quarter, and the allocator then tracks how many Fridays each site really
//! holds so placement can be gated against the target and the ceiling.

use chrono::{Datelike, NaiveDate, Weekday};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

use crate::config::AllocatorConfig;
use crate::interner::SiteId;
use crate::log_changes;
use crate::models::AllocationWarning;
use crate::sites::SiteRegistry;

/// Split Fridays into `periods` contiguous chunks of near-equal size.
///
/// All chunks but the last have `len / periods` entries; the last one takes
/// the rest.
pub fn split_into_periods(fridays: &[NaiveDate], periods: usize) -> Vec<&[NaiveDate]> {
    let periods = periods.max(1);
    let size = fridays.len() / periods;
    (0..periods)
        .map(|i| {
            let start = i * size;
            if i == periods - 1 {
                &fridays[start..]
            } else {
                &fridays[start..start + size]
            }
        })
        .collect()
}

pub struct FridayManager<'a> {
    sites: &'a SiteRegistry,
    config: &'a AllocatorConfig,
    majorelle: Vec<SiteId>,
    allocation: BTreeMap<SiteId, Vec<NaiveDate>>,
    claimed: FxHashSet<NaiveDate>,
    used: FxHashMap<SiteId, u32>,
}

impl<'a> FridayManager<'a> {
    pub fn new(sites: &'a SiteRegistry, config: &'a AllocatorConfig) -> Self {
        let majorelle = sites.majorelle_ids();
        let used = majorelle.iter().map(|&id| (id, 0)).collect();
        Self {
            sites,
            config,
            majorelle,
            allocation: BTreeMap::new(),
            claimed: FxHashSet::default(),
            used,
        }
    }

    pub fn majorelle_sites(&self) -> &[SiteId] {
        &self.majorelle
    }

    #[inline]
    pub fn is_majorelle(&self, site: SiteId) -> bool {
        self.sites.get(site).is_majorelle
    }

    /// Reserved Fridays per Majorelle site.
    pub fn allocation(&self) -> &BTreeMap<SiteId, Vec<NaiveDate>> {
        &self.allocation
    }

    /// Reserve Fridays for every Majorelle site.
    ///
    /// Each period hands at most one available, unclaimed Friday to each
    /// site, favouring the site with the fewest reservations so far (key
    /// order on ties). Sites still short afterwards take any of their
    /// remaining unclaimed Fridays. Returns the shortfalls found on the way.
    pub fn allocate_fridays(&mut self, working_days: &[NaiveDate]) -> Vec<AllocationWarning> {
        let mut warnings = Vec::new();
        let target = self.config.friday_target;
        let fridays: Vec<NaiveDate> = working_days
            .iter()
            .copied()
            .filter(|d| d.weekday() == Weekday::Fri)
            .collect();

        self.allocation = self.majorelle.iter().map(|&id| (id, Vec::new())).collect();
        self.claimed.clear();

        if self.majorelle.is_empty() || fridays.is_empty() {
            return warnings;
        }

        let mut available: FxHashMap<SiteId, Vec<NaiveDate>> = FxHashMap::default();
        for &id in &self.majorelle {
            let site = self.sites.get(id);
            let open: Vec<NaiveDate> = fridays
                .iter()
                .copied()
                .filter(|&f| site.is_available(f))
                .collect();
            if open.len() < target as usize {
                warnings.push(AllocationWarning::FewAvailableFridays {
                    site: site.key.clone(),
                    available: open.len(),
                    target,
                });
            }
            available.insert(id, open);
        }

        let possible: usize = available
            .values()
            .map(|open| open.len().min(target as usize))
            .sum();
        let required = self.majorelle.len() * target as usize;
        if possible < required {
            warnings.push(AllocationWarning::InsufficientFridays { possible, required });
        }

        for period in split_into_periods(&fridays, self.config.friday_periods) {
            let mut needing: Vec<SiteId> = self.majorelle.clone();

            for &friday in period {
                if needing.is_empty() {
                    break;
                }
                if self.claimed.contains(&friday) {
                    continue;
                }

                let chosen = needing
                    .iter()
                    .copied()
                    .filter(|id| {
                        available[id].contains(&friday)
                            && self.allocation[id].len() < target as usize
                    })
                    .min_by_key(|id| (self.allocation[id].len(), *id));

                if let Some(site) = chosen {
                    self.reserve(site, friday);
                    needing.retain(|&id| id != site);
                }
            }
        }

        for id in self.majorelle.clone() {
            let missing = (target as usize).saturating_sub(self.allocation[&id].len());
            if missing > 0 {
                let extra: Vec<NaiveDate> = available[&id]
                    .iter()
                    .copied()
                    .filter(|f| !self.claimed.contains(f))
                    .take(missing)
                    .collect();
                for friday in extra {
                    self.reserve(id, friday);
                }
            }
            if let Some(reserved) = self.allocation.get_mut(&id) {
                reserved.sort();
            }
        }

        for (&id, reserved) in &self.allocation {
            log_changes!(
                self.config.verbosity,
                phase = "friday_preallocation",
                site = %self.sites.get(id).name,
                reserved = reserved.len(),
                friday_target = target,
                "Fridays reserved"
            );
        }

        warnings
    }

    fn reserve(&mut self, site: SiteId, friday: NaiveDate) {
        if let Some(reserved) = self.allocation.get_mut(&site) {
            reserved.push(friday);
            self.claimed.insert(friday);
        }
    }

    /// Whether `day` is one of the Fridays reserved for `site`.
    pub fn is_reserved_for(&self, site: SiteId, day: NaiveDate) -> bool {
        self.allocation
            .get(&site)
            .is_some_and(|reserved| reserved.contains(&day))
    }

    /// The Majorelle site that should open this Friday, if any.
    ///
    /// Only returned while the site is under its target and still open.
    pub fn should_place_majorelle_on_friday(&self, day: NaiveDate) -> Option<SiteId> {
        if day.weekday() != Weekday::Fri {
            return None;
        }
        for &id in &self.majorelle {
            if !self.is_reserved_for(id, day) || self.friday_count(id) >= self.config.friday_target
            {
                continue;
            }
            if self.sites.get(id).is_available(day) {
                return Some(id);
            }
            log_changes!(
                self.config.verbosity,
                phase = "main",
                site = %self.sites.get(id).name,
                day = %day,
                "reserved Friday is no longer available"
            );
        }
        None
    }

    pub fn increment_friday_count(&mut self, site: SiteId) {
        if let Some(count) = self.used.get_mut(&site) {
            *count += 1;
        }
    }

    pub fn decrement_friday_count(&mut self, site: SiteId) {
        if let Some(count) = self.used.get_mut(&site) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn friday_count(&self, site: SiteId) -> u32 {
        self.used.get(&site).copied().unwrap_or(0)
    }

    /// Friday ceiling: the target normally, the hard maximum while backfilling.
    pub fn can_place_on_friday(&self, site: SiteId, backfilling: bool) -> bool {
        if !self.is_majorelle(site) {
            return true;
        }
        let ceiling = if backfilling {
            self.config.friday_max
        } else {
            self.config.friday_target
        };
        self.friday_count(site) < ceiling
    }

    /// Reserved Fridays of `site` strictly after `day`.
    pub fn future_friday_count(&self, site: SiteId, day: NaiveDate) -> usize {
        self.allocation
            .get(&site)
            .map(|reserved| reserved.iter().filter(|&&f| f > day).count())
            .unwrap_or(0)
    }
}
