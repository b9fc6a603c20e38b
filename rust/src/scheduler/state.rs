//! Mutable schedule state owned by the allocator during a run.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;

use crate::interner::SiteId;
use crate::models::DayAssignment;
use crate::sites::SiteRegistry;

/// The two slots of one working day.
pub type DaySlots = [Option<SiteId>; 2];

/// Working days with their slots, indexed by position in the day list.
#[derive(Clone, Debug)]
pub struct Schedule {
    days: Vec<NaiveDate>,
    slots: Vec<DaySlots>,
}

impl Schedule {
    /// Create a schedule with every slot unfilled.
    pub fn new(days: &[NaiveDate]) -> Self {
        Self {
            days: days.to_vec(),
            slots: vec![[None, None]; days.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    #[inline]
    pub fn date(&self, idx: usize) -> NaiveDate {
        self.days[idx]
    }

    #[inline]
    pub fn is_friday(&self, idx: usize) -> bool {
        self.days[idx].weekday() == Weekday::Fri
    }

    #[inline]
    pub fn slots(&self, idx: usize) -> &DaySlots {
        &self.slots[idx]
    }

    pub fn set_day(&mut self, idx: usize, slots: DaySlots) {
        self.slots[idx] = slots;
    }

    pub fn set_slot(&mut self, idx: usize, slot: usize, site: Option<SiteId>) {
        self.slots[idx][slot] = site;
    }

    /// First slot of the day holding `site`.
    pub fn position(&self, idx: usize, site: SiteId) -> Option<usize> {
        self.slots[idx].iter().position(|s| *s == Some(site))
    }

    pub fn contains(&self, idx: usize, site: SiteId) -> bool {
        self.position(idx, site).is_some()
    }

    pub fn has_unfilled(&self, idx: usize) -> bool {
        self.slots[idx].iter().any(|s| s.is_none())
    }

    /// Indices of days with at least one unfilled slot, in date order.
    pub fn unfilled_days(&self) -> Vec<usize> {
        (0..self.len()).filter(|&idx| self.has_unfilled(idx)).collect()
    }

    pub fn unfilled_slots(&self) -> usize {
        self.slots
            .iter()
            .map(|day| day.iter().filter(|s| s.is_none()).count())
            .sum()
    }

    /// Number of Fridays on which `site` holds at least one slot.
    pub fn friday_count(&self, site: SiteId) -> u32 {
        (0..self.len())
            .filter(|&idx| self.is_friday(idx) && self.contains(idx, site))
            .count() as u32
    }

    /// Resolve site ids to display names.
    pub fn to_names(&self, sites: &SiteRegistry) -> BTreeMap<NaiveDate, DayAssignment> {
        self.days
            .iter()
            .zip(&self.slots)
            .map(|(&day, slots)| {
                let names = slots.map(|slot| slot.map(|id| sites.get(id).name.clone()));
                (day, names)
            })
            .collect()
    }
}
