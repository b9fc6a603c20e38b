//! Core five-phase allocator.
//!
//! Phases run strictly in order, once per allocator:
//! 1. Friday pre-allocation for Majorelle sites
//! 2. Quotas and SWRR sequence
//! 3. Greedy day-by-day placement
//! 4. Backfilling unplaced sequence entries through swaps
//! 5. Majorelle Friday rebalance

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;

use crate::config::AllocatorConfig;
use crate::interner::SiteId;
use crate::models::{Allocation, AllocationWarning};
use crate::quota::{adjust_for_paired_sites, calculate_quotas, QuotaMap};
use crate::sequence::generate_sequence;
use crate::sites::SiteRegistry;
use crate::{log_changes, log_checks, log_debug};

use super::fridays::FridayManager;
use super::state::{DaySlots, Schedule};
use super::validator::ConstraintValidator;

/// Pipeline phase, used to tag log events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    FridayPreallocation,
    Quotas,
    Main,
    Backfill,
    Rebalance,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::FridayPreallocation => "friday_preallocation",
            Phase::Quotas => "quotas",
            Phase::Main => "main",
            Phase::Backfill => "backfill",
            Phase::Rebalance => "rebalance",
        }
    }
}

/// A rebalance exchange: (friday, donor slot, weekday, receiver slot).
type Exchange = (usize, usize, usize, usize);

/// Allocates sites to the two daily slots of a list of working days.
pub struct ScheduleAllocator<'a> {
    sites: &'a SiteRegistry,
    config: &'a AllocatorConfig,
    validator: ConstraintValidator<'a>,
    fridays: FridayManager<'a>,
    working_days: &'a [NaiveDate],
    schedule: Schedule,
    warnings: Vec<AllocationWarning>,
}

impl<'a> ScheduleAllocator<'a> {
    /// Create an allocator over `working_days` (ordered, weekends and public
    /// holidays already removed).
    pub fn new(
        sites: &'a SiteRegistry,
        working_days: &'a [NaiveDate],
        config: &'a AllocatorConfig,
    ) -> Self {
        Self {
            sites,
            config,
            validator: ConstraintValidator::new(sites),
            fridays: FridayManager::new(sites, config),
            working_days,
            schedule: Schedule::new(working_days),
            warnings: Vec::new(),
        }
    }

    pub fn total_slots(&self) -> u32 {
        self.working_days.len() as u32 * 2
    }

    /// Run the whole pipeline and return the final schedule.
    ///
    /// Never fails: constraint shortfalls degrade to unfilled slots,
    /// unplaced sites or Friday counts off target, each reported as a
    /// warning on the result.
    pub fn allocate(mut self) -> Allocation {
        let total_slots = self.total_slots();
        log_changes!(self.config.verbosity, total_slots, "Starting allocation");

        if total_slots == 0 {
            return Allocation::default();
        }

        let warnings = self.fridays.allocate_fridays(self.working_days);
        for warning in warnings {
            self.warn(Phase::FridayPreallocation, warning);
        }

        let quotas = self.calculate_quotas(total_slots);
        if quotas.is_empty() {
            log_changes!(
                self.config.verbosity,
                phase = Phase::Quotas.as_str(),
                "Total staffing weight is zero, nothing to allocate"
            );
            return Allocation {
                warnings: self.warnings,
                ..Allocation::default()
            };
        }

        let mut sequence = generate_sequence(&quotas);
        log_debug!(
            self.config.verbosity,
            phase = Phase::Quotas.as_str(),
            length = sequence.len(),
            "Sequence generated"
        );

        self.main_allocation(&mut sequence);
        self.backfill(&mut sequence);
        self.rebalance_majorelle_fridays();
        self.verify_fridays();

        self.into_allocation(&quotas, &sequence)
    }

    fn warn(&mut self, phase: Phase, warning: AllocationWarning) {
        tracing::warn!(phase = phase.as_str(), "{}", warning);
        self.warnings.push(warning);
    }

    fn site_key(&self, site: SiteId) -> String {
        self.sites.get(site).key.clone()
    }

    fn site_name(&self, site: SiteId) -> &str {
        &self.sites.get(site).name
    }

    fn calculate_quotas(&mut self, total_slots: u32) -> QuotaMap {
        let base = calculate_quotas(self.sites, total_slots);
        if base.is_empty() {
            return base;
        }

        let (adjusted, residual) =
            adjust_for_paired_sites(&base, self.sites, total_slots, self.config);
        if residual > 0 {
            self.warn(Phase::Quotas, AllocationWarning::QuotaMismatch { residual });
        }

        for (&id, &quota) in &adjusted {
            log_checks!(
                self.config.verbosity,
                phase = Phase::Quotas.as_str(),
                site = %self.site_name(id),
                quota,
                "Quota computed"
            );
        }

        adjusted
    }

    // ---- Phase 3: main allocation ----

    fn main_allocation(&mut self, sequence: &mut Vec<SiteId>) {
        for idx in 0..self.schedule.len() {
            let day = self.schedule.date(idx);
            if sequence.is_empty() {
                self.warn(Phase::Main, AllocationWarning::SequenceExhausted { day });
                break;
            }

            let slots = self.allocate_day(idx, sequence);
            self.schedule.set_day(idx, slots);

            log_changes!(
                self.config.verbosity,
                phase = Phase::Main.as_str(),
                day = %day,
                first = ?slots[0].map(|id| self.site_name(id)),
                second = ?slots[1].map(|id| self.site_name(id)),
                "Day allocated"
            );
        }
    }

    fn allocate_day(&mut self, idx: usize, sequence: &mut Vec<SiteId>) -> DaySlots {
        let day = self.schedule.date(idx);
        let is_friday = self.schedule.is_friday(idx);
        let reserved = self.fridays.should_place_majorelle_on_friday(day);

        let Some(pos) = self.find_first_site(day, sequence, reserved, is_friday) else {
            log_checks!(
                self.config.verbosity,
                phase = Phase::Main.as_str(),
                day = %day,
                "No site available, day left empty"
            );
            return [None, None];
        };

        let first = sequence.remove(pos);
        if is_friday && self.fridays.is_majorelle(first) {
            self.fridays.increment_friday_count(first);
        }

        let second = self.find_second_site(first, day, sequence, is_friday);
        [Some(first), second]
    }

    /// Position in the sequence of the site that opens `day`.
    fn find_first_site(
        &self,
        day: NaiveDate,
        sequence: &[SiteId],
        reserved: Option<SiteId>,
        is_friday: bool,
    ) -> Option<usize> {
        if let Some(reserved) = reserved {
            if let Some(pos) = sequence.iter().position(|&s| s == reserved) {
                return Some(pos);
            }
        }

        sequence.iter().position(|&site| {
            self.passes_friday_gates(site, day, sequence, is_friday)
                && self.validator.is_available(site, day)
        })
    }

    /// Consume the site that takes the second slot beside `first`.
    fn find_second_site(
        &mut self,
        first: SiteId,
        day: NaiveDate,
        sequence: &mut Vec<SiteId>,
        is_friday: bool,
    ) -> Option<SiteId> {
        if self.validator.is_paired(first) {
            if let Some(pos) = sequence.iter().position(|&s| s == first) {
                sequence.remove(pos);
                return Some(first);
            }
            let site = self.site_key(first);
            self.warn(Phase::Main, AllocationWarning::PairIncomplete { site, day });
            return None;
        }

        let found = {
            let queue: &[SiteId] = sequence;
            queue.iter().position(|&site| {
                self.passes_friday_gates(site, day, queue, is_friday)
                    && self.validator.validate_second_site(Some(first), Some(site))
                    && self.validator.is_available(site, day)
            })
        };

        let pos = found?;
        let site = sequence.remove(pos);
        if is_friday && self.fridays.is_majorelle(site) {
            self.fridays.increment_friday_count(site);
        }
        Some(site)
    }

    /// Friday ceiling plus the reservation-starvation guard.
    fn passes_friday_gates(
        &self,
        site: SiteId,
        day: NaiveDate,
        sequence: &[SiteId],
        is_friday: bool,
    ) -> bool {
        if is_friday && !self.fridays.can_place_on_friday(site, false) {
            return false;
        }
        if self.fridays.is_majorelle(site)
            && self.held_for_future_friday(site, day, sequence, is_friday)
        {
            return false;
        }
        true
    }

    /// Whether the site's remaining occurrences must be kept for its
    /// reserved Fridays after `day`.
    fn held_for_future_friday(
        &self,
        site: SiteId,
        day: NaiveDate,
        sequence: &[SiteId],
        is_friday: bool,
    ) -> bool {
        if is_friday && self.fridays.is_reserved_for(site, day) {
            return false;
        }
        let future = self.fridays.future_friday_count(site, day);
        if future == 0 {
            return false;
        }
        let remaining = sequence.iter().filter(|&&s| s == site).count();
        let held = remaining <= future;
        if held {
            log_checks!(
                self.config.verbosity,
                phase = Phase::Main.as_str(),
                site = %self.site_name(site),
                day = %day,
                remaining,
                future_fridays = future,
                "Keeping slots for reserved Fridays"
            );
        }
        held
    }

    // ---- Phase 4: backfilling ----

    fn backfill(&mut self, sequence: &mut Vec<SiteId>) {
        log_changes!(
            self.config.verbosity,
            phase = Phase::Backfill.as_str(),
            remaining = sequence.len(),
            "Starting backfill"
        );

        let unfilled = self.schedule.unfilled_days();
        if !unfilled.is_empty() && !sequence.is_empty() {
            let pending = sequence.clone();
            for site in pending {
                if self.try_place_site(site, &unfilled) {
                    if let Some(pos) = sequence.iter().position(|&s| s == site) {
                        sequence.remove(pos);
                    }
                } else {
                    log_checks!(
                        self.config.verbosity,
                        phase = Phase::Backfill.as_str(),
                        site = %self.site_name(site),
                        "No swap found"
                    );
                }
            }
        }

        for &site in sequence.iter() {
            let site = self.site_key(site);
            self.warn(Phase::Backfill, AllocationWarning::Unplaced { site });
        }

        log_changes!(
            self.config.verbosity,
            phase = Phase::Backfill.as_str(),
            unfilled_slots = self.schedule.unfilled_slots(),
            unplaced = sequence.len(),
            "Backfill finished"
        );
    }

    fn try_place_site(&mut self, site: SiteId, unfilled: &[usize]) -> bool {
        for &problem in unfilled {
            for slot in 0..2 {
                if self.schedule.slots(problem)[slot].is_some() {
                    continue;
                }
                if let Some((swap, swap_slot, displaced)) =
                    self.find_backfill_swap(site, problem, slot)
                {
                    self.execute_backfill_swap(site, displaced, problem, slot, swap, swap_slot);
                    return true;
                }
            }
        }
        false
    }

    /// Earlier occupied slot whose occupant can move to `problem[slot]`
    /// while `site` takes its place.
    fn find_backfill_swap(
        &self,
        site: SiteId,
        problem: usize,
        slot: usize,
    ) -> Option<(usize, usize, SiteId)> {
        for swap in 0..problem {
            if self.day_contains_paired_site(swap) {
                continue;
            }
            for swap_slot in 0..2 {
                let Some(displaced) = self.schedule.slots(swap)[swap_slot] else {
                    continue;
                };
                if self.validate_backfill_swap(site, displaced, problem, swap, slot, swap_slot) {
                    return Some((swap, swap_slot, displaced));
                }
            }
        }
        None
    }

    fn day_contains_paired_site(&self, idx: usize) -> bool {
        self.schedule
            .slots(idx)
            .iter()
            .flatten()
            .any(|&site| self.validator.is_paired(site))
    }

    fn validate_backfill_swap(
        &self,
        site: SiteId,
        displaced: SiteId,
        problem: usize,
        swap: usize,
        slot: usize,
        swap_slot: usize,
    ) -> bool {
        if !self
            .validator
            .is_available(displaced, self.schedule.date(problem))
        {
            return false;
        }
        if !self.validator.is_available(site, self.schedule.date(swap)) {
            return false;
        }
        if self.schedule.is_friday(swap) && !self.fridays.can_place_on_friday(site, true) {
            return false;
        }
        if self.schedule.is_friday(problem) && !self.fridays.can_place_on_friday(displaced, true)
        {
            return false;
        }

        self.validator.validate_swap(
            site,
            displaced,
            self.schedule.slots(problem),
            self.schedule.slots(swap),
            slot,
            swap_slot,
        )
    }

    fn execute_backfill_swap(
        &mut self,
        site: SiteId,
        displaced: SiteId,
        problem: usize,
        slot: usize,
        swap: usize,
        swap_slot: usize,
    ) {
        if self.schedule.is_friday(swap) {
            self.fridays.increment_friday_count(site);
            self.fridays.decrement_friday_count(displaced);
        }
        if self.schedule.is_friday(problem) {
            self.fridays.increment_friday_count(displaced);
        }

        self.schedule.set_slot(problem, slot, Some(displaced));
        self.schedule.set_slot(swap, swap_slot, Some(site));

        log_changes!(
            self.config.verbosity,
            phase = Phase::Backfill.as_str(),
            site = %self.site_name(site),
            placed_on = %self.schedule.date(swap),
            displaced = %self.site_name(displaced),
            moved_to = %self.schedule.date(problem),
            "Exchange executed"
        );
    }

    // ---- Phase 5: Majorelle Friday rebalance ----

    fn count_majorelle_fridays(&self) -> FxHashMap<SiteId, u32> {
        self.fridays
            .majorelle_sites()
            .iter()
            .map(|&id| (id, self.schedule.friday_count(id)))
            .collect()
    }

    fn rebalance_majorelle_fridays(&mut self) {
        let mut counts = self.count_majorelle_fridays();

        let under: Vec<SiteId> = self
            .fridays
            .majorelle_sites()
            .iter()
            .copied()
            .filter(|id| counts[id] < self.config.friday_min)
            .collect();

        for &id in self.fridays.majorelle_sites() {
            log_checks!(
                self.config.verbosity,
                phase = Phase::Rebalance.as_str(),
                site = %self.site_name(id),
                fridays = counts[&id],
                "Fridays before rebalance"
            );
        }

        for site in under {
            self.rebalance_single_site(site, &mut counts);
        }
    }

    fn rebalance_single_site(&mut self, site: SiteId, counts: &mut FxHashMap<SiteId, u32>) {
        while counts[&site] < self.config.friday_min {
            if self.try_rebalance_with_non_majorelle(site, counts) {
                continue;
            }
            if self.try_rebalance_with_majorelle(site, counts) {
                continue;
            }

            let fridays = counts[&site];
            let site = self.site_key(site);
            self.warn(
                Phase::Rebalance,
                AllocationWarning::RebalanceFailed { site, fridays },
            );
            break;
        }
    }

    fn try_rebalance_with_non_majorelle(
        &mut self,
        site: SiteId,
        counts: &mut FxHashMap<SiteId, u32>,
    ) -> bool {
        let donors: Vec<SiteId> = self
            .sites
            .iter()
            .filter(|s| !s.is_majorelle)
            .map(|s| s.id)
            .collect();

        donors
            .into_iter()
            .any(|donor| self.execute_rebalance_exchange(site, donor, counts, false))
    }

    fn try_rebalance_with_majorelle(
        &mut self,
        site: SiteId,
        counts: &mut FxHashMap<SiteId, u32>,
    ) -> bool {
        let mut donors: Vec<SiteId> = self
            .fridays
            .majorelle_sites()
            .iter()
            .copied()
            .filter(|&d| d != site && counts[&d] >= self.config.friday_target)
            .collect();
        // Most Fridays first, key order among equals
        donors.sort_by_key(|d| Reverse(counts[d]));

        donors
            .into_iter()
            .any(|donor| self.execute_rebalance_exchange(site, donor, counts, true))
    }

    fn execute_rebalance_exchange(
        &mut self,
        receiver: SiteId,
        donor: SiteId,
        counts: &mut FxHashMap<SiteId, u32>,
        majorelle_donor: bool,
    ) -> bool {
        let Some((friday, donor_slot, weekday, receiver_slot)) =
            self.find_rebalance_exchange(receiver, donor)
        else {
            return false;
        };

        self.schedule.set_slot(friday, donor_slot, Some(receiver));
        self.schedule.set_slot(weekday, receiver_slot, Some(donor));

        if majorelle_donor {
            if let Some(count) = counts.get_mut(&donor) {
                *count = count.saturating_sub(1);
            }
        }
        if let Some(count) = counts.get_mut(&receiver) {
            *count += 1;
        }
        self.fridays.decrement_friday_count(donor);
        self.fridays.increment_friday_count(receiver);

        log_changes!(
            self.config.verbosity,
            phase = Phase::Rebalance.as_str(),
            receiver = %self.site_name(receiver),
            donor = %self.site_name(donor),
            majorelle_donor,
            friday = %self.schedule.date(friday),
            weekday = %self.schedule.date(weekday),
            receiver_fridays = counts[&receiver],
            "Rebalance exchange executed"
        );
        true
    }

    /// Friday held by `donor` and weekday held by `receiver` that can be exchanged.
    fn find_rebalance_exchange(&self, receiver: SiteId, donor: SiteId) -> Option<Exchange> {
        for friday in 0..self.schedule.len() {
            if !self.schedule.is_friday(friday) {
                continue;
            }
            let Some(donor_slot) = self.schedule.position(friday, donor) else {
                continue;
            };

            for weekday in 0..self.schedule.len() {
                if self.schedule.is_friday(weekday) {
                    continue;
                }
                let Some(receiver_slot) = self.schedule.position(weekday, receiver) else {
                    continue;
                };

                if self.validate_rebalance_exchange(
                    receiver,
                    donor,
                    friday,
                    weekday,
                    donor_slot,
                    receiver_slot,
                ) {
                    return Some((friday, donor_slot, weekday, receiver_slot));
                }
            }
        }
        None
    }

    fn validate_rebalance_exchange(
        &self,
        receiver: SiteId,
        donor: SiteId,
        friday: usize,
        weekday: usize,
        donor_slot: usize,
        receiver_slot: usize,
    ) -> bool {
        if !self
            .validator
            .is_available(receiver, self.schedule.date(friday))
        {
            return false;
        }
        if !self.validator.is_available(donor, self.schedule.date(weekday)) {
            return false;
        }

        // Donor lands on the weekday, receiver on the Friday
        self.validator.validate_swap(
            receiver,
            donor,
            self.schedule.slots(weekday),
            self.schedule.slots(friday),
            receiver_slot,
            donor_slot,
        )
    }

    fn verify_fridays(&mut self) {
        let counts = self.count_majorelle_fridays();
        let majorelle: Vec<SiteId> = self.fridays.majorelle_sites().to_vec();

        for id in majorelle {
            let fridays = counts[&id];
            let status = if fridays == self.config.friday_target {
                "target"
            } else if fridays >= self.config.friday_min && fridays <= self.config.friday_max {
                "acceptable"
            } else {
                "out_of_range"
            };
            log_changes!(
                self.config.verbosity,
                phase = Phase::Rebalance.as_str(),
                site = %self.site_name(id),
                fridays,
                status,
                "Final Friday count"
            );

            if status == "out_of_range" {
                let site = self.site_key(id);
                self.warn(
                    Phase::Rebalance,
                    AllocationWarning::FridayTargetMissed { site, fridays },
                );
            }
        }
    }

    fn into_allocation(self, quotas: &QuotaMap, sequence: &[SiteId]) -> Allocation {
        let sites = self.sites;
        let key = |id: SiteId| sites.get(id).key.clone();

        Allocation {
            schedule: self.schedule.to_names(sites),
            quotas: quotas.iter().map(|(&id, &q)| (key(id), q)).collect(),
            friday_allocation: self
                .fridays
                .allocation()
                .iter()
                .map(|(&id, days)| (key(id), days.clone()))
                .collect(),
            friday_counts: self
                .fridays
                .majorelle_sites()
                .iter()
                .map(|&id| (key(id), self.schedule.friday_count(id)))
                .collect(),
            unplaced: sequence.iter().map(|&id| key(id)).collect(),
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::date_range;
    use crate::models::SiteConfig;
    use chrono::{Datelike, Weekday};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        date_range(start, end)
            .filter(|d| d.weekday().num_days_from_monday() < 5)
            .collect()
    }

    fn registry(configs: Vec<SiteConfig>) -> SiteRegistry {
        SiteRegistry::new(configs, &AllocatorConfig::default()).unwrap()
    }

    fn allocate(sites: &SiteRegistry, days: &[NaiveDate]) -> Allocation {
        let config = AllocatorConfig::default();
        ScheduleAllocator::new(sites, days, &config).allocate()
    }

    fn slot_names(allocation: &Allocation, day: NaiveDate) -> [Option<&str>; 2] {
        let slots = allocation.day(day).unwrap();
        [slots[0].as_deref(), slots[1].as_deref()]
    }

    fn quarter_sites() -> Vec<SiteConfig> {
        vec![
            SiteConfig::weighted("majorelle_a", "Majorelle A", 2),
            SiteConfig::weighted("majorelle_b", "Majorelle B", 2),
            SiteConfig::weighted("majorelle_c", "Majorelle C", 2)
                .with_weekdays(&[0, 1, 2, 3, 4])
                .with_holidays(&["2025-02-21", "2025-02-28"]),
            SiteConfig::weighted("clinique", "Clinique", 3),
            SiteConfig::weighted("hopital", "Hopital", 3),
            SiteConfig::weighted("imagerie", "Imagerie", 2).paired(),
            SiteConfig::weighted("cabinet", "Cabinet", 2).with_weekdays(&[0, 2, 4]),
        ]
    }

    #[test]
    fn test_two_equal_sites_alternate_without_gaps() {
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 1),
            SiteConfig::weighted("b", "B", 1),
        ]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 17));
        assert_eq!(days.len(), 10);

        let allocation = allocate(&sites, &days);

        assert_eq!(allocation.quotas["a"], 10);
        assert_eq!(allocation.quotas["b"], 10);
        assert_eq!(allocation.unfilled_slots(), 0);
        assert!(allocation.unplaced.is_empty());
        for day in &days {
            assert_eq!(slot_names(&allocation, *day), [Some("A"), Some("B")]);
        }
    }

    #[test]
    fn test_majorelle_site_gets_four_fridays() {
        let sites = registry(vec![
            SiteConfig::weighted("majorelle_a", "Majorelle A", 1),
            SiteConfig::weighted("clinique", "Clinique", 9),
        ]);
        let days = weekdays(d(2025, 1, 1), d(2025, 3, 31));
        let fridays = days.iter().filter(|d| d.weekday() == Weekday::Fri).count();
        assert!(fridays >= 12);

        let allocation = allocate(&sites, &days);

        assert!(allocation.quotas["majorelle_a"] >= 4);
        assert_eq!(allocation.friday_allocation["majorelle_a"].len(), 4);
        assert_eq!(allocation.friday_counts["majorelle_a"], 4);
    }

    #[test]
    fn test_paired_site_fills_both_slots() {
        let sites = registry(vec![
            SiteConfig::weighted("pair", "Pair", 7).paired(),
            SiteConfig::weighted("a", "A", 7),
            SiteConfig::weighted("b", "B", 6),
        ]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 17));

        let allocation = allocate(&sites, &days);

        assert_eq!(allocation.quotas["pair"], 8);
        assert_eq!(allocation.quotas.values().sum::<u32>(), 20);
        let mut paired_days = 0;
        for slots in allocation.schedule.values() {
            let pair_slots = slots
                .iter()
                .filter(|s| s.as_deref() == Some("Pair"))
                .count();
            assert!(pair_slots == 0 || pair_slots == 2, "half-paired day: {:?}", slots);
            if pair_slots == 2 {
                paired_days += 1;
            }
        }
        assert_eq!(paired_days, 4);
    }

    #[test]
    fn test_pair_without_second_occurrence_is_reported() {
        let sites = registry(vec![SiteConfig::weighted("pair", "Pair", 1).paired()]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 7));
        let config = AllocatorConfig::default();
        let mut allocator = ScheduleAllocator::new(&sites, &days, &config);
        let pair = sites.by_key("pair").unwrap().id;

        let mut sequence = vec![pair, pair, pair];
        allocator.main_allocation(&mut sequence);

        assert_eq!(allocator.schedule.slots(0), &[Some(pair), Some(pair)]);
        assert_eq!(allocator.schedule.slots(1), &[Some(pair), None]);
        assert!(allocator.warnings.contains(&AllocationWarning::PairIncomplete {
            site: "pair".to_string(),
            day: d(2025, 1, 7),
        }));
    }

    #[test]
    fn test_friday_only_site_never_leaves_fridays() {
        let sites = registry(vec![
            SiteConfig::weighted("a_friday", "Friday Only", 1).with_weekdays(&[4]),
            SiteConfig::weighted("b_any", "Any Day", 1),
        ]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 17));

        let allocation = allocate(&sites, &days);

        for (day, slots) in &allocation.schedule {
            if slots.iter().any(|s| s.as_deref() == Some("Friday Only")) {
                assert_eq!(day.weekday(), Weekday::Fri);
            }
        }
        assert_eq!(
            slot_names(&allocation, d(2025, 1, 6)),
            [Some("Any Day"), None]
        );
        assert!(allocation.unfilled_slots() > 0);
        assert!(allocation.unplaced.iter().all(|k| k == "a_friday"));
        assert!(allocation
            .warnings
            .contains(&AllocationWarning::Unplaced {
                site: "a_friday".to_string()
            }));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let sites = registry(quarter_sites());
        let days = weekdays(d(2025, 1, 1), d(2025, 3, 31));

        let first = allocate(&sites, &days);
        let second = allocate(&sites, &days);
        assert_eq!(first, second);

        // Input order does not matter either
        let mut reversed = quarter_sites();
        reversed.reverse();
        let sites = registry(reversed);
        assert_eq!(allocate(&sites, &days), first);
    }

    #[test]
    fn test_quarter_respects_day_constraints() {
        let sites = registry(quarter_sites());
        let days = weekdays(d(2025, 1, 1), d(2025, 3, 31));

        let allocation = allocate(&sites, &days);

        assert_eq!(allocation.schedule.len(), days.len());
        assert_eq!(allocation.quotas.values().sum::<u32>(), days.len() as u32 * 2);
        for (day, slots) in &allocation.schedule {
            let [Some(a), Some(b)] = slots else {
                continue;
            };
            let site_a = sites.by_name(a).unwrap();
            let site_b = sites.by_name(b).unwrap();
            if site_a.pair_same_day || site_b.pair_same_day {
                assert_eq!(a, b, "paired site shares {}", day);
            } else {
                assert_ne!(site_a.group_id, site_b.group_id, "group clash on {}", day);
            }
        }
        for (day, slots) in &allocation.schedule {
            for name in slots.iter().flatten() {
                assert!(sites.by_name(name).unwrap().is_available(*day));
            }
        }
    }

    #[test]
    fn test_quarter_friday_fairness() {
        let sites = registry(quarter_sites());
        let days = weekdays(d(2025, 1, 1), d(2025, 3, 31));

        let allocation = allocate(&sites, &days);

        for key in ["majorelle_a", "majorelle_b", "majorelle_c"] {
            let fridays = allocation.friday_counts[key];
            assert!((3..=5).contains(&fridays), "{} has {} Fridays", key, fridays);
        }
        assert!(!allocation
            .warnings
            .iter()
            .any(|w| matches!(w, AllocationWarning::FridayTargetMissed { .. })));
    }

    #[test]
    fn test_empty_inputs_give_empty_schedule() {
        let sites = registry(vec![SiteConfig::weighted("a", "A", 1)]);
        assert_eq!(allocate(&sites, &[]), Allocation::default());

        let sites = registry(vec![SiteConfig::weighted("a", "A", 0)]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 10));
        let allocation = allocate(&sites, &days);
        assert!(allocation.schedule.is_empty());
        assert!(allocation.quotas.is_empty());
    }

    #[test]
    fn test_exhausted_sequence_leaves_days_empty() {
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 1),
            SiteConfig::weighted("b", "B", 1),
        ]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 8));
        let config = AllocatorConfig::default();
        let mut allocator = ScheduleAllocator::new(&sites, &days, &config);

        let mut sequence = vec![0, 1];
        allocator.main_allocation(&mut sequence);

        assert_eq!(allocator.schedule.slots(0), &[Some(0), Some(1)]);
        assert_eq!(allocator.schedule.slots(1), &[None, None]);
        assert_eq!(allocator.schedule.slots(2), &[None, None]);
        assert!(allocator
            .warnings
            .contains(&AllocationWarning::SequenceExhausted { day: d(2025, 1, 7) }));
    }

    #[test]
    fn test_backfill_swaps_with_earlier_day() {
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 1),
            SiteConfig::weighted("b", "B", 1),
            SiteConfig::weighted("c", "C", 1),
        ]);
        let days = weekdays(d(2025, 1, 6), d(2025, 1, 7));
        let config = AllocatorConfig::default();
        let mut allocator = ScheduleAllocator::new(&sites, &days, &config);
        allocator.schedule.set_day(0, [Some(0), Some(1)]);
        allocator.schedule.set_day(1, [Some(0), None]);

        let mut sequence = vec![2];
        allocator.backfill(&mut sequence);

        assert!(sequence.is_empty());
        assert_eq!(allocator.schedule.slots(0), &[Some(0), Some(2)]);
        assert_eq!(allocator.schedule.slots(1), &[Some(0), Some(1)]);
        assert!(allocator.warnings.is_empty());
    }

    #[test]
    fn test_backfill_respects_friday_ceiling() {
        let sites = registry(vec![
            SiteConfig::weighted("clinique", "Clinique", 1),
            SiteConfig::weighted("hopital", "Hopital", 1),
            SiteConfig::weighted("majorelle_a", "Majorelle A", 1),
        ]);
        // Friday then Monday
        let days = vec![d(2025, 1, 10), d(2025, 1, 13)];
        let config = AllocatorConfig::default();
        let mut allocator = ScheduleAllocator::new(&sites, &days, &config);
        let majorelle = sites.by_key("majorelle_a").unwrap().id;
        for _ in 0..5 {
            allocator.fridays.increment_friday_count(majorelle);
        }
        allocator.schedule.set_day(0, [Some(0), Some(1)]);
        allocator.schedule.set_day(1, [Some(0), None]);

        let mut sequence = vec![majorelle];
        allocator.backfill(&mut sequence);

        assert_eq!(sequence, vec![majorelle]);
        assert_eq!(allocator.schedule.slots(1), &[Some(0), None]);
        assert_eq!(
            allocator.warnings,
            vec![AllocationWarning::Unplaced {
                site: "majorelle_a".to_string()
            }]
        );
    }

    #[test]
    fn test_rebalance_pulls_fridays_from_non_majorelle() {
        let sites = registry(vec![
            SiteConfig::weighted("clinique", "Clinique", 1),
            SiteConfig::weighted("hopital", "Hopital", 1),
            SiteConfig::weighted("majorelle_a", "Majorelle A", 1),
        ]);
        let clinique = sites.by_key("clinique").unwrap().id;
        let hopital = sites.by_key("hopital").unwrap().id;
        let majorelle = sites.by_key("majorelle_a").unwrap().id;
        let days = vec![
            d(2025, 1, 6),
            d(2025, 1, 10),
            d(2025, 1, 13),
            d(2025, 1, 17),
            d(2025, 1, 20),
            d(2025, 1, 24),
        ];
        let config = AllocatorConfig::default();
        let mut allocator = ScheduleAllocator::new(&sites, &days, &config);
        for idx in 0..days.len() {
            if allocator.schedule.is_friday(idx) {
                allocator
                    .schedule
                    .set_day(idx, [Some(clinique), Some(hopital)]);
            } else {
                allocator
                    .schedule
                    .set_day(idx, [Some(majorelle), Some(clinique)]);
            }
        }

        allocator.rebalance_majorelle_fridays();

        assert_eq!(allocator.schedule.friday_count(majorelle), 3);
        for idx in [1, 3, 5] {
            assert_eq!(
                allocator.schedule.slots(idx),
                &[Some(clinique), Some(majorelle)]
            );
        }
        for idx in [0, 2, 4] {
            assert_eq!(
                allocator.schedule.slots(idx),
                &[Some(hopital), Some(clinique)]
            );
        }
        assert!(allocator.warnings.is_empty());
    }

    #[test]
    fn test_rebalance_falls_back_to_majorelle_donor() {
        let sites = registry(vec![
            SiteConfig::weighted("clinique", "Clinique", 1),
            SiteConfig::weighted("majorelle_a", "Majorelle A", 1),
            SiteConfig::weighted("majorelle_b", "Majorelle B", 1),
        ]);
        let clinique = sites.by_key("clinique").unwrap().id;
        let receiver = sites.by_key("majorelle_a").unwrap().id;
        let donor = sites.by_key("majorelle_b").unwrap().id;
        let days = vec![
            d(2025, 1, 3),
            d(2025, 1, 6),
            d(2025, 1, 10),
            d(2025, 1, 13),
            d(2025, 1, 17),
            d(2025, 1, 20),
            d(2025, 1, 24),
        ];
        let config = AllocatorConfig::default();
        let mut allocator = ScheduleAllocator::new(&sites, &days, &config);
        for idx in 0..days.len() {
            if allocator.schedule.is_friday(idx) {
                allocator.schedule.set_day(idx, [Some(donor), Some(clinique)]);
            } else {
                allocator
                    .schedule
                    .set_day(idx, [Some(receiver), Some(clinique)]);
            }
        }

        allocator.rebalance_majorelle_fridays();

        // Clinique cannot land beside itself, so only majorelle_b gives way,
        // and only while it holds at least the target
        assert_eq!(allocator.schedule.slots(0), &[Some(receiver), Some(clinique)]);
        assert_eq!(allocator.schedule.slots(1), &[Some(donor), Some(clinique)]);
        assert_eq!(allocator.schedule.friday_count(receiver), 1);
        assert_eq!(allocator.schedule.friday_count(donor), 3);
        assert_eq!(
            allocator.warnings,
            vec![AllocationWarning::RebalanceFailed {
                site: "majorelle_a".to_string(),
                fridays: 1,
            }]
        );
    }
}
