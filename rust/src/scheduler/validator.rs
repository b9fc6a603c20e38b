//! Same-day constraints: availability, pairing and prefix-group exclusion.

use chrono::NaiveDate;

use crate::interner::SiteId;
use crate::sites::SiteRegistry;

use super::state::DaySlots;

/// Pure predicates over sites and day slots.
#[derive(Clone, Copy)]
pub struct ConstraintValidator<'a> {
    sites: &'a SiteRegistry,
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(sites: &'a SiteRegistry) -> Self {
        Self { sites }
    }

    #[inline]
    pub fn is_available(&self, site: SiteId, day: NaiveDate) -> bool {
        self.sites.get(site).is_available(day)
    }

    #[inline]
    pub fn is_paired(&self, site: SiteId) -> bool {
        self.sites.get(site).pair_same_day
    }

    /// Whether `second` may share a day with `first`.
    ///
    /// A paired first site only accepts itself. Otherwise the second site must
    /// be a different, unpaired site outside the first one's prefix group.
    pub fn validate_second_site(&self, first: Option<SiteId>, second: Option<SiteId>) -> bool {
        let (Some(first), Some(second)) = (first, second) else {
            return false;
        };

        if self.is_paired(first) {
            return second == first;
        }
        if second == first || self.same_group(first, second) {
            return false;
        }
        !self.is_paired(second)
    }

    /// Whether exchanging two slots keeps both days valid.
    ///
    /// `displaced` moves into `day_a[slot_a]` and must fit beside the other
    /// slot of `day_a`; `candidate` moves into `day_b[slot_b]` and must fit
    /// beside the other slot of `day_b`.
    pub fn validate_swap(
        &self,
        candidate: SiteId,
        displaced: SiteId,
        day_a: &DaySlots,
        day_b: &DaySlots,
        slot_a: usize,
        slot_b: usize,
    ) -> bool {
        let beside_a = day_a[1 - slot_a];
        if !self.fits_beside(displaced, beside_a, true) {
            return false;
        }
        let beside_b = day_b[1 - slot_b];
        self.fits_beside(candidate, beside_b, false)
    }

    /// Whether `site` can take a slot whose neighbour is `other`.
    ///
    /// A paired site needs itself as neighbour; `allow_half_pair` also lets
    /// it sit next to an empty slot. An unpaired site rejects itself, its
    /// prefix group and any paired neighbour.
    fn fits_beside(&self, site: SiteId, other: Option<SiteId>, allow_half_pair: bool) -> bool {
        if self.is_paired(site) {
            return match other {
                Some(other) => other == site,
                None => allow_half_pair,
            };
        }
        match other {
            None => true,
            Some(other) => {
                other != site && !self.same_group(site, other) && !self.is_paired(other)
            }
        }
    }

    #[inline]
    fn same_group(&self, a: SiteId, b: SiteId) -> bool {
        self.sites.get(a).group_id == self.sites.get(b).group_id
    }
}
