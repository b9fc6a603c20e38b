//! Radiologist assignment for `advanced_split` sites.
//!
//! Once the site-level schedule is final, every slot held by a site with a
//! people list is labelled with one of its radiologists. Each person gets an
//! even share of the site's slots and is only picked on days they work.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::interner::SiteId;
use crate::models::DayAssignment;
use crate::sites::{Site, SiteRegistry};

/// Label for a slot nobody could take.
const UNSTAFFED: &str = "??";

/// Per-site share tracker.
struct PersonBalancer<'a> {
    site: &'a Site,
    targets: Vec<u32>,
    assigned: Vec<u32>,
}

impl<'a> PersonBalancer<'a> {
    /// Split `total` slots over the site's people; the first `total % n`
    /// people (list order) get one more.
    fn new(site: &'a Site, total: u32) -> Self {
        let n = site.people.len() as u32;
        let base = total / n;
        let extra = (total % n) as usize;
        let targets = (0..site.people.len())
            .map(|i| base + u32::from(i < extra))
            .collect();
        Self {
            site,
            targets,
            assigned: vec![0; site.people.len()],
        }
    }

    /// Available person under target with the fewest slots so far.
    fn choose(&mut self, day: NaiveDate) -> Option<&'a str> {
        let site = self.site;
        let idx = site
            .people
            .iter()
            .enumerate()
            .filter(|&(i, person)| person.is_available(day) && self.assigned[i] < self.targets[i])
            // min_by_key keeps the first on ties, so list order wins
            .min_by_key(|&(i, _)| self.assigned[i])
            .map(|(i, _)| i)?;
        self.assigned[idx] += 1;
        Some(site.people[idx].name.as_str())
    }
}

/// Replace site names with `"{site} - {person}"` labels.
///
/// Slots of sites without `advanced_split` (or with no people) keep the
/// plain site name. A slot no one can cover becomes `"{site} - ??"`.
pub fn assign_people(
    schedule: &BTreeMap<NaiveDate, DayAssignment>,
    sites: &SiteRegistry,
) -> BTreeMap<NaiveDate, DayAssignment> {
    let mut placed: FxHashMap<SiteId, u32> = FxHashMap::default();
    for name in schedule.values().flat_map(|slots| slots.iter().flatten()) {
        if let Some(site) = sites.by_name(name) {
            if site.advanced_split && !site.people.is_empty() {
                *placed.entry(site.id).or_insert(0) += 1;
            }
        }
    }

    let mut balancers: FxHashMap<SiteId, PersonBalancer> = placed
        .iter()
        .map(|(&id, &total)| (id, PersonBalancer::new(sites.get(id), total)))
        .collect();

    schedule
        .iter()
        .map(|(&day, slots)| {
            let labelled = slots.clone().map(|slot| {
                let name = slot?;
                let Some(balancer) = sites
                    .by_name(&name)
                    .and_then(|site| balancers.get_mut(&site.id))
                else {
                    return Some(name);
                };
                let person = balancer.choose(day).unwrap_or(UNSTAFFED);
                Some(format!("{} - {}", name, person))
            });
            (day, labelled)
        })
        .collect()
}
