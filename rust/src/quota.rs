//! Slot quotas per site.
//!
//! Quotas come from a largest-remainder (Hamilton) apportionment of the
//! period's slots over the sites' staffing weights, then get nudged so that
//! every paired site owns an even number of slots.

use std::collections::BTreeMap;

use crate::config::AllocatorConfig;
use crate::interner::SiteId;
use crate::sites::SiteRegistry;

/// Site id -> number of slots owed over the period.
pub type QuotaMap = BTreeMap<SiteId, u32>;

/// Apportion `total_slots` over the sites by weight.
///
/// Remainders are compared exactly (as `weight * total_slots mod total_weight`)
/// and ties go to the smallest key. Returns an empty map when the total
/// weight is zero.
pub fn calculate_quotas(sites: &SiteRegistry, total_slots: u32) -> QuotaMap {
    let total_weight = sites.total_weight();
    if total_weight == 0 {
        return QuotaMap::new();
    }

    let slots = total_slots as u64;
    let mut quotas = QuotaMap::new();
    let mut remainders: Vec<(u64, SiteId)> = Vec::with_capacity(sites.len());

    for site in sites.iter() {
        let numerator = site.weight * slots;
        quotas.insert(site.id, (numerator / total_weight) as u32);
        remainders.push((numerator % total_weight, site.id));
    }

    let assigned: u32 = quotas.values().sum();
    let remainder = total_slots.saturating_sub(assigned) as usize;

    // Descending fractional part, then ascending key
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, id) in remainders.iter().take(remainder) {
        if let Some(quota) = quotas.get_mut(&id) {
            *quota += 1;
        }
    }

    quotas
}

/// Make paired quotas even, then trim the surplus from unpaired sites.
///
/// Trimming walks the unpaired, non-reserved sites round-robin and takes one
/// slot from any of them still above one. It gives up after
/// `pairing_retry_factor` rounds; the second element of the return value is
/// the surplus that could not be removed.
pub fn adjust_for_paired_sites(
    quotas: &QuotaMap,
    sites: &SiteRegistry,
    total_slots: u32,
    config: &AllocatorConfig,
) -> (QuotaMap, u32) {
    let mut adjusted = quotas.clone();

    for site in sites.iter().filter(|s| s.pair_same_day) {
        if let Some(quota) = adjusted.get_mut(&site.id) {
            if *quota % 2 == 1 {
                *quota += 1;
            }
        }
    }

    let sum: u32 = adjusted.values().sum();
    let mut surplus = sum.saturating_sub(total_slots);

    let candidates: Vec<SiteId> = sites
        .iter()
        .filter(|s| !s.pair_same_day && !config.is_reserved_key(&s.key))
        .map(|s| s.id)
        .filter(|id| adjusted.contains_key(id))
        .collect();

    let max_attempts = candidates.len() * config.pairing_retry_factor;
    let mut attempt = 0;
    while surplus > 0 && !candidates.is_empty() && attempt < max_attempts {
        let id = candidates[attempt % candidates.len()];
        if let Some(quota) = adjusted.get_mut(&id) {
            if *quota > 1 {
                *quota -= 1;
                surplus -= 1;
            }
        }
        attempt += 1;
    }

    (adjusted, surplus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteConfig;

    fn registry(configs: Vec<SiteConfig>) -> SiteRegistry {
        SiteRegistry::new(configs, &AllocatorConfig::default()).unwrap()
    }

    fn quota_of(sites: &SiteRegistry, quotas: &QuotaMap, key: &str) -> u32 {
        quotas[&sites.by_key(key).unwrap().id]
    }

    #[test]
    fn test_even_split() {
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 1),
            SiteConfig::weighted("b", "B", 1),
        ]);
        let quotas = calculate_quotas(&sites, 20);
        assert_eq!(quota_of(&sites, &quotas, "a"), 10);
        assert_eq!(quota_of(&sites, &quotas, "b"), 10);
    }

    #[test]
    fn test_largest_remainder_with_key_tiebreak() {
        // 10 slots over 1:1:1 -> 3.33 each, one extra unit goes to the smallest key
        let sites = registry(vec![
            SiteConfig::weighted("c", "C", 1),
            SiteConfig::weighted("a", "A", 1),
            SiteConfig::weighted("b", "B", 1),
        ]);
        let quotas = calculate_quotas(&sites, 10);
        assert_eq!(quota_of(&sites, &quotas, "a"), 4);
        assert_eq!(quota_of(&sites, &quotas, "b"), 3);
        assert_eq!(quota_of(&sites, &quotas, "c"), 3);
        assert_eq!(quotas.values().sum::<u32>(), 10);
    }

    #[test]
    fn test_largest_fraction_wins() {
        // 10 slots over 1:2 -> 3.33 / 6.67, the extra unit goes to b
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 1),
            SiteConfig::weighted("b", "B", 2),
        ]);
        let quotas = calculate_quotas(&sites, 10);
        assert_eq!(quota_of(&sites, &quotas, "a"), 3);
        assert_eq!(quota_of(&sites, &quotas, "b"), 7);
    }

    #[test]
    fn test_zero_weight_gives_empty_map() {
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 0),
            SiteConfig::weighted("b", "B", -2),
        ]);
        assert!(calculate_quotas(&sites, 20).is_empty());
    }

    #[test]
    fn test_zero_weight_site_gets_nothing() {
        let sites = registry(vec![
            SiteConfig::weighted("a", "A", 0),
            SiteConfig::weighted("b", "B", 3),
        ]);
        let quotas = calculate_quotas(&sites, 12);
        assert_eq!(quota_of(&sites, &quotas, "a"), 0);
        assert_eq!(quota_of(&sites, &quotas, "b"), 12);
    }

    #[test]
    fn test_paired_odd_quota_rounded_up() {
        let sites = registry(vec![
            SiteConfig::weighted("pair", "Pair", 7).paired(),
            SiteConfig::weighted("solo", "Solo", 13),
        ]);
        let quotas = calculate_quotas(&sites, 20);
        assert_eq!(quota_of(&sites, &quotas, "pair"), 7);

        let (adjusted, residual) =
            adjust_for_paired_sites(&quotas, &sites, 20, &AllocatorConfig::default());
        assert_eq!(residual, 0);
        assert_eq!(quota_of(&sites, &adjusted, "pair"), 8);
        assert_eq!(quota_of(&sites, &adjusted, "solo"), 12);
        assert_eq!(adjusted.values().sum::<u32>(), 20);
    }

    #[test]
    fn test_reserved_sites_never_trimmed() {
        let sites = registry(vec![
            SiteConfig::weighted("majorelle_a", "Majorelle A", 10),
            SiteConfig::weighted("pair", "Pair", 7).paired(),
            SiteConfig::weighted("solo", "Solo", 3),
        ]);
        let quotas = calculate_quotas(&sites, 20);
        let (adjusted, residual) =
            adjust_for_paired_sites(&quotas, &sites, 20, &AllocatorConfig::default());
        assert_eq!(residual, 0);
        assert_eq!(
            quota_of(&sites, &adjusted, "majorelle_a"),
            quota_of(&sites, &quotas, "majorelle_a")
        );
        assert_eq!(quota_of(&sites, &adjusted, "pair") % 2, 0);
        assert_eq!(adjusted.values().sum::<u32>(), 20);
    }

    #[test]
    fn test_residual_reported_when_nothing_to_trim() {
        // Only paired sites: the surplus has nowhere to go
        let sites = registry(vec![
            SiteConfig::weighted("p1", "P1", 1).paired(),
            SiteConfig::weighted("p2", "P2", 1).paired(),
        ]);
        let quotas = calculate_quotas(&sites, 6);
        let (adjusted, residual) =
            adjust_for_paired_sites(&quotas, &sites, 6, &AllocatorConfig::default());
        assert_eq!(quota_of(&sites, &adjusted, "p1"), 4);
        assert_eq!(quota_of(&sites, &adjusted, "p2"), 4);
        assert_eq!(residual, 2);
    }
}
