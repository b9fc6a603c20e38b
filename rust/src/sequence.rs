//! Allocation sequence built with Smooth Weighted Round Robin (SWRR).
//!
//! Every round each site with slots left gains its quota as score, the
//! highest score is emitted and pays back the quota total. Sites come out
//! interleaved in proportion to their quotas instead of in bursts.

use crate::interner::SiteId;
use crate::quota::QuotaMap;

/// Expand quotas into an ordered work queue of site ids.
///
/// The result holds each site exactly `quota` times. Ties on score go to the
/// smallest site id (smallest key), so the output is fully deterministic.
pub fn generate_sequence(quotas: &QuotaMap) -> Vec<SiteId> {
    let total: u32 = quotas.values().sum();
    let total_weight = total as i64;

    let mut current: Vec<(SiteId, i64)> = quotas.keys().map(|&id| (id, 0)).collect();
    let mut remaining: Vec<u32> = quotas.values().copied().collect();
    let weights: Vec<i64> = quotas.values().map(|&q| q as i64).collect();

    let mut sequence: Vec<SiteId> = Vec::with_capacity(total as usize);

    while sequence.len() < total as usize {
        let mut best: Option<usize> = None;
        for idx in 0..current.len() {
            if remaining[idx] == 0 {
                continue;
            }
            current[idx].1 += weights[idx];
            // Keys iterate ascending, so strict > keeps the smallest key on ties
            match best {
                Some(b) if current[b].1 >= current[idx].1 => {}
                _ => best = Some(idx),
            }
        }

        let Some(best) = best else {
            break;
        };
        current[best].1 -= total_weight;
        remaining[best] -= 1;
        sequence.push(current[best].0);
    }

    sequence
}
