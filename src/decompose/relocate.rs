//! Outlier relocation: suggest, for each expelled sequence, the final node
//! whose representative it is closest to — recorded, never physically
//! re-homed (Design Notes §9, Open Question 1).

use crate::entropy;
use crate::error::Result;
use crate::node::NodeId;
use crate::report::Reporter;

use super::Decomposer;

/// Candidate final node: id, representative sequence, and size (the
/// relocation tie-breaker, per spec.md §4.F: smallest mismatch, then
/// larger size, then smaller node_id).
struct Candidate {
    id: NodeId,
    representative: Vec<u8>,
    size: usize,
}

pub(super) fn relocate_outliers(decomposer: &mut Decomposer) -> Result<()> {
    let reporter = Reporter::phase("relocating outliers");
    let candidates: Vec<Candidate> = decomposer
        .topology
        .finals()
        .iter()
        .map(|n| Candidate {
            id: n.node_id.clone(),
            representative: n.representative_seq.clone(),
            size: n.size,
        })
        .collect();
    let allowed = decomposer.max_variation_allowed;

    let sequences: Vec<Vec<u8>> = decomposer.outliers.keys().cloned().collect();
    let mut relocated = 0usize;
    for sequence in sequences {
        let from = decomposer.outliers.get(&sequence).and_then(|o| o.from.clone());
        let chosen = closest(&sequence, &candidates);

        if let Some((chosen_id, distance)) = chosen {
            if Some(chosen_id.clone()) != from && distance <= allowed {
                decomposer
                    .outliers
                    .get_mut(&sequence)
                    .expect("just looked up")
                    .to = Some(chosen_id);
                relocated += 1;
            }
        }
    }
    decomposer.stats.num_relocated = relocated;
    reporter.finish();
    Ok(())
}

/// The candidate with smallest mismatch to `sequence`; ties broken by
/// larger node size, then smaller node_id.
fn closest(sequence: &[u8], candidates: &[Candidate]) -> Option<(NodeId, usize)> {
    let mut best: Option<(&Candidate, usize)> = None;
    for candidate in candidates {
        let distance = entropy::mismatch_count(sequence, &candidate.representative);
        let better = match best {
            None => true,
            Some((best_candidate, best_distance)) => {
                distance < best_distance
                    || (distance == best_distance && candidate.size > best_candidate.size)
                    || (distance == best_distance
                        && candidate.size == best_candidate.size
                        && candidate.id < best_candidate.id)
            }
        };
        if better {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, distance)| (candidate.id.clone(), distance))
}
