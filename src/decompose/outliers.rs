//! Leaf-level outlier removal: each final node's unique sequences are
//! compared against its representative; anything too far is expelled.
//!
//! Grounded on the original `remove_outliers`, whose `maximum_variation_allowed
//! = int(round(average_read_length / 100)) or 1` threshold is computed once
//! in [`super::Decomposer::new`] and reused here (`max_variation_allowed`).

use std::collections::HashMap;
use std::collections::HashSet;

use crate::align::Alignment;
use crate::align::AlignmentSource;
use crate::align::AlignmentWriter;
use crate::entropy;
use crate::error::DecomposeError;
use crate::error::Result;
use crate::node::NodeId;
use crate::report::Reporter;

use super::Decomposer;
use super::Outlier;

pub(super) fn remove_outliers(decomposer: &mut Decomposer) -> Result<()> {
    let reporter = Reporter::phase("removing outliers");
    let final_ids: Vec<NodeId> = decomposer
        .topology
        .finals()
        .iter()
        .map(|n| n.node_id.clone())
        .collect();
    for (i, node_id) in final_ids.iter().enumerate() {
        reporter.update(format!("{node_id} ({} of {})", i + 1, final_ids.len()));
        remove_outliers_from_node(decomposer, node_id)?;
    }
    reporter.finish();
    Ok(())
}

fn remove_outliers_from_node(decomposer: &mut Decomposer, node_id: &str) -> Result<()> {
    let (alignment_path, representative, allowed) = {
        let node = decomposer.topology.get(node_id).expect("final node exists");
        (
            node.alignment_path.clone(),
            node.representative_seq.clone(),
            decomposer.max_variation_allowed,
        )
    };

    // Every comparison here is against the same fixed `representative`, so
    // classifying the leaf's unique sequences is independently parallelizable
    // (SPEC_FULL.md §5); results only accumulate into a `HashSet`.
    let unique_sequences: Vec<Vec<u8>> = Alignment::open(&alignment_path)?
        .unique_iter()?
        .map(|entry| entry.sequence)
        .collect();
    let outlier_sequences = classify_outliers(&unique_sequences, &representative, allowed);

    let filtered_path = alignment_path.with_extension("filtered.fa");
    let mut kept_ids: Vec<String> = Vec::new();
    let mut expelled: HashMap<Vec<u8>, Vec<String>> = HashMap::new();
    {
        let alignment = Alignment::open(&alignment_path)?;
        let mut writer = AlignmentWriter::create(&filtered_path)?;
        for read in alignment.iter()? {
            let read = read?;
            if outlier_sequences.contains(&read.sequence) {
                expelled.entry(read.sequence).or_default().push(read.id);
            } else {
                writer.append(&read.id, &read.sequence)?;
                kept_ids.push(read.id);
            }
        }
        writer.close()?;
    }

    if expelled.is_empty() {
        let _ = std::fs::remove_file(&filtered_path);
        return Ok(());
    }

    std::fs::rename(&filtered_path, &alignment_path).map_err(|e| DecomposeError::io(&alignment_path, e))?;
    for (sequence, ids) in expelled {
        decomposer.stats.num_outliers_after_refine_nodes += ids.len();
        decomposer
            .outliers
            .entry(sequence)
            .or_insert_with(|| Outlier {
                from: Some(node_id.to_string()),
                to: None,
                ids: Vec::new(),
            })
            .ids
            .extend(ids);
    }

    let node = decomposer.topology.get_mut(node_id).expect("final node exists");
    node.size = kept_ids.len();
    node.read_ids = kept_ids;
    Ok(())
}

/// Sequences whose mismatch count against `representative` exceeds `allowed`.
#[cfg(feature = "rayon")]
fn classify_outliers(sequences: &[Vec<u8>], representative: &[u8], allowed: usize) -> HashSet<Vec<u8>> {
    use rayon::prelude::*;
    sequences
        .par_iter()
        .filter(|seq| entropy::mismatch_count(seq, representative) > allowed)
        .cloned()
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn classify_outliers(sequences: &[Vec<u8>], representative: &[u8], allowed: usize) -> HashSet<Vec<u8>> {
    sequences
        .iter()
        .filter(|seq| entropy::mismatch_count(seq, representative) > allowed)
        .cloned()
        .collect()
}
