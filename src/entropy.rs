//! Per-column Shannon entropy over an alignment.
//!
//! H(c) = -sum_b p_b * log2(p_b), with 0 * log 0 := 0, aggregated over the
//! fixed alphabet `{A,C,G,T,-}` (see [`crate::ALPHABET`]).

use crate::align::Alignment;
use crate::align::AlignmentSource;
use crate::error::Result;
use crate::Column;
use crate::Entropy;

#[derive(Debug, Clone, Copy, Default)]
struct ColumnCounts([u32; 5]);

impl ColumnCounts {
    fn index(byte: u8) -> usize {
        crate::ALPHABET
            .iter()
            .position(|&b| b == byte)
            .unwrap_or(4) // unknown bytes are coerced to '-' upstream already
    }

    fn increment(&mut self, byte: u8, weight: u32) {
        self.0[Self::index(byte)] += weight;
    }

    fn entropy(&self) -> Entropy {
        let total: u32 = self.0.iter().sum();
        if total == 0 {
            return 0.0;
        }
        self.0
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f32 / total as f32;
                -p * p.log2()
            })
            .sum()
    }
}

/// Per-column entropy of `alignment`.
///
/// When `weights` is `Some`, each row read from `alignment` (in iteration
/// order) is weighted by the corresponding entry instead of 1 — this is
/// the "uniqued" mode: callers pass the node's `unique_read_counts` when
/// `alignment` is the node's uniqued alignment file, recovering the
/// multiplicity each distinct sequence represents.
pub fn column_entropies(alignment: &Alignment, weights: Option<&[u32]>) -> Result<Vec<Entropy>> {
    let mut columns: Vec<ColumnCounts> = Vec::new();

    for (row, read) in alignment.iter()?.enumerate() {
        let read = read?;
        if columns.is_empty() {
            columns = vec![ColumnCounts::default(); read.sequence.len()];
        }
        let weight = weights.map(|w| w[row]).unwrap_or(1);
        for (counts, &byte) in columns.iter_mut().zip(read.sequence.iter()) {
            counts.increment(byte, weight);
        }
    }

    Ok(columns.iter().map(ColumnCounts::entropy).collect())
}

/// Pairs entropies with their column index and sorts descending by entropy.
pub fn rank(entropies: &[Entropy]) -> Vec<(Entropy, Column)> {
    let mut ranked: Vec<(Entropy, Column)> = entropies.iter().copied().zip(0..).collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).expect("entropy is never NaN"));
    ranked
}

/// Column indices where two equal-length sequences disagree — the
/// deterministic core of the original `quick_entropy`: a two-sequence
/// alignment's non-zero-entropy columns are exactly its mismatches.
pub fn mismatch_columns(a: &[u8], b: &[u8]) -> Vec<Column> {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .enumerate()
        .filter(|(_, (x, y))| x != y)
        .map(|(i, _)| i)
        .collect()
}

pub fn mismatch_count(a: &[u8], b: &[u8]) -> usize {
    mismatch_columns(a, b).len()
}
