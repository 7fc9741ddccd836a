//! In-memory record of a subtree node; computes its own statistics.
//!
//! Field names track the original `Oligotyping.lib.decomposer.Node` class
//! directly (`representative_seq`, `competing_unique_sequences_ratio`,
//! `density`, ...) per spec.

use std::path::Path;
use std::path::PathBuf;

use crate::align::Alignment;
use crate::entropy;
use crate::error::Result;
use crate::unique;
use crate::Column;
use crate::Entropy;

pub type NodeId = String;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub level: usize,
    pub alignment_path: PathBuf,
    pub unique_alignment_path: PathBuf,
    pub read_ids: Vec<String>,
    pub unique_read_counts: Vec<u32>,
    pub representative_seq: Vec<u8>,
    pub size: usize,
    pub entropy: Vec<Entropy>,
    pub entropy_sorted: Vec<(Entropy, Column)>,
    pub average_entropy: Entropy,
    pub discriminants: Vec<Column>,
    pub competing_unique_sequences_ratio: f32,
    pub density: f32,
    pub killed: bool,
}

/// Minimum entropy value counted into `average_entropy` — see spec.md §3.
const AVERAGE_ENTROPY_FLOOR: Entropy = 0.05;

fn unique_path_for(alignment_path: &Path) -> PathBuf {
    let stem = alignment_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    alignment_path.with_file_name(format!("{stem}.unique.fa"))
}

impl Node {
    pub fn new(node_id: NodeId, parent: Option<NodeId>, level: usize, alignment_path: PathBuf) -> Self {
        let unique_alignment_path = unique_path_for(&alignment_path);
        Self {
            node_id,
            parent,
            children: Vec::new(),
            level,
            alignment_path,
            unique_alignment_path,
            read_ids: Vec::new(),
            unique_read_counts: Vec::new(),
            representative_seq: Vec::new(),
            size: 0,
            entropy: Vec::new(),
            entropy_sorted: Vec::new(),
            average_entropy: 0.0,
            discriminants: Vec::new(),
            competing_unique_sequences_ratio: 0.0,
            density: 0.0,
            killed: false,
        }
    }

    pub fn root(alignment_path: PathBuf) -> Self {
        Self::new("root".to_string(), None, 0, alignment_path)
    }

    /// Populates `read_ids`, `unique_read_counts`, `representative_seq`, `size`.
    pub fn do_unique(&mut self) -> Result<()> {
        let alignment = Alignment::open(&self.alignment_path)?;
        let uniqued = unique::uniquify(&alignment, &self.unique_alignment_path)?;
        self.read_ids = uniqued.read_ids;
        self.unique_read_counts = uniqued.unique_read_counts;
        self.representative_seq = uniqued.representative_seq;
        self.size = uniqued.size;
        Ok(())
    }

    /// Populates `entropy`, `entropy_sorted`, `average_entropy` from the
    /// uniqued alignment, weighting each unique sequence by its multiplicity.
    pub fn do_entropy(&mut self) -> Result<()> {
        let unique_alignment = Alignment::open(&self.unique_alignment_path)?;
        self.entropy = entropy::column_entropies(&unique_alignment, Some(&self.unique_read_counts))?;
        self.entropy_sorted = entropy::rank(&self.entropy);
        let qualifying: Vec<Entropy> = self
            .entropy
            .iter()
            .copied()
            .filter(|&e| e > AVERAGE_ENTROPY_FLOOR)
            .collect();
        self.average_entropy = if qualifying.is_empty() {
            0.0
        } else {
            qualifying.iter().sum::<Entropy>() / qualifying.len() as Entropy
        };
        Ok(())
    }

    /// Populates `competing_unique_sequences_ratio` (CUSR) and `density`.
    pub fn do_ratios(&mut self) {
        self.competing_unique_sequences_ratio = if self.unique_read_counts.len() > 1 {
            self.unique_read_counts[1] as f32 / self.unique_read_counts[0] as f32
        } else {
            0.0
        };
        self.density = self.unique_read_counts.first().copied().unwrap_or(0) as f32 / self.size.max(1) as f32;
    }

    /// `do_unique` -> `do_entropy` -> `do_ratios` over the current alignment file.
    pub fn refresh(&mut self) -> Result<()> {
        self.do_unique()?;
        self.do_entropy()?;
        self.do_ratios();
        Ok(())
    }

    pub fn is_final(&self) -> bool {
        !self.killed && self.children.is_empty()
    }
}
