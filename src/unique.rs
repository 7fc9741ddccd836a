//! Collapse identical sequences, count duplicates, pick a representative.
//!
//! Hashing operates on raw sequence bytes, not decoded strings (Design
//! Notes: sequences are ASCII and fixed length, so a `Vec<u8>` key is both
//! cheaper and the more honest representation of what's being compared).

use std::collections::HashMap;
use std::path::Path;

use crate::align::Alignment;
use crate::align::AlignmentSource;
use crate::align::AlignmentWriter;
use crate::error::Result;

/// One distinct sequence and every read id that shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueEntry {
    pub sequence: Vec<u8>,
    pub ids: Vec<String>,
}

impl UniqueEntry {
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

/// Descending-multiplicity unique sequences, ties broken by first-seen order.
pub fn collect(alignment: &Alignment) -> Result<Vec<UniqueEntry>> {
    let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut entries: Vec<UniqueEntry> = Vec::new();

    for read in alignment.iter()? {
        let read = read?;
        match index.get(&read.sequence) {
            Some(&i) => entries[i].ids.push(read.id),
            None => {
                index.insert(read.sequence.clone(), entries.len());
                entries.push(UniqueEntry {
                    sequence: read.sequence,
                    ids: vec![read.id],
                });
            }
        }
    }

    // stable_sort_by preserves first-seen order among equal counts.
    entries.sort_by(|a, b| b.count().cmp(&a.count()));
    Ok(entries)
}

/// Writes the uniqued form of an alignment: one record per distinct
/// sequence (tagged with its first-seen id), in descending-multiplicity
/// order. Returns the parallel multiplicity vector so callers (the entropy
/// engine, in particular) can weight each record without re-parsing ids.
pub fn write_unique(path: &Path, entries: &[UniqueEntry]) -> Result<Vec<u32>> {
    let mut writer = AlignmentWriter::create(path)?;
    let mut counts = Vec::with_capacity(entries.len());
    for entry in entries {
        writer.append(&entry.ids[0], &entry.sequence)?;
        counts.push(entry.count() as u32);
    }
    writer.close()?;
    Ok(counts)
}

/// Output of uniquing a node's alignment: everything [`crate::node::Node::do_unique`] needs.
pub struct Uniqued {
    pub read_ids: Vec<String>,
    pub unique_read_counts: Vec<u32>,
    pub representative_seq: Vec<u8>,
    pub size: usize,
}

/// Runs [`collect`], writes the uniqued alignment to `unique_path`, and
/// flattens the per-entry id lists back into a single `read_ids` sequence
/// (in the order entries were emitted, i.e. descending multiplicity).
pub fn uniquify(alignment: &Alignment, unique_path: &Path) -> Result<Uniqued> {
    let entries = collect(alignment)?;
    let unique_read_counts = write_unique(unique_path, &entries)?;
    let representative_seq = entries
        .first()
        .map(|e| e.sequence.clone())
        .unwrap_or_default();
    let size = entries.iter().map(UniqueEntry::count).sum();
    let read_ids = entries.into_iter().flat_map(|e| e.ids).collect();
    Ok(Uniqued {
        read_ids,
        unique_read_counts,
        representative_seq,
        size,
    })
}

/// Unique-mode iteration over a raw alignment, yielded in descending
/// multiplicity order (the [`crate::align::AlignmentSource`] "unique mode" contract).
pub struct UniqueIter {
    entries: std::vec::IntoIter<UniqueEntry>,
}

impl UniqueIter {
    pub fn scan(alignment: &Alignment) -> Result<Self> {
        Ok(Self {
            entries: collect(alignment)?.into_iter(),
        })
    }
}

impl Iterator for UniqueIter {
    type Item = UniqueEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}
