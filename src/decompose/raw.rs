//! Raw topology construction: the breadth-first kill/finalize/split loop.
//!
//! Grounded on the original `generate_raw_topology` and on the teacher's
//! `mccfr/trainer.rs` explicit-queue growth loop (a `Vec`/`VecDeque` of work
//! items replacing recursion, so the tree can grow to depths the call stack
//! would not tolerate).

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::align::Alignment;
use crate::align::AlignmentSource;
use crate::align::AlignmentWriter;
use crate::error::Result;
use crate::node::Node;
use crate::node::NodeId;
use crate::report::Reporter;
use crate::unique;

use super::Decomposer;
use super::Outlier;

enum Outcome {
    Killed,
    Finalized,
    Split,
}

pub(super) fn generate_raw_topology(decomposer: &mut Decomposer) -> Result<()> {
    let reporter = Reporter::phase("raw topology");
    let mut queue: VecDeque<NodeId> = decomposer.topology.take_pending();
    decomposer.decomposition_depth = -1;

    loop {
        decomposer.decomposition_depth += 1;
        if queue.is_empty() {
            break;
        }
        let current: Vec<NodeId> = queue.drain(..).collect();
        for node_id in current {
            reporter.update(format!(
                "depth {}: node {node_id}",
                decomposer.decomposition_depth
            ));
            match process_node(decomposer, &node_id)? {
                Outcome::Split => {
                    let children = decomposer
                        .topology
                        .get(&node_id)
                        .expect("node processed above still exists")
                        .children
                        .clone();
                    queue.extend(children);
                }
                Outcome::Killed | Outcome::Finalized => {}
            }
        }
    }

    reporter.finish();
    Ok(())
}

fn process_node(decomposer: &mut Decomposer, node_id: &str) -> Result<Outcome> {
    decomposer
        .topology
        .get_mut(node_id)
        .expect("queued node exists")
        .do_unique()?;

    let most_abundant = decomposer.topology.get(node_id).expect("exists").unique_read_counts[0];
    if most_abundant < decomposer.config.min_substantive_abundance {
        kill(decomposer, node_id)?;
        return Ok(Outcome::Killed);
    }

    // Every surviving node gets its full statistics computed up front
    // (mirrors `Node::refresh`), so a node finalized on any rule below
    // still carries meaningful entropy/ratio fields into the output.
    decomposer.topology.get_mut(node_id).expect("exists").do_ratios();
    decomposer.topology.get_mut(node_id).expect("exists").do_entropy()?;

    if decomposer.topology.get(node_id).expect("exists").size <= decomposer.config.min_actual_abundance {
        return Ok(Outcome::Finalized);
    }

    {
        let node = decomposer.topology.get(node_id).expect("exists");
        if node.competing_unique_sequences_ratio < 0.025 || node.density > 0.85 {
            return Ok(Outcome::Finalized);
        }
    }

    let second_most_abundant = decomposer.topology.get(node_id).expect("exists").unique_read_counts[1];
    if second_most_abundant < decomposer.config.min_substantive_abundance {
        return Ok(Outcome::Finalized);
    }

    let discriminants: Vec<crate::Column> = {
        let node = decomposer.topology.get(node_id).expect("exists");
        node.entropy_sorted
            .iter()
            .take(decomposer.config.number_of_discriminants)
            .filter(|&&(entropy, _)| entropy > decomposer.config.min_entropy)
            .map(|&(_, column)| column)
            .collect()
    };
    if discriminants.is_empty() {
        return Ok(Outcome::Finalized);
    }
    decomposer.topology.get_mut(node_id).expect("exists").discriminants = discriminants;

    split(decomposer, node_id)?;
    Ok(Outcome::Split)
}

/// Records every distinct sequence under `node_id` as an outlier with no
/// source node (raw-topology kill, as opposed to later refinement), then
/// deletes the node's on-disk alignments and marks it dead.
fn kill(decomposer: &mut Decomposer, node_id: &str) -> Result<()> {
    let alignment_path;
    let unique_alignment_path;
    {
        let node = decomposer.topology.get(node_id).expect("exists");
        alignment_path = node.alignment_path.clone();
        unique_alignment_path = node.unique_alignment_path.clone();
    }

    let alignment = Alignment::open(&alignment_path)?;
    for entry in unique::collect(&alignment)? {
        decomposer
            .outliers
            .entry(entry.sequence)
            .or_insert_with(|| Outlier {
                from: None,
                to: None,
                ids: Vec::new(),
            })
            .ids
            .extend(entry.ids);
    }

    let _ = std::fs::remove_file(&alignment_path);
    let _ = std::fs::remove_file(&unique_alignment_path);
    decomposer.topology.get_mut(node_id).expect("exists").killed = true;
    Ok(())
}

/// Buckets `node_id`'s raw reads by the bases at its discriminant columns,
/// in first-seen order, writing one alignment file per distinct oligo.
fn split(decomposer: &mut Decomposer, node_id: &str) -> Result<()> {
    let (alignment_path, discriminants, level) = {
        let node = decomposer.topology.get(node_id).expect("exists");
        (node.alignment_path.clone(), node.discriminants.clone(), node.level)
    };
    let nodes_directory = decomposer.config.nodes_directory();

    let mut oligo_to_child: HashMap<Vec<u8>, NodeId> = HashMap::new();
    let mut children_order: Vec<NodeId> = Vec::new();
    let mut writers: HashMap<NodeId, AlignmentWriter> = HashMap::new();
    let mut read_ids: HashMap<NodeId, Vec<String>> = HashMap::new();

    let alignment = Alignment::open(&alignment_path)?;
    for read in alignment.iter()? {
        let read = read?;
        let oligo: Vec<u8> = discriminants.iter().map(|&c| read.sequence[c]).collect();
        let child_id = match oligo_to_child.get(&oligo) {
            Some(id) => id.clone(),
            None => {
                let id = decomposer.topology.mint_id();
                let path = nodes_directory.join(format!("{id}.fa"));
                writers.insert(id.clone(), AlignmentWriter::create(&path)?);
                read_ids.insert(id.clone(), Vec::new());
                oligo_to_child.insert(oligo, id.clone());
                children_order.push(id.clone());
                id
            }
        };
        writers
            .get_mut(&child_id)
            .expect("writer created above")
            .append(&read.id, &read.sequence)?;
        read_ids.get_mut(&child_id).expect("list created above").push(read.id);
    }

    for (_, writer) in writers {
        writer.close()?;
    }

    for child_id in &children_order {
        let path = nodes_directory.join(format!("{child_id}.fa"));
        let mut child = Node::new(child_id.clone(), Some(node_id.to_string()), level + 1, path);
        child.read_ids = read_ids.remove(child_id).expect("ids recorded above");
        child.size = child.read_ids.len();
        decomposer.topology.insert(child);
    }
    decomposer.topology.get_mut(node_id).expect("exists").children = children_order;
    Ok(())
}
