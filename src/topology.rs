//! Tree of nodes keyed by node-id, plus the growth queue.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::node::Node;
use crate::node::NodeId;

/// `node_id -> Node` plus bookkeeping for deterministic id minting and
/// queue-driven growth. Modeled as a flat map rather than owned
/// parent/child references (Design Notes §9): this sidesteps ownership
/// cycles entirely and makes serialization trivial.
#[derive(Debug, Default)]
pub struct Topology {
    nodes: HashMap<NodeId, Node>,
    pending: VecDeque<NodeId>,
    next_id: u64,
}

impl Topology {
    pub fn new(root: Node) -> Self {
        let mut nodes = HashMap::new();
        let root_id = root.node_id.clone();
        nodes.insert(root_id.clone(), root);
        Self {
            nodes,
            pending: VecDeque::from([root_id]),
            next_id: 1,
        }
    }

    pub fn insert(&mut self, node: Node) {
        self.nodes.insert(node.node_id.clone(), node);
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `format!("{:012}", counter)`, counter increments after each mint.
    pub fn mint_id(&mut self) -> NodeId {
        let id = format!("{:012}", self.next_id);
        self.next_id += 1;
        id
    }

    pub fn pending(&self) -> &VecDeque<NodeId> {
        &self.pending
    }

    pub fn take_pending(&mut self) -> VecDeque<NodeId> {
        std::mem::take(&mut self.pending)
    }

    pub fn set_pending(&mut self, pending: VecDeque<NodeId>) {
        self.pending = pending;
    }

    pub fn enqueue(&mut self, id: NodeId) {
        self.pending.push_back(id);
    }

    /// Nodes not killed, in a deterministic (sorted by id) order.
    pub fn alive(&self) -> Vec<&Node> {
        let mut alive: Vec<&Node> = self.nodes.values().filter(|n| !n.killed).collect();
        alive.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        alive
    }

    /// Alive leaves — the nodes this decomposition will be judged on.
    pub fn finals(&self) -> Vec<&Node> {
        self.alive().into_iter().filter(|n| n.children.is_empty()).collect()
    }

    pub fn finals_mut(&mut self) -> Vec<&mut Node> {
        let mut finals: Vec<&mut Node> = self
            .nodes
            .values_mut()
            .filter(|n| n.is_final())
            .collect();
        finals.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        finals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn mint_id_is_monotonic_and_zero_padded() {
        let mut topology = Topology::new(Node::root(PathBuf::from("root.fa")));
        assert_eq!(topology.mint_id(), "000000000001");
        assert_eq!(topology.mint_id(), "000000000002");
    }

    #[test]
    fn tree_integrity_parent_contains_child() {
        let mut topology = Topology::new(Node::root(PathBuf::from("root.fa")));
        let child_id = topology.mint_id();
        let mut child = Node::new(child_id.clone(), Some("root".to_string()), 1, PathBuf::from("c.fa"));
        child.size = 1;
        topology.get_mut("root").unwrap().children.push(child_id.clone());
        topology.insert(child);

        let root = topology.get("root").unwrap();
        assert!(root.children.contains(&child_id));
        let child = topology.get(&child_id).unwrap();
        assert_eq!(child.level, topology.get("root").unwrap().level + 1);
    }
}
