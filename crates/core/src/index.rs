use crate::error::ConfigError;
use crate::signature::{Direction, SignatureSet};
use crate::types::Point;

pub type NodeId = usize;

pub const ROOT: NodeId = 0;

/// Recorded on the node where a signature's color path ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    /// Position of the signature in the index's name table.
    pub slot: usize,
    pub direction: Direction,
    pub offset: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    /// Sorted by packed color.
    children: Vec<(u32, NodeId)>,
    terminals: Vec<Terminal>,
}

/// Prefix tree over packed colors, stored as an arena. Built once per
/// signature set and only read afterwards, so it can be shared between
/// threads without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureIndex {
    nodes: Vec<Node>,
    names: Vec<String>,
    slot_directions: Vec<Direction>,
    directions: Vec<Direction>,
}

impl SignatureIndex {
    pub fn build(set: &SignatureSet) -> Result<Self, ConfigError> {
        let mut index = SignatureIndex {
            nodes: vec![Node::default()],
            names: Vec::new(),
            slot_directions: Vec::new(),
            directions: Vec::new(),
        };

        for (name, seq) in set.iter() {
            if seq.colors().is_empty() {
                return Err(ConfigError::EmptySequence(name.to_string()));
            }

            let mut node = ROOT;
            for color in seq.colors() {
                node = index.child_or_insert(node, color.packed());
            }

            let slot = index.names.len();
            index.names.push(name.to_string());
            index.slot_directions.push(seq.direction());
            index.nodes[node].terminals.push(Terminal { slot, direction: seq.direction(), offset: seq.offset() });
            if !index.directions.contains(&seq.direction()) {
                index.directions.push(seq.direction());
            }
        }

        index.directions.sort();
        Ok(index)
    }

    fn child_or_insert(&mut self, parent: NodeId, key: u32) -> NodeId {
        match self.nodes[parent].children.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(pos) => self.nodes[parent].children[pos].1,
            Err(pos) => {
                let id = self.nodes.len();
                self.nodes.push(Node::default());
                self.nodes[parent].children.insert(pos, (key, id));
                id
            }
        }
    }

    pub fn child(&self, node: NodeId, key: u32) -> Option<NodeId> {
        let children = &self.nodes.get(node)?.children;
        children
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|pos| children[pos].1)
    }

    pub fn terminals(&self, node: NodeId) -> &[Terminal] {
        self.nodes.get(node).map_or(&[], |n| n.terminals.as_slice())
    }

    pub fn name(&self, slot: usize) -> &str {
        &self.names[slot]
    }

    pub fn direction_of(&self, slot: usize) -> Direction {
        self.slot_directions[slot]
    }

    /// Number of signatures indexed.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Directions used by at least one signature, in a fixed order.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }
}
