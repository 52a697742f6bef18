//! The arena holding a document's outline.
//!
//! Nodes are stored in document order, which is the order the resolver walks them in, with an id
//! index on the side. Parent/child links are ids into the same arena, so the tree can be enriched
//! in place by each pipeline stage without any reference juggling.

use crate::error::StructuralError;
use crate::node::{NodeId, NodeRecord};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize)]
/// Forest of outline nodes keyed by id, kept in document order.
pub struct NodeTree {
    nodes: Vec<NodeRecord>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl NodeTree {
    /// Builds the arena from records already in document order.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::DuplicateId`] if two records share an id.
    pub fn from_records(nodes: Vec<NodeRecord>) -> Result<Self, StructuralError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id, position).is_some() {
                return Err(StructuralError::DuplicateId { id: node.id });
            }
        }
        Ok(Self { nodes, index })
    }

    #[must_use]
    /// Number of nodes, synthetic ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    /// Whether the outline has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    /// All nodes in document order.
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Iterates nodes in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeRecord> {
        self.nodes.iter()
    }

    #[must_use]
    /// Looks a node up by id.
    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.index.get(&id).map(|&position| &self.nodes[position])
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.index
            .get(&id)
            .copied()
            .map(move |position| &mut self.nodes[position])
    }

    #[must_use]
    /// Position of a node in document order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [NodeRecord] {
        &mut self.nodes
    }

    /// Inserts a node at a document-order position, shifting later nodes down.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::DuplicateId`] if the id is already taken.
    pub fn insert_at(&mut self, position: usize, node: NodeRecord) -> Result<(), StructuralError> {
        if self.index.contains_key(&node.id) {
            return Err(StructuralError::DuplicateId { id: node.id });
        }
        let position = position.min(self.nodes.len());
        self.nodes.insert(position, node);
        for (offset, shifted) in self.nodes[position..].iter().enumerate() {
            self.index.insert(shifted.id, position + offset);
        }
        Ok(())
    }

    #[must_use]
    /// An id not used by any node yet.
    pub fn next_free_id(&self) -> NodeId {
        next_free_id(&self.nodes)
    }

    #[must_use]
    /// Gives the nodes back in document order, dropping the index.
    pub fn into_records(self) -> Vec<NodeRecord> {
        self.nodes
    }

    /// Top-level nodes (those without a parent) in document order.
    pub fn roots(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(|n| n.parent_id.is_none())
    }

    #[must_use]
    /// Moves to the containing node in the outline.
    pub fn parent(&self, id: NodeId) -> Option<&NodeRecord> {
        self.get(id)?.parent_id.and_then(|parent| self.get(parent))
    }

    #[must_use]
    /// Directly nested nodes in document order.
    pub fn children(&self, id: NodeId) -> Vec<&NodeRecord> {
        self.get(id)
            .map(|node| {
                node.children_ids
                    .iter()
                    .filter_map(|&child| self.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    /// Descends to the first child node.
    pub fn first_child(&self, id: NodeId) -> Option<&NodeRecord> {
        self.get(id)?
            .children_ids
            .first()
            .and_then(|&child| self.get(child))
    }

    #[must_use]
    /// The node immediately after this one in document order.
    pub fn successor(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(self.position(id)? + 1)
    }

    #[must_use]
    /// The node immediately before this one in document order.
    pub fn predecessor(&self, id: NodeId) -> Option<&NodeRecord> {
        let position = self.position(id)?;
        position.checked_sub(1).and_then(|p| self.nodes.get(p))
    }

    #[must_use]
    /// Finds the next node at the same level under the same parent.
    pub fn next_sibling(&self, id: NodeId) -> Option<&NodeRecord> {
        let level = self.get(id)?.level;
        for node in &self.nodes[self.position(id)? + 1..] {
            if node.level == level {
                return Some(node);
            }
            // Stop once we've climbed out of the parent
            if node.level < level {
                break;
            }
        }
        None
    }

    /// Checks that every non-root node sits strictly deeper than its parent.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::LevelInvariant`] for the first offending pair.
    pub fn check_levels(&self) -> Result<(), StructuralError> {
        for node in &self.nodes {
            if let Some(parent) = node.parent_id.and_then(|p| self.get(p)) {
                if parent.level >= node.level {
                    return Err(StructuralError::LevelInvariant {
                        parent: parent.id,
                        parent_level: parent.level,
                        child: node.id,
                        child_level: node.level,
                    });
                }
            }
        }
        Ok(())
    }
}

/// One past the largest id among `nodes`.
pub(crate) fn next_free_id(nodes: &[NodeRecord]) -> NodeId {
    NodeId(
        nodes
            .iter()
            .map(|n| n.id.0)
            .max()
            .map_or(0, |max| max.saturating_add(1)),
    )
}

impl<'a> IntoIterator for &'a NodeTree {
    type Item = &'a NodeRecord;
    type IntoIter = std::slice::Iter<'a, NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
#[path = "tests/tree.rs"]
mod tests;
