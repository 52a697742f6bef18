//! Parent/child links from a flat level sequence.
//!
//! Nodes arrive in document order with only a nesting level. A single pass with a stack of open
//! ancestors links each node to the nearest preceding node that is shallower than it; equal levels
//! become siblings. An outline that does not start at level 0 gets an implicit synthetic root so
//! that every tree has a level-0 node to hang from.

use crate::error::StructuralError;
use crate::node::{Hints, NodeId, NodeRecord};
use crate::tree::{next_free_id, NodeTree};

/// Default title of the implicit root.
pub const DEFAULT_ROOT_TITLE: &str = "Document";

/// Links `records` into a tree, inserting an implicit root when the first node is not level 0.
///
/// # Errors
///
/// Returns [`StructuralError::EmptyIndex`] for no records, [`StructuralError::DuplicateId`] for
/// repeated ids, and [`StructuralError::LevelInvariant`] if linking produced an invalid tree.
pub fn build(mut records: Vec<NodeRecord>, root_title: &str) -> Result<NodeTree, StructuralError> {
    let first = records.first().ok_or(StructuralError::EmptyIndex)?;
    if first.level != 0 {
        let id = next_free_id(&records);
        log::debug!(
            "first heading {:?} is at level {}, adding implicit root {id}",
            first.title,
            first.level
        );
        records.insert(
            0,
            NodeRecord::synthetic(id, root_title, 0, Hints::default()),
        );
    }
    link(&mut records);
    let tree = NodeTree::from_records(records)?;
    tree.check_levels()?;
    Ok(tree)
}

/// Recomputes parent and children of every node from levels alone.
pub fn link(records: &mut [NodeRecord]) {
    let mut open: Vec<usize> = Vec::new();
    for index in 0..records.len() {
        records[index].parent_id = None;
        records[index].children_ids.clear();
        let level = records[index].level;
        while open.last().is_some_and(|&top| records[top].level >= level) {
            open.pop();
        }
        if let Some(&parent) = open.last() {
            let child = records[index].id;
            records[index].parent_id = Some(records[parent].id);
            records[parent].children_ids.push(child);
        }
        open.push(index);
    }
}

#[must_use]
/// Logs children lists that disagree with the rebuilt hierarchy, returning how many did.
pub fn cross_check(tree: &NodeTree, claimed: &[(NodeId, Vec<NodeId>)]) -> usize {
    let mut mismatches = 0;
    for (id, children) in claimed {
        let Some(node) = tree.get(*id) else { continue };
        let actual: Vec<NodeId> = node
            .children_ids
            .iter()
            .copied()
            .filter(|&child| tree.get(child).is_some_and(|c| !c.is_synthetic))
            .collect();
        if actual != *children {
            log::debug!("node {id}: index claims children {children:?}, levels give {actual:?}");
            mismatches += 1;
        }
    }
    mismatches
}

#[cfg(test)]
#[path = "tests/hierarchy.rs"]
mod tests;
