use super::NodeTree;
use crate::error::StructuralError;
use crate::hierarchy::link;
use crate::node::{Hints, NodeId, NodeRecord};

fn outline(levels: &[usize]) -> NodeTree {
    let mut records: Vec<NodeRecord> = levels
        .iter()
        .enumerate()
        .map(|(i, &level)| {
            let id = u32::try_from(i).unwrap() + 1;
            NodeRecord::new(NodeId(id), format!("Node {id}"), level, Hints::default())
        })
        .collect();
    link(&mut records);
    NodeTree::from_records(records).unwrap()
}

#[test]
fn test_duplicate_ids_rejected() {
    let records = vec![
        NodeRecord::new(NodeId(1), "A", 0, Hints::default()),
        NodeRecord::new(NodeId(1), "B", 0, Hints::default()),
    ];
    assert_eq!(
        NodeTree::from_records(records).unwrap_err(),
        StructuralError::DuplicateId { id: NodeId(1) }
    );
}

#[test]
fn test_navigation() {
    // 1 (0)
    //   2 (1)
    //     3 (2)
    //   4 (1)
    // 5 (0)
    let tree = outline(&[0, 1, 2, 1, 0]);

    assert_eq!(tree.parent(NodeId(3)).map(|n| n.id), Some(NodeId(2)));
    assert_eq!(tree.first_child(NodeId(1)).map(|n| n.id), Some(NodeId(2)));
    assert_eq!(
        tree.children(NodeId(1))
            .iter()
            .map(|n| n.id)
            .collect::<Vec<_>>(),
        vec![NodeId(2), NodeId(4)]
    );
    assert_eq!(tree.next_sibling(NodeId(2)).map(|n| n.id), Some(NodeId(4)));
    assert_eq!(
        tree.next_sibling(NodeId(4)),
        None,
        "Sibling search must stop at the parent's end"
    );
    assert_eq!(tree.successor(NodeId(3)).map(|n| n.id), Some(NodeId(4)));
    assert_eq!(tree.predecessor(NodeId(1)), None);
    assert_eq!(
        tree.roots().map(|n| n.id).collect::<Vec<_>>(),
        vec![NodeId(1), NodeId(5)]
    );
}

#[test]
fn test_insert_keeps_index_consistent() {
    let mut tree = outline(&[0, 1, 1]);
    let id = tree.next_free_id();
    assert_eq!(id, NodeId(4));

    tree.insert_at(1, NodeRecord::synthetic(id, "Intro", 1, Hints::default()))
        .unwrap();

    assert_eq!(tree.position(id), Some(1));
    assert_eq!(tree.position(NodeId(2)), Some(2));
    assert_eq!(tree.position(NodeId(3)), Some(3));
    assert!(tree.get(id).unwrap().is_synthetic);
    assert!(tree
        .insert_at(0, NodeRecord::new(id, "Again", 0, Hints::default()))
        .is_err());
}

#[test]
fn test_check_levels_flags_shallow_child() {
    let mut records = vec![
        NodeRecord::new(NodeId(1), "A", 1, Hints::default()),
        NodeRecord::new(NodeId(2), "B", 1, Hints::default()),
    ];
    records[1].parent_id = Some(NodeId(1));
    let tree = NodeTree::from_records(records).unwrap();

    assert!(matches!(
        tree.check_levels(),
        Err(StructuralError::LevelInvariant { child, .. }) if child == NodeId(2)
    ));
}
