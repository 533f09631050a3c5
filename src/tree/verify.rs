// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{
    node::{Color, NodeId},
    RbTree,
};

/// A broken red-black tree invariant, as found by [`RbTree::verify`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InvariantViolation {
    /// The root is red
    RedRoot,

    /// A red node has a red child (parent key, child key)
    RedRed(i64, i64),

    /// Two paths below a node count a different number of black nodes
    BlackHeight(i64),

    /// Keys are not strictly ascending in order (predecessor key, key)
    Order(i64, i64),

    /// A child does not point back to its parent
    ParentLink(i64),

    /// A linked node has no value
    EmptyNode(i64),

    /// The tracked length differs from the number of reachable nodes (tracked, counted)
    Length(usize, usize),
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for InvariantViolation {}

struct Walk {
    count: usize,
    last_key: Option<i64>,
}

/// Returns the black height of the subtree below `id` (absent leaves not counted).
fn walk<V>(
    tree: &RbTree<V>,
    id: Option<NodeId>,
    parent: Option<NodeId>,
    state: &mut Walk,
) -> Result<usize, InvariantViolation> {
    let Some(id) = id else {
        return Ok(0);
    };

    let node = tree.node(id);

    if node.parent != parent {
        return Err(InvariantViolation::ParentLink(node.key));
    }
    if node.value.is_none() {
        return Err(InvariantViolation::EmptyNode(node.key));
    }

    if node.color == Color::Red {
        for child in [node.left, node.right].into_iter().flatten() {
            if tree.is_red(child) {
                return Err(InvariantViolation::RedRed(node.key, tree.node(child).key));
            }
        }
    }

    let left_height = walk(tree, node.left, Some(id), state)?;

    if let Some(last_key) = state.last_key {
        if last_key >= node.key {
            return Err(InvariantViolation::Order(last_key, node.key));
        }
    }
    state.last_key = Some(node.key);
    state.count += 1;

    let right_height = walk(tree, node.right, Some(id), state)?;

    if left_height != right_height {
        return Err(InvariantViolation::BlackHeight(node.key));
    }

    Ok(left_height + usize::from(node.color == Color::Black))
}

pub fn verify<V>(tree: &RbTree<V>) -> Result<usize, InvariantViolation> {
    if tree.color_of(tree.root) == Color::Red {
        return Err(InvariantViolation::RedRoot);
    }

    let mut state = Walk {
        count: 0,
        last_key: None,
    };
    let black_height = walk(tree, tree.root, None, &mut state)?;

    if state.count != tree.len {
        return Err(InvariantViolation::Length(tree.len, state.count));
    }

    Ok(black_height)
}
