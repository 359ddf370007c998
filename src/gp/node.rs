//! Node representation for expression trees.
//!
//! Nodes live in a per-tree arena (see [`Tree`](crate::gp::Tree)). Children
//! are owned top-down through their [`NodeId`]s; the parent handle is a plain
//! lookup used for upward size propagation only.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::gp::primitives::Function;

/// Handle to a node inside one tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node computes.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Internal node applying a function to its children.
    Function {
        /// Function applied elementwise.
        function: Arc<Function>,
        /// Exactly `function.arity()` children, in argument order.
        children: Vec<NodeId>,
    },
    /// Fixed scalar.
    Constant(f64),
    /// Column of the input matrix.
    Variable(usize),
}

/// One node of a tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// What the node computes.
    pub kind: NodeKind,
    /// Remaining depth below this node (its build budget minus one).
    pub depth: usize,
    /// Owning node, `None` for a root.
    pub parent: Option<NodeId>,
    /// Position among the parent's children, or population slot for a root.
    pub branch_index: usize,
    /// Cached size, valid after [`Tree::set_size`](crate::gp::Tree::set_size).
    pub size: usize,
}

impl Node {
    /// Leaf or function node without children yet.
    pub(crate) fn new(
        kind: NodeKind,
        depth: usize,
        parent: Option<NodeId>,
        branch_index: usize,
    ) -> Self {
        Self {
            kind,
            depth,
            parent,
            branch_index,
            size: 1,
        }
    }

    /// Children in argument order; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Function { children, .. } => children,
            NodeKind::Constant(_) | NodeKind::Variable(_) => &[],
        }
    }

    /// True for constants and variables.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, NodeKind::Function { .. })
    }
}

/// Result of addressing a node by preorder index: the slot it occupies.
///
/// A root has no parent and its branch index is its population slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Owner of the addressed node.
    pub parent: Option<NodeId>,
    /// Position of the addressed node within its owner.
    pub branch_index: usize,
}

/// How cached node sizes are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMetric {
    /// `1 + max(child sizes)`: longest branch from the node.
    #[default]
    Height,
    /// `1 + sum(child sizes)`: number of nodes in the subtree.
    NodeCount,
}

impl SizeMetric {
    /// Combine child sizes into the parent's size.
    #[must_use]
    pub fn combine(self, child_sizes: impl IntoIterator<Item = usize>) -> usize {
        let children = child_sizes.into_iter();
        1 + match self {
            Self::Height => children.max().unwrap_or(0),
            Self::NodeCount => children.sum(),
        }
    }
}
