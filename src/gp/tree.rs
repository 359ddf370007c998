//! Arena-backed expression trees.
//!
//! Every node of a tree lives in one `Vec` owned by the [`Tree`]. Function
//! nodes own their children through [`NodeId`] handles, and each node keeps
//! its parent's handle so that size changes can be pushed up to the root
//! without rescanning the tree. Freed slots are recycled.
//!
//! Subtrees are addressed by a 1-based preorder index `k` resolved by
//! [`Tree::locate`], which walks down using the cached sizes computed by
//! [`Tree::set_size`].

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use ndarray::{Array1, ArrayView2};

use crate::error::{ConfigError, ConfigResult, EvalError};
use crate::gp::node::{Location, Node, NodeId, NodeKind, SizeMetric};
use crate::gp::primitives::Function;

/// An expression tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.0).and_then(Option::as_ref) {
            Some(node) => node,
            None => panic!("{id} is not a live node of this tree"),
        }
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("{id} is not a live node of this tree"),
        }
    }
}

impl Tree {
    /// Tree with no nodes yet; the builder fills it in and sets the root.
    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Single constant leaf.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::leaf(NodeKind::Constant(value))
    }

    /// Single variable leaf reading column `index`.
    #[must_use]
    pub fn variable(index: usize) -> Self {
        Self::leaf(NodeKind::Variable(index))
    }

    fn leaf(kind: NodeKind) -> Self {
        let mut tree = Self::empty();
        let root = tree.alloc(Node::new(kind, 0, None, 0));
        tree.set_root(root);
        tree
    }

    /// Function node over the given subtrees.
    ///
    /// Depths are restamped so the result is as deep as its longest branch,
    /// and sizes are computed with [`SizeMetric::Height`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ArityMismatch`] if the number of children does
    /// not match the function's arity.
    pub fn function(function: impl Into<Arc<Function>>, children: Vec<Tree>) -> ConfigResult<Self> {
        let function = function.into();
        if children.len() != function.arity() {
            return Err(ConfigError::ArityMismatch {
                name: function.name().to_string(),
                declared: function.arity(),
                actual: children.len(),
            });
        }

        let mut tree = Self::empty();
        let root = tree.alloc(Node::new(
            NodeKind::Function {
                function,
                children: Vec::new(),
            },
            0,
            None,
            0,
        ));
        tree.set_root(root);
        for (branch_index, mut child) in children.into_iter().enumerate() {
            let child_root = child.root;
            let moved = move_subtree(&mut child, child_root, &mut tree, Some(root), branch_index);
            tree.push_child(root, moved);
        }
        tree.restamp_depths();
        tree.set_size(SizeMetric::Height);
        Ok(tree)
    }

    /// Root handle.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node by handle, if it is live.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Population slot recorded on the root.
    #[must_use]
    pub fn slot(&self) -> usize {
        self[self.root].branch_index
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        let root = self.root;
        self[root].branch_index = slot;
    }

    /// Cached size of the root.
    #[must_use]
    pub fn size(&self) -> usize {
        self[self.root].size
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = Some(node);
            NodeId(slot)
        } else {
            self.nodes.push(Some(node));
            NodeId(self.nodes.len() - 1)
        }
    }

    fn take(&mut self, id: NodeId) -> Node {
        match self.nodes.get_mut(id.0).and_then(Option::take) {
            Some(node) => {
                self.free.push(id.0);
                node
            }
            None => panic!("{id} is not a live node of this tree"),
        }
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        if let NodeKind::Function { children, .. } = &mut self[parent].kind {
            children.push(child);
        }
    }

    fn set_child(&mut self, parent: NodeId, branch_index: usize, child: NodeId) {
        if let NodeKind::Function { children, .. } = &mut self[parent].kind {
            children[branch_index] = child;
        }
    }

    /// Node occupying a location, if any.
    #[must_use]
    pub fn node_at(&self, location: Location) -> Option<NodeId> {
        match location.parent {
            None => Some(self.root),
            Some(parent) => self.get(parent)?.children().get(location.branch_index).copied(),
        }
    }

    /// Handles of all live nodes in preorder.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self[id].children().iter().rev());
        }
        order
    }

    /// Number of nodes, counted from scratch.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    /// Number of levels on the longest branch, counted from scratch.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height_at(self.root)
    }

    fn height_at(&self, id: NodeId) -> usize {
        SizeMetric::Height.combine(self[id].children().iter().map(|&c| self.height_at(c)))
    }

    /// Largest variable index referenced, if any.
    #[must_use]
    pub fn max_variable_index(&self) -> Option<usize> {
        self.preorder()
            .into_iter()
            .filter_map(|id| match self[id].kind {
                NodeKind::Variable(index) => Some(index),
                _ => None,
            })
            .max()
    }

    /// Evaluate the tree on every row of `inputs`.
    ///
    /// Non-finite results are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::VariableOutOfRange`] if a variable refers to a
    /// missing column.
    pub fn evaluate(&self, inputs: ArrayView2<'_, f64>) -> Result<Array1<f64>, EvalError> {
        self.evaluate_at(self.root, inputs)
    }

    /// Evaluate the subtree rooted at `id`.
    ///
    /// # Errors
    ///
    /// See [`Tree::evaluate`].
    pub fn evaluate_at(
        &self,
        id: NodeId,
        inputs: ArrayView2<'_, f64>,
    ) -> Result<Array1<f64>, EvalError> {
        match &self[id].kind {
            NodeKind::Constant(value) => Ok(Array1::from_elem(inputs.nrows(), *value)),
            NodeKind::Variable(index) => {
                if *index < inputs.ncols() {
                    Ok(inputs.column(*index).to_owned())
                } else {
                    Err(EvalError::VariableOutOfRange {
                        index: *index,
                        columns: inputs.ncols(),
                    })
                }
            }
            NodeKind::Function { function, children } => {
                let values = children
                    .iter()
                    .map(|&child| self.evaluate_at(child, inputs))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut args = vec![0.0; values.len()];
                Ok(Array1::from_shape_fn(inputs.nrows(), |row| {
                    for (arg, column) in args.iter_mut().zip(&values) {
                        *arg = column[row];
                    }
                    function.apply(&args)
                }))
            }
        }
    }

    /// Canonical text form, e.g. `add(x0, 5)`.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_at(self.root)
    }

    /// Text form of the subtree rooted at `id`.
    #[must_use]
    pub fn render_at(&self, id: NodeId) -> String {
        match &self[id].kind {
            NodeKind::Constant(value) => value.to_string(),
            NodeKind::Variable(index) => format!("x{index}"),
            NodeKind::Function { function, children } => {
                let args: Vec<String> = children.iter().map(|&c| self.render_at(c)).collect();
                format!("{}({})", function.name(), args.join(", "))
            }
        }
    }

    /// Recompute every cached size bottom-up and return the root's.
    pub fn set_size(&mut self, metric: SizeMetric) -> usize {
        self.set_size_at(self.root, metric)
    }

    /// Recompute cached sizes of the subtree rooted at `id`.
    pub fn set_size_at(&mut self, id: NodeId, metric: SizeMetric) -> usize {
        let children = self[id].children().to_vec();
        let sizes: Vec<usize> = children
            .into_iter()
            .map(|child| self.set_size_at(child, metric))
            .collect();
        let size = metric.combine(sizes);
        self[id].size = size;
        size
    }

    /// Resolve the 1-based preorder index `k` to the slot it occupies.
    ///
    /// `k <= 1` names the root. Otherwise the walk skips children whose
    /// cached size is smaller than what remains of `k`. Leaves resolve any
    /// index to themselves; an index running past the last child descends
    /// into the last child.
    #[must_use]
    pub fn locate(&self, k: usize) -> Location {
        self.locate_from(self.root, k)
    }

    /// Like [`Tree::locate`], starting at `start`.
    #[must_use]
    pub fn locate_from(&self, start: NodeId, k: usize) -> Location {
        let mut id = start;
        let mut k = k;
        loop {
            let node = &self[id];
            let children = node.children();
            if k <= 1 || children.is_empty() {
                return Location {
                    parent: node.parent,
                    branch_index: node.branch_index,
                };
            }
            k -= 1;
            let last = children.len() - 1;
            for (i, &child) in children.iter().enumerate() {
                let size = self[child].size;
                if k <= size || i == last {
                    id = child;
                    break;
                }
                k -= size;
            }
        }
    }

    /// Add `delta` to the cached size of `from` and of every ancestor.
    pub fn propagate_size_delta(&mut self, from: NodeId, delta: isize) {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = &mut self[id];
            node.size = node.size.saturating_add_signed(delta);
            current = node.parent;
        }
    }

    /// Replace the child at `branch_index` of `parent` with `subtree`.
    ///
    /// The grafted root is linked to `parent`, keeps the cached sizes and
    /// depths it was built with, and the size difference is propagated from
    /// `parent` to the root. Returns that difference.
    pub fn graft(&mut self, parent: NodeId, branch_index: usize, mut subtree: Tree) -> isize {
        let old = self[parent].children()[branch_index];
        let old_size = self[old].size;
        self.release(old);

        let sub_root = subtree.root;
        let new_size = subtree[sub_root].size;
        let moved = move_subtree(&mut subtree, sub_root, self, Some(parent), branch_index);
        self.set_child(parent, branch_index, moved);

        let delta = signed_difference(new_size, old_size);
        self.propagate_size_delta(parent, delta);
        delta
    }

    /// Exchange the subtrees at `at_a` in `a` and `at_b` in `b`.
    ///
    /// Nothing happens if either location is a root; returns whether the swap
    /// took place. Moved subtrees are re-linked to their new parents and both
    /// ancestor chains receive the size difference.
    pub fn swap_subtrees(a: &mut Tree, at_a: Location, b: &mut Tree, at_b: Location) -> bool {
        let (Some(parent_a), Some(parent_b)) = (at_a.parent, at_b.parent) else {
            return false;
        };
        let (Some(sub_a), Some(sub_b)) = (a.node_at(at_a), b.node_at(at_b)) else {
            return false;
        };
        let size_a = a[sub_a].size;
        let size_b = b[sub_b].size;

        let into_b = move_subtree(a, sub_a, b, Some(parent_b), at_b.branch_index);
        let into_a = move_subtree(b, sub_b, a, Some(parent_a), at_a.branch_index);
        a.set_child(parent_a, at_a.branch_index, into_a);
        b.set_child(parent_b, at_b.branch_index, into_b);

        a.propagate_size_delta(parent_a, signed_difference(size_b, size_a));
        b.propagate_size_delta(parent_b, signed_difference(size_a, size_b));
        true
    }

    /// Free every node of the subtree rooted at `id`.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.take(id);
            stack.extend(node.children());
        }
    }

    /// Rewrite depths top-down from the measured height.
    fn restamp_depths(&mut self) {
        let root = self.root;
        let height = self.height();
        self[root].depth = height - 1;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let depth = self[id].depth.saturating_sub(1);
            let children = self[id].children().to_vec();
            for child in children {
                self[child].depth = depth;
                stack.push(child);
            }
        }
    }
}

/// Move the subtree rooted at `id` out of `src` into `dst`, linking its root
/// to `parent` at `branch_index`. Returns the new root handle in `dst`.
fn move_subtree(
    src: &mut Tree,
    id: NodeId,
    dst: &mut Tree,
    parent: Option<NodeId>,
    branch_index: usize,
) -> NodeId {
    let mut node = src.take(id);
    node.parent = parent;
    node.branch_index = branch_index;
    let children = match &mut node.kind {
        NodeKind::Function { children, .. } => std::mem::take(children),
        NodeKind::Constant(_) | NodeKind::Variable(_) => Vec::new(),
    };
    let new_id = dst.alloc(node);
    for (i, child) in children.into_iter().enumerate() {
        let moved = move_subtree(src, child, dst, Some(new_id), i);
        dst.push_child(new_id, moved);
    }
    new_id
}

#[allow(clippy::cast_possible_wrap)]
fn signed_difference(new: usize, old: usize) -> isize {
    new as isize - old as isize
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
