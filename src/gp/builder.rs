//! Random tree construction under a depth budget.

use rand::Rng;

use crate::error::{ConfigError, ConfigResult};
use crate::gp::node::{Node, NodeId, NodeKind};
use crate::gp::primitives::PrimitiveSet;
use crate::gp::tree::Tree;

/// Grows random trees from a [`PrimitiveSet`].
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    primitives: &'a PrimitiveSet,
}

impl<'a> TreeBuilder<'a> {
    /// Builder drawing from `primitives`.
    #[must_use]
    pub fn new(primitives: &'a PrimitiveSet) -> Self {
        Self { primitives }
    }

    /// Build a standalone random tree.
    ///
    /// The root gets `branch_index` (its population slot, or the child slot
    /// it will be grafted into) and no parent. A budget of 1 or less always
    /// yields a single leaf.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyTerminalPool`] if a leaf is needed and
    /// there are no constants or variables.
    pub fn build_tree<R: Rng>(
        &self,
        rng: &mut R,
        depth_budget: usize,
        branch_index: usize,
    ) -> ConfigResult<Tree> {
        let mut tree = Tree::empty();
        let root = self.build(&mut tree, rng, depth_budget, None, branch_index)?;
        tree.set_root(root);
        Ok(tree)
    }

    /// Build a random subtree into `tree`, returning its root handle.
    ///
    /// The caller is responsible for linking the result into `parent`.
    fn build<R: Rng>(
        &self,
        tree: &mut Tree,
        rng: &mut R,
        depth_budget: usize,
        parent: Option<NodeId>,
        branch_index: usize,
    ) -> ConfigResult<NodeId> {
        let depth = depth_budget.saturating_sub(1);
        let functions = self.primitives.functions();

        if depth_budget <= 1 || functions.is_empty() || rng.gen_bool(self.primitives.p_terminal()) {
            let kind = self.random_terminal(rng)?;
            return Ok(tree.alloc(Node::new(kind, depth, parent, branch_index)));
        }

        let function = functions[rng.gen_range(0..functions.len())].clone();
        let arity = function.arity();
        let id = tree.alloc(Node::new(
            NodeKind::Function {
                function,
                children: Vec::with_capacity(arity),
            },
            depth,
            parent,
            branch_index,
        ));
        for i in 0..arity {
            let child = self.build(tree, rng, depth, Some(id), i)?;
            tree.push_child(id, child);
        }
        Ok(id)
    }

    /// Uniform draw over constants followed by variables.
    fn random_terminal<R: Rng>(&self, rng: &mut R) -> ConfigResult<NodeKind> {
        let n_terminals = self.primitives.n_terminals();
        if n_terminals == 0 {
            return Err(ConfigError::EmptyTerminalPool);
        }
        let constants = self.primitives.constants();
        let index = rng.gen_range(0..n_terminals);
        Ok(match constants.get(index) {
            Some(&value) => NodeKind::Constant(value),
            None => NodeKind::Variable(index - constants.len()),
        })
    }
}
