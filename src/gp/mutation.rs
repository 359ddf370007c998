//! Subtree mutation.
//!
//! A randomly addressed subtree is thrown away and regrown from scratch with
//! the budget it was originally built with. Hitting the root regrows the
//! whole tree in the same population slot.

use rand::Rng;

use crate::error::ConfigResult;
use crate::gp::builder::TreeBuilder;
use crate::gp::node::SizeMetric;
use crate::gp::tree::Tree;

/// What a mutation replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The whole tree was rebuilt.
    Root,
    /// A subtree was regrown; sizes of its ancestors moved by `delta`.
    Subtree {
        /// New subtree size minus old subtree size.
        delta: isize,
    },
}

/// Replace the subtree at preorder position `k` with a fresh random one.
///
/// Sizes must be current. A root is rebuilt with budget `max_depth`; any
/// other node is regrown with its own budget (`depth + 1`).
///
/// # Errors
///
/// Propagates builder errors.
pub fn mutate_at<R: Rng>(
    tree: &mut Tree,
    k: usize,
    builder: &TreeBuilder<'_>,
    max_depth: usize,
    metric: SizeMetric,
    rng: &mut R,
) -> ConfigResult<Mutation> {
    let location = tree.locate(k);
    let Some(parent) = location.parent else {
        let mut fresh = builder.build_tree(rng, max_depth, location.branch_index)?;
        fresh.set_size(metric);
        *tree = fresh;
        return Ok(Mutation::Root);
    };

    let old = tree[parent].children()[location.branch_index];
    let budget = tree[old].depth + 1;
    let mut fresh = builder.build_tree(rng, budget, location.branch_index)?;
    fresh.set_size(metric);
    let delta = tree.graft(parent, location.branch_index, fresh);
    Ok(Mutation::Subtree { delta })
}

/// Refresh sizes, then with probability `p_mutation` mutate a uniformly
/// drawn position.
///
/// # Errors
///
/// Propagates builder errors.
pub fn mutate_tree<R: Rng>(
    tree: &mut Tree,
    p_mutation: f64,
    builder: &TreeBuilder<'_>,
    max_depth: usize,
    metric: SizeMetric,
    rng: &mut R,
) -> ConfigResult<Option<Mutation>> {
    let size = tree.set_size(metric);
    if !rng.gen_bool(p_mutation) {
        return Ok(None);
    }
    let k = 1 + rng.gen_range(0..size);
    mutate_at(tree, k, builder, max_depth, metric, rng).map(Some)
}

/// Mutate every tree independently. Returns how many were mutated.
///
/// # Errors
///
/// Propagates builder errors.
pub fn mutate_population<R: Rng>(
    trees: &mut [Tree],
    p_mutation: f64,
    builder: &TreeBuilder<'_>,
    max_depth: usize,
    metric: SizeMetric,
    rng: &mut R,
) -> ConfigResult<usize> {
    let mut mutated = 0;
    for tree in trees.iter_mut() {
        if mutate_tree(tree, p_mutation, builder, max_depth, metric, rng)?.is_some() {
            mutated += 1;
        }
    }
    Ok(mutated)
}
