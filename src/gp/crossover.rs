//! Subtree crossover between pairs of trees.
//!
//! Consecutive trees in the population are paired up; each pair exchanges one
//! randomly addressed subtree. Subtrees are moved, not copied.

use rand::Rng;

use crate::gp::node::SizeMetric;
use crate::gp::tree::Tree;

/// Swap the subtrees at preorder positions `k_a` in `a` and `k_b` in `b`.
///
/// Sizes must be current. If either position names a root the pair is left
/// untouched and `false` is returned.
pub fn crossover_at(a: &mut Tree, k_a: usize, b: &mut Tree, k_b: usize) -> bool {
    let at_a = a.locate(k_a);
    let at_b = b.locate(k_b);
    Tree::swap_subtrees(a, at_a, b, at_b)
}

/// Refresh sizes, draw a position in each tree and swap the subtrees there.
///
/// Returns whether a swap took place.
pub fn crossover_pair<R: Rng>(a: &mut Tree, b: &mut Tree, metric: SizeMetric, rng: &mut R) -> bool {
    let k_a = 1 + rng.gen_range(0..a.set_size(metric));
    let k_b = 1 + rng.gen_range(0..b.set_size(metric));
    crossover_at(a, k_a, b, k_b)
}

/// Cross consecutive pairs `(0, 1), (2, 3), …` each with probability
/// `p_crossover`. A trailing odd tree is left alone.
///
/// Returns the number of pairs that swapped subtrees.
pub fn crossover_population<R: Rng>(
    trees: &mut [Tree],
    p_crossover: f64,
    metric: SizeMetric,
    rng: &mut R,
) -> usize {
    let mut swaps = 0;
    for pair in trees.chunks_exact_mut(2) {
        if !rng.gen_bool(p_crossover) {
            continue;
        }
        let (first, second) = pair.split_at_mut(1);
        if crossover_pair(&mut first[0], &mut second[0], metric, rng) {
            swaps += 1;
        }
    }
    swaps
}
