//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy regression tree construction over fixed-point
//! features. Each node sorts its samples per feature once and sweeps prefix
//! gradient sums, so a split search is `O(features * n log n)`.

use charges_core::{Node, Tree};

use crate::deterministic::SplitTieBreaker;

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    gain: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, other: &Option<SplitCandidate>) -> bool {
        match other {
            None => true,
            Some(current) => {
                self.gain > current.gain
                    || (self.gain == current.gain && self.tie_breaker < current.tie_breaker)
            }
        }
    }
}

/// A fitted tree plus the gain it credited to each feature
#[derive(Debug, Clone)]
pub struct FittedTree {
    pub tree: Tree,
    pub feature_gains: Vec<i128>,
}

/// Build a regression tree on squared-error gradients (unit hessians)
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    gradients: &'a [i64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<i64>], gradients: &'a [i64], config: TreeConfig) -> Self {
        assert_eq!(features.len(), gradients.len());

        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            gradients,
            feature_count,
        }
    }

    /// Build the tree; `weight` is stored on it as the shrinkage factor
    pub fn build(&self, weight: i64) -> FittedTree {
        let mut nodes = Vec::new();
        let mut feature_gains = vec![0i128; self.feature_count];
        let indices: Vec<usize> = (0..self.features.len()).collect();

        self.build_node(&indices, 0, &mut nodes, &mut feature_gains);

        FittedTree {
            tree: Tree::new(nodes, weight),
            feature_gains,
        }
    }

    /// Recursively build tree nodes in pre-order; returns the node's index
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        feature_gains: &mut [i128],
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let (sum_g, count) = self.sum_gradients(indices);

        let can_split = depth < self.config.max_depth
            && indices.len() >= self.config.min_samples_split
            && indices.len() >= 2 * self.config.min_samples_leaf;

        let split = if can_split {
            self.find_best_split(indices, sum_g, count)
        } else {
            None
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx, leaf_value(sum_g, count)));
            return current_idx;
        };

        let feature_idx = split.tie_breaker.feature_idx;
        let threshold = split.tie_breaker.threshold;
        feature_gains[feature_idx] += split.gain;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.features[i][feature_idx] <= threshold);

        // Reserve space for current node
        nodes.push(Node::internal(current_idx, feature_idx as i32, threshold, 0, 0));

        let left = self.build_node(&left_indices, depth + 1, nodes, feature_gains);
        let right = self.build_node(&right_indices, depth + 1, nodes, feature_gains);

        let node = &mut nodes[current_idx as usize];
        node.left = left;
        node.right = right;

        current_idx
    }

    /// Exact-greedy search over every feature and every boundary between
    /// distinct sorted values. Only strictly positive gains qualify.
    fn find_best_split(
        &self,
        indices: &[usize],
        sum_g: i128,
        count: i128,
    ) -> Option<SplitCandidate> {
        if indices.len() < 2 {
            return None;
        }

        let min_leaf = self.config.min_samples_leaf.max(1);
        let parent_score = score(sum_g, count);
        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature_idx in 0..self.feature_count {
            order.sort_by_key(|&i| (self.features[i][feature_idx], i));

            let mut left_g = 0i128;
            for k in 0..order.len() - 1 {
                left_g += self.gradients[order[k]] as i128;

                let left_n = k + 1;
                let right_n = order.len() - left_n;
                if left_n < min_leaf {
                    continue;
                }
                if right_n < min_leaf {
                    break;
                }

                let here = self.features[order[k]][feature_idx];
                let next = self.features[order[k + 1]][feature_idx];
                if here == next {
                    continue;
                }

                let gain = score(left_g, left_n as i128) + score(sum_g - left_g, right_n as i128)
                    - parent_score;
                if gain <= 0 {
                    continue;
                }

                let candidate = SplitCandidate {
                    gain,
                    tie_breaker: SplitTieBreaker::new(feature_idx, midpoint(here, next)),
                };
                if candidate.beats(&best) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn sum_gradients(&self, indices: &[usize]) -> (i128, i128) {
        let sum = indices.iter().map(|&i| self.gradients[i] as i128).sum();
        (sum, indices.len() as i128)
    }
}

/// G² / H with unit hessians
fn score(sum_g: i128, count: i128) -> i128 {
    if count == 0 {
        0
    } else {
        sum_g * sum_g / count
    }
}

/// Optimal leaf value: -G/H, i.e. the mean residual
fn leaf_value(sum_g: i128, count: i128) -> i64 {
    if count == 0 {
        return 0;
    }
    (-sum_g / count).clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Integer midpoint of `a < b`; always in `[a, b)`
fn midpoint(a: i64, b: i64) -> i64 {
    (a as i128 + (b as i128 - a as i128) / 2) as i64
}
