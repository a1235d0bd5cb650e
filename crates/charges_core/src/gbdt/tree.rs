//! Regression tree structures for GBDT inference
//!
//! Nodes live in a flat vector in pre-order: the root is node 0 and every
//! child index is greater than its parent's. Thresholds and leaves are
//! fixed-point integers at `SCALE` precision.

use serde::{Deserialize, Serialize};

/// One tree node. Splits carry `feature_idx >= 0` and two child indices;
/// leaves carry `feature_idx == -1`, children `-1` and a `leaf` value in
/// micro-currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Position in `Tree::nodes`, kept for readability of dumps
    pub id: i32,

    pub left: i32,
    pub right: i32,

    /// Column of the encoded feature vector tested here, `-1` on leaves
    pub feature_idx: i32,

    /// Samples with `feature <= threshold` go left
    pub threshold: i64,

    pub leaf: Option<i64>,
}

impl Node {
    /// Split on `feature_idx`; children are usually patched in after they are built
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// One boosting round's tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    pub nodes: Vec<Node>,

    /// Learning rate the tree was fitted with, fixed-point
    pub weight: i64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Walk from the root to a leaf and return its raw value.
    ///
    /// Callers are expected to have run [`Tree::validate`]; a malformed
    /// structure evaluates to 0 rather than panicking.
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0);
            }

            let Some(&value) = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|i| features.get(i))
            else {
                return 0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };

            match usize::try_from(next) {
                // Children always come after their parent
                Ok(next) if next > idx => idx = next,
                _ => return 0,
            }
        }
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure against the expected feature width
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }

        let len = self.nodes.len() as i32;
        for (i, node) in self.nodes.iter().enumerate() {
            let i = i as i32;
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("leaf {i} carries no value"));
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i || child >= len {
                    return Err(format!("node {i}: {side} child {child} is out of order"));
                }
            }
            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "node {i}: feature {} outside a {feature_count}-wide input",
                    node.feature_idx
                ));
            }
        }

        Ok(())
    }
}
