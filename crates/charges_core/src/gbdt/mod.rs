//! Deterministic GBDT (Gradient Boosted Decision Tree) regressor
//!
//! Inference side of the boosted ensemble. Properties:
//!
//! - **Integer-only traversal and accumulation**: features, thresholds, leaves
//!   and the bias are fixed-point `i64` at [`SCALE`]
//! - **Deterministic across platforms**: same artifact and input always give
//!   the same score
//! - **Serializable**: trees round-trip through canonical JSON inside the
//!   pipeline artifact
//!
//! # Model Format
//!
//! ```json
//! {
//!   "bias": 13270422265,
//!   "feature_count": 11,
//!   "scale": 1000000,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"feature_idx":3,"id":0,"leaf":null,"left":1,"right":2,"threshold":500000},
//!         {"feature_idx":-1,"id":1,"leaf":-4812000000,"left":-1,"right":-1,"threshold":0},
//!         {"feature_idx":-1,"id":2,"leaf":19570000000,"left":-1,"right":-1,"threshold":0}
//!       ],
//!       "weight": 100000
//!     }
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! A tree contributes `leaf * weight / scale`; `weight` is the learning rate
//! the tree was fitted with.

pub mod model;
pub mod tree;

pub use model::{from_fixed, to_fixed, Model, SCALE};
pub use tree::{Node, Tree};
