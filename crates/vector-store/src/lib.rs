//! # Simtree Vector Store
//!
//! Cosine-similarity primitives and a static nearest-neighbor index over
//! pre-normalized embeddings.
//!
//! ## Features
//!
//! - **Vector operations** - dot product and in-place L2 normalization, so that
//!   cosine similarity reduces to a plain dot product
//! - **Embedding parsing** - raw JSON payloads validated into `Vec<f32>`
//! - **VP-Tree** - vantage-point tree with k-nearest queries and an optional
//!   id allow-list
//!
//! ## Architecture
//!
//! ```text
//! raw embedding (JSON)
//!     │
//!     ├──> parse_embedding
//!     │      └─> Vec<f32>
//!     │
//!     ├──> normalize_in_place
//!     │      └─> unit vector (dot == cosine)
//!     │
//!     └──> VpTree::new(Vec<Point>)
//!            └─> k_nearest(query, k, allowed)
//! ```
//!
//! ## Example
//!
//! ```
//! use simtree_vector_store::{normalize_in_place, Point, VpTree};
//!
//! let mut a = vec![1.0, 0.0];
//! let mut b = vec![0.6, 0.8];
//! normalize_in_place(&mut a);
//! normalize_in_place(&mut b);
//!
//! let tree = VpTree::new(vec![Point::new("a", a.clone()), Point::new("b", b)]);
//! let hits = tree.k_nearest(&a, 1, None);
//! assert_eq!(hits[0].id, "a");
//! ```

mod error;
mod types;
mod vector;
mod vp_tree;

pub use error::{Result, VectorStoreError};
pub use types::{Neighbor, Point};
pub use vector::{
    cosine_distance, dot_product, normalize_all, normalize_in_place, parse_embedding,
};
pub use vp_tree::VpTree;
