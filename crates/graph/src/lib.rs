//! # Simtree Graph
//!
//! Places a root entity and a large set of scored items into one connected
//! tree, and keeps that tree connected while a filter hides nodes.
//!
//! ## Architecture
//!
//! ```text
//! root vector + candidates (raw embeddings)
//!     │
//!     ├──> Graph Builder
//!     │      ├─ Parse + normalize embeddings
//!     │      ├─ Rank by similarity to root
//!     │      ├─ Top P become primary children of root
//!     │      └─ Rest routed to best placed node via VP-tree (fan-out cap)
//!     │
//!     ├──> Connectivity Enforcer
//!     │      └─ Reattach any unreachable node/subtree to root
//!     │
//!     └──> Dynamic Reconnection (per filter change)
//!            ├─ Drop edges into hidden nodes
//!            ├─ Re-home children of hidden nodes
//!            │    (neighbor list → ancestor walk → root)
//!            └─ Single orphan sweep
//! ```

mod builder;
mod connectivity;
mod error;
mod options;
mod reconnect;
mod traverse;
mod types;
mod validate;
mod wire;

pub use builder::{BuildDiagnostics, BuiltGraph, Candidate, GraphBuilder, TopBranch};
pub use connectivity::enforce_connectivity;
pub use error::{GraphError, Result};
pub use options::BuildOptions;
pub use reconnect::reconnect;
pub use types::{
    GraphEdge, GraphNode, Link, NeighborLists, NodeTier, Placement, SimilarityGraph,
    ORPHAN_PLACEHOLDER_WEIGHT,
};
pub use validate::{validate_graph, Severity, ValidationIssue, ValidationReport};
pub use wire::{build_from_request, reconnect_from_request, validate_from_request};

pub use simtree_vector_store::Neighbor;
