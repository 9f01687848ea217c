use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use simtree_protocol::{TIER_PRIMARY, TIER_ROOT, TIER_SECONDARY};
use simtree_vector_store::Neighbor;
use std::collections::HashMap;

/// Per-node similarity hints computed once at build time.
pub type NeighborLists = HashMap<String, Vec<Neighbor>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeTier {
    Root,
    Primary,
    Secondary,
}

impl NodeTier {
    pub const fn as_i8(self) -> i8 {
        match self {
            NodeTier::Root => TIER_ROOT,
            NodeTier::Primary => TIER_PRIMARY,
            NodeTier::Secondary => TIER_SECONDARY,
        }
    }

    pub const fn from_i8(raw: i8) -> Option<Self> {
        match raw {
            TIER_ROOT => Some(NodeTier::Root),
            TIER_PRIMARY => Some(NodeTier::Primary),
            TIER_SECONDARY => Some(NodeTier::Secondary),
            _ => None,
        }
    }
}

/// Node in the similarity tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub tier: NodeTier,

    /// Derived from the edge set, never tracked incrementally
    pub child_count: usize,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, tier: NodeTier) -> Self {
        Self {
            id: id.into(),
            tier,
            child_count: 0,
        }
    }
}

/// Flat edge as exchanged with callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,

    /// Cosine similarity between endpoints, or a placeholder for emergency repairs
    pub weight: f32,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f32) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }
}

/// How an edge came to exist during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    /// Top-ranked candidate attached directly to root
    Primary,

    /// Routed to the nearest placed node with spare capacity
    Secondary,

    /// Secondary item that found no node under the fan-out cap
    RootFallback,

    /// Added by the connectivity enforcer
    Repair,
}

/// Edge payload inside the build graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub weight: f32,
    pub placement: Placement,
}

/// Clamp a similarity into the valid edge weight range.
pub(crate) fn edge_weight(similarity: f32) -> f32 {
    if similarity.is_nan() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0)
}

/// Directed similarity tree rooted at a single node
pub struct SimilarityGraph {
    /// Directed graph (parent -> child)
    pub graph: DiGraph<GraphNode, Link>,

    /// Node id -> NodeIndex mapping for fast lookup
    pub id_index: HashMap<String, NodeIndex>,

    root: NodeIndex,
}

impl SimilarityGraph {
    pub fn new(root_id: impl Into<String>) -> Self {
        let mut graph = DiGraph::new();
        let root_node = GraphNode::new(root_id, NodeTier::Root);
        let root_id = root_node.id.clone();
        let root = graph.add_node(root_node);

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);

        Self {
            graph,
            id_index,
            root,
        }
    }

    pub const fn root(&self) -> NodeIndex {
        self.root
    }

    /// Add node to graph
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Add edge between nodes
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, link: Link) {
        self.graph.add_edge(from, to, link);
    }

    /// Find node by id
    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.id_index.get(id).copied()
    }

    /// Nodes in insertion order (root first)
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order as flat records
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .map(|e| {
                GraphEdge::new(
                    self.graph[e.source()].id.clone(),
                    self.graph[e.target()].id.clone(),
                    e.weight().weight,
                )
            })
            .collect()
    }

    /// Recompute every node's `child_count` from its outgoing edges.
    pub fn recompute_child_counts(&mut self) {
        let counts: Vec<(NodeIndex, usize)> = self
            .graph
            .node_indices()
            .map(|idx| (idx, self.graph.edges_directed(idx, Direction::Outgoing).count()))
            .collect();
        for (idx, count) in counts {
            self.graph[idx].child_count = count;
        }
    }

    /// Largest number of children any node acquired through secondary placement.
    pub fn max_secondary_fanout(&self) -> usize {
        self.graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .filter(|e| e.weight().placement == Placement::Secondary)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Weight used when a repair edge has no vector-derived similarity.
pub const ORPHAN_PLACEHOLDER_WEIGHT: f32 = 0.5;
