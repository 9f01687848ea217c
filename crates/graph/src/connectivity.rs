use crate::traverse::mark_reachable;
use crate::types::{edge_weight, Link, Placement, SimilarityGraph, ORPHAN_PLACEHOLDER_WEIGHT};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

/// Reattach every node unreachable from root directly to root.
///
/// `root_similarity` supplies the repair edge weight for a node id; nodes
/// without one get the placeholder weight. Only the head of a disconnected
/// subtree is reattached: its descendants are marked reachable through their
/// existing edges. Returns how many heads were repaired.
pub fn enforce_connectivity<F>(graph: &mut SimilarityGraph, root_similarity: F) -> usize
where
    F: Fn(&str) -> Option<f32>,
{
    let root = graph.root();
    let mut reached: HashSet<NodeIndex> = HashSet::new();
    mark_reachable(&graph.graph, root, &mut reached);

    let unreached: Vec<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|idx| !reached.contains(idx))
        .collect();

    let mut repaired = 0;
    for idx in unreached {
        if reached.contains(&idx) {
            continue;
        }

        let id = graph.graph[idx].id.clone();
        let weight = root_similarity(&id)
            .map(edge_weight)
            .unwrap_or(ORPHAN_PLACEHOLDER_WEIGHT);
        log::warn!("Reattaching disconnected node {} to root (weight {:.3})", id, weight);

        graph.add_edge(
            root,
            idx,
            Link {
                weight,
                placement: Placement::Repair,
            },
        );
        mark_reachable(&graph.graph, idx, &mut reached);
        repaired += 1;
    }

    repaired
}
