use crate::error::{GraphError, Result};
use crate::traverse::mark_reachable;
use crate::types::{GraphEdge, GraphNode, NeighborLists, NodeTier, ORPHAN_PLACEHOLDER_WEIGHT};
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};

/// Derive a connected edge set with `hidden` nodes removed.
///
/// Children of hidden nodes are re-homed onto the first visible entry of their
/// neighbor list, else the nearest visible non-root ancestor in `edges`. A
/// single sweep then reattaches every visible node still unreachable, under a
/// connected neighbor or directly under root with the placeholder weight.
/// The input may contain cycles; every walk tracks visited nodes.
pub fn reconnect(
    edges: &[GraphEdge],
    hidden: &HashSet<String>,
    nodes: &[GraphNode],
    neighbor_lists: &NeighborLists,
) -> Result<Vec<GraphEdge>> {
    let root_id = find_root(nodes)?;
    let is_visible = |id: &str| id == root_id || !hidden.contains(id);
    let visible: HashSet<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| is_visible(*id))
        .collect();

    let parent_of: HashMap<&str, (&str, f32)> = edges
        .iter()
        .map(|e| (e.target.as_str(), (e.source.as_str(), e.weight)))
        .collect();

    let mut rehomed = 0;
    let mut rewired: Vec<GraphEdge> = Vec::with_capacity(edges.len());
    for edge in edges {
        if !is_visible(edge.target.as_str()) {
            continue;
        }
        if is_visible(edge.source.as_str()) {
            rewired.push(edge.clone());
            continue;
        }

        // Without a visible non-root replacement the target is left for the orphan sweep.
        let Some((source, weight)) =
            replacement_source(&edge.target, root_id, &visible, &parent_of, neighbor_lists)
        else {
            log::debug!("No replacement source for {}, deferring to repair", edge.target);
            continue;
        };

        rewired.push(GraphEdge::new(
            source,
            edge.target.clone(),
            weight.unwrap_or(edge.weight),
        ));
        rehomed += 1;
    }

    let mut edges = dedup_edges(rewired);

    let repairs = repair_orphans(&edges, root_id, nodes, &visible, neighbor_lists);
    if !repairs.is_empty() {
        log::warn!("Repaired {} orphaned nodes after reconnection", repairs.len());
        let repaired: HashSet<&str> = repairs.iter().map(|e| e.target.as_str()).collect();
        // Any remaining incoming edge of a repaired node came from an unreachable source.
        edges.retain(|e| !repaired.contains(e.target.as_str()));
        edges.extend(repairs.iter().cloned());
    }

    log::debug!(
        "Reconnected {} edges ({} hidden, {} re-homed)",
        edges.len(),
        hidden.len(),
        rehomed
    );
    Ok(edges)
}

fn find_root(nodes: &[GraphNode]) -> Result<&str> {
    let mut roots = nodes.iter().filter(|n| n.tier == NodeTier::Root);
    let root = roots.next().ok_or(GraphError::RootNotFound)?;
    let extra = roots.count();
    if extra > 0 {
        return Err(GraphError::MultipleRoots(extra + 1));
    }
    Ok(root.id.as_str())
}

/// Neighbor-list match first, then the nearest visible ancestor below root.
///
/// The returned weight is `None` when the original edge weight should be kept.
fn replacement_source<'a>(
    target: &str,
    root_id: &str,
    visible: &HashSet<&str>,
    parent_of: &HashMap<&'a str, (&'a str, f32)>,
    neighbor_lists: &'a NeighborLists,
) -> Option<(&'a str, Option<f32>)> {
    if let Some(neighbor) = neighbor_lists.get(target).and_then(|list| {
        list.iter()
            .find(|n| n.id != target && visible.contains(n.id.as_str()))
    }) {
        return Some((neighbor.id.as_str(), Some(neighbor.similarity)));
    }

    let mut visited: HashSet<&str> = HashSet::from([target]);
    let mut current = target;
    while let Some(&(parent, _)) = parent_of.get(current) {
        if parent == root_id || !visited.insert(parent) {
            break;
        }
        if visible.contains(parent) {
            let weight = neighbor_similarity(neighbor_lists, target, parent);
            return Some((parent, weight));
        }
        current = parent;
    }
    None
}

fn neighbor_similarity(neighbor_lists: &NeighborLists, owner: &str, id: &str) -> Option<f32> {
    neighbor_lists
        .get(owner)?
        .iter()
        .find(|n| n.id == id)
        .map(|n| n.similarity)
}

/// Collapse duplicate (source, target) pairs, keeping the first position and the last weight.
fn dedup_edges(edges: Vec<GraphEdge>) -> Vec<GraphEdge> {
    let mut position: HashMap<(String, String), usize> = HashMap::with_capacity(edges.len());
    let mut unique: Vec<GraphEdge> = Vec::with_capacity(edges.len());
    for edge in edges {
        let key = (edge.source.clone(), edge.target.clone());
        match position.get(&key) {
            Some(&at) => unique[at] = edge,
            None => {
                position.insert(key, unique.len());
                unique.push(edge);
            }
        }
    }
    unique
}

/// One forward sweep over visible nodes unreachable from root.
///
/// Each resolved orphan joins the connected set together with everything it
/// already reaches, so later orphans may attach beneath it.
fn repair_orphans<'a>(
    edges: &'a [GraphEdge],
    root_id: &'a str,
    nodes: &'a [GraphNode],
    visible: &HashSet<&str>,
    neighbor_lists: &'a NeighborLists,
) -> Vec<GraphEdge> {
    let adjacency: DiGraphMap<&str, ()> = DiGraphMap::from_edges(
        edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str())),
    );

    let mut connected: HashSet<&str> = HashSet::new();
    mark_reachable(&adjacency, root_id, &mut connected);

    let mut repairs = Vec::new();
    for node in nodes {
        let id = node.id.as_str();
        if !visible.contains(id) || connected.contains(id) {
            continue;
        }

        let anchor = neighbor_lists.get(id).and_then(|list| {
            list.iter()
                .find(|n| n.id != id && connected.contains(n.id.as_str()))
        });
        let edge = match anchor {
            Some(neighbor) => GraphEdge::new(neighbor.id.clone(), id, neighbor.similarity),
            None => GraphEdge::new(root_id, id, ORPHAN_PLACEHOLDER_WEIGHT),
        };
        log::debug!("Orphan {} reattached under {}", id, edge.source);
        repairs.push(edge);

        mark_reachable(&adjacency, id, &mut connected);
    }
    repairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simtree_vector_store::Neighbor;

    fn nodes(ids: &[&str]) -> Vec<GraphNode> {
        ids.iter()
            .map(|id| {
                let tier = if *id == "root" {
                    NodeTier::Root
                } else {
                    NodeTier::Secondary
                };
                GraphNode::new(*id, tier)
            })
            .collect()
    }

    fn hide(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let result = reconnect(&[], &HashSet::new(), &nodes(&["a"]), &NeighborLists::new());
        assert!(matches!(result, Err(GraphError::RootNotFound)));
    }

    #[test]
    fn test_dedup_keeps_last_weight() {
        let edges = vec![
            GraphEdge::new("root", "a", 0.1),
            GraphEdge::new("root", "b", 0.2),
            GraphEdge::new("root", "a", 0.3),
        ];
        let unique = dedup_edges(edges);
        assert_eq!(
            unique,
            vec![GraphEdge::new("root", "a", 0.3), GraphEdge::new("root", "b", 0.2)]
        );
    }

    #[test]
    fn test_neighbor_list_takes_priority() {
        let all = nodes(&["root", "p", "h", "c", "n"]);
        let edges = vec![
            GraphEdge::new("root", "p", 0.9),
            GraphEdge::new("p", "h", 0.8),
            GraphEdge::new("h", "c", 0.7),
            GraphEdge::new("root", "n", 0.6),
        ];
        let mut lists = NeighborLists::new();
        lists.insert(
            "c".to_string(),
            vec![
                Neighbor { id: "h".into(), similarity: 0.95 },
                Neighbor { id: "n".into(), similarity: 0.85 },
            ],
        );

        let result = reconnect(&edges, &hide(&["h"]), &all, &lists).unwrap();
        assert!(result.contains(&GraphEdge::new("n", "c", 0.85)));
        assert!(!result.iter().any(|e| e.source == "h" || e.target == "h"));
    }

    #[test]
    fn test_hidden_chain_without_root_link_uses_placeholder() {
        let all = nodes(&["root", "a", "b", "c", "n"]);
        let edges = vec![
            GraphEdge::new("a", "b", 0.8),
            GraphEdge::new("b", "c", 0.7),
            GraphEdge::new("root", "n", 0.6),
        ];

        let result = reconnect(&edges, &hide(&["a", "b"]), &all, &NeighborLists::new()).unwrap();
        assert_eq!(
            result,
            vec![
                GraphEdge::new("root", "n", 0.6),
                GraphEdge::new("root", "c", ORPHAN_PLACEHOLDER_WEIGHT),
            ]
        );
    }

    #[test]
    fn test_hidden_only_neighbor_list_is_unusable() {
        let all = nodes(&["root", "a", "c", "n"]);
        let edges = vec![
            GraphEdge::new("root", "a", 0.9),
            GraphEdge::new("a", "c", 0.7),
            GraphEdge::new("root", "n", 0.6),
        ];
        let mut lists = NeighborLists::new();
        lists.insert("c".to_string(), vec![Neighbor { id: "a".into(), similarity: 0.9 }]);

        let result = reconnect(&edges, &hide(&["a"]), &all, &lists).unwrap();
        assert_eq!(
            result,
            vec![
                GraphEdge::new("root", "n", 0.6),
                GraphEdge::new("root", "c", ORPHAN_PLACEHOLDER_WEIGHT),
            ]
        );
    }

    #[test]
    fn test_cyclic_input_terminates() {
        let all = nodes(&["root", "a", "b"]);
        let edges = vec![GraphEdge::new("a", "b", 0.5), GraphEdge::new("b", "a", 0.5)];

        let result = reconnect(&edges, &hide(&["a"]), &all, &NeighborLists::new()).unwrap();
        assert_eq!(result, vec![GraphEdge::new("root", "b", 0.5)]);
    }
}
