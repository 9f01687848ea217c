use crate::connectivity::enforce_connectivity;
use crate::error::Result;
use crate::options::BuildOptions;
use crate::types::{
    edge_weight, GraphNode, Link, NeighborLists, NodeTier, Placement, SimilarityGraph,
};
use serde::{Deserialize, Serialize};
use simtree_vector_store::{
    dot_product, normalize_all, normalize_in_place, parse_embedding, Neighbor, Point, VpTree,
};
use std::collections::{HashMap, HashSet};

/// Candidate item with its embedding still in raw JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub raw_embedding: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, raw_embedding: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_embedding: raw_embedding.into(),
        }
    }
}

/// Aggregate counters reported alongside a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostics {
    /// Candidates skipped for an unparsable, mismatched or duplicate embedding
    pub dropped_invalid: usize,

    /// Secondary items that fell back to root because no neighbor had capacity
    pub capped_secondary: usize,

    /// Disconnected heads reattached by the connectivity enforcer
    pub orphans_repaired: usize,

    pub fanout_cap: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBranch {
    pub label: String,
    pub child_count: usize,
}

/// Result of a full build
pub struct BuiltGraph {
    pub graph: SimilarityGraph,
    pub neighbor_lists: NeighborLists,
    pub top_branches: Vec<TopBranch>,
    pub diagnostics: BuildDiagnostics,
}

struct RankedCandidate {
    id: String,
    vector: Vec<f32>,
    resume_similarity: f32,
}

/// Build similarity trees from a root vector and scored candidates
pub struct GraphBuilder {
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(options: BuildOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub const fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the tree. Never fails: bad candidates are dropped and counted.
    pub fn build(
        &self,
        root_id: &str,
        root_embedding: &[f32],
        candidates: &[Candidate],
    ) -> BuiltGraph {
        let mut diagnostics = BuildDiagnostics {
            fanout_cap: self.options.max_children_per_node,
            ..BuildDiagnostics::default()
        };

        let mut root_vector = root_embedding.to_vec();
        if normalize_in_place(&mut root_vector) == 0.0 {
            log::debug!("Root {} has a zero-magnitude embedding", root_id);
        }

        // Phase 1: parse, normalize and rank candidates
        let ranked = self.rank_candidates(root_id, &root_vector, candidates, &mut diagnostics);

        let mut graph = SimilarityGraph::new(root_id);
        let root = graph.root();

        // Phase 2: primary branches straight off root
        let primary_count = self.options.primary_branches.min(ranked.len());
        let mut placed: HashSet<String> = HashSet::with_capacity(ranked.len());
        let mut child_counts: HashMap<String, usize> = HashMap::with_capacity(ranked.len());

        for candidate in &ranked[..primary_count] {
            let idx = graph.add_node(GraphNode::new(candidate.id.clone(), NodeTier::Primary));
            graph.add_edge(
                root,
                idx,
                Link {
                    weight: edge_weight(candidate.resume_similarity),
                    placement: Placement::Primary,
                },
            );
            placed.insert(candidate.id.clone());
        }

        // Phase 3: secondary routing through the VP-tree
        let points: Vec<Point> = ranked
            .iter()
            .map(|c| Point::new(c.id.clone(), c.vector.clone()))
            .collect();
        let tree = VpTree::new(points);
        let cap = self.options.max_children_per_node;

        for candidate in &ranked[primary_count..] {
            let hits = tree.k_nearest(
                &candidate.vector,
                self.options.secondary_search_k,
                Some(&placed),
            );
            let parent = hits.iter().find_map(|hit| {
                let has_room = child_counts.get(&hit.id).copied().unwrap_or(0) < cap;
                has_room
                    .then(|| graph.find_node(&hit.id).map(|idx| (idx, hit)))
                    .flatten()
            });

            let idx = graph.add_node(GraphNode::new(candidate.id.clone(), NodeTier::Secondary));
            match parent {
                Some((parent_idx, hit)) => {
                    graph.add_edge(
                        parent_idx,
                        idx,
                        Link {
                            weight: edge_weight(hit.similarity),
                            placement: Placement::Secondary,
                        },
                    );
                    *child_counts.entry(hit.id.clone()).or_insert(0) += 1;
                }
                None => {
                    log::debug!(
                        "No placed neighbor with capacity for {}, attaching to root",
                        candidate.id
                    );
                    graph.add_edge(
                        root,
                        idx,
                        Link {
                            weight: edge_weight(dot_product(&candidate.vector, &root_vector)),
                            placement: Placement::RootFallback,
                        },
                    );
                    diagnostics.capped_secondary += 1;
                }
            }
            placed.insert(candidate.id.clone());
        }

        // Phase 4: repair and derive counts
        let root_similarity: HashMap<&str, f32> = ranked
            .iter()
            .map(|c| (c.id.as_str(), c.resume_similarity))
            .collect();
        diagnostics.orphans_repaired =
            enforce_connectivity(&mut graph, |id| root_similarity.get(id).copied());
        graph.recompute_child_counts();

        let top_branches = self.top_branches(&graph);
        let neighbor_lists = self.neighbor_lists(root_id, &ranked, &tree);

        log::info!(
            "Built similarity graph: {} nodes, {} edges ({} primary, {} dropped, {} capped, {} repaired)",
            graph.node_count(),
            graph.edge_count(),
            primary_count,
            diagnostics.dropped_invalid,
            diagnostics.capped_secondary,
            diagnostics.orphans_repaired
        );

        BuiltGraph {
            graph,
            neighbor_lists,
            top_branches,
            diagnostics,
        }
    }

    /// Parse and normalize every candidate, sorted by similarity to root (descending).
    fn rank_candidates(
        &self,
        root_id: &str,
        root_vector: &[f32],
        candidates: &[Candidate],
        diagnostics: &mut BuildDiagnostics,
    ) -> Vec<RankedCandidate> {
        let dimension = root_vector.len();
        let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len() + 1);
        seen.insert(root_id);

        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if seen.contains(candidate.id.as_str()) {
                log::debug!("Skipping duplicate candidate id {}", candidate.id);
                diagnostics.dropped_invalid += 1;
                continue;
            }

            // Only a parsed embedding claims the id.
            match parse_embedding(&candidate.raw_embedding, Some(dimension)) {
                Ok(vector) => {
                    seen.insert(candidate.id.as_str());
                    ranked.push(RankedCandidate {
                        id: candidate.id.clone(),
                        vector,
                        resume_similarity: 0.0,
                    });
                }
                Err(err) => {
                    log::debug!("Skipping candidate {}: {}", candidate.id, err);
                    diagnostics.dropped_invalid += 1;
                }
            }
        }

        let degenerate = normalize_all(ranked.iter_mut().map(|c| &mut c.vector));
        if degenerate > 0 {
            log::debug!("{} candidates have zero-magnitude embeddings", degenerate);
        }
        for candidate in &mut ranked {
            candidate.resume_similarity = dot_product(&candidate.vector, root_vector);
        }

        ranked.sort_by(|a, b| b.resume_similarity.total_cmp(&a.resume_similarity));
        ranked
    }

    /// Highest fan-out non-root nodes, ties broken by insertion order.
    fn top_branches(&self, graph: &SimilarityGraph) -> Vec<TopBranch> {
        let mut branches: Vec<TopBranch> = graph
            .nodes()
            .filter(|node| node.tier != NodeTier::Root && node.child_count > 0)
            .map(|node| TopBranch {
                label: node.id.clone(),
                child_count: node.child_count,
            })
            .collect();
        branches.sort_by(|a, b| b.child_count.cmp(&a.child_count));
        branches.truncate(self.options.top_branches_len);
        branches
    }

    /// Nearest neighbors from the unfiltered index plus an explicit root entry.
    fn neighbor_lists(
        &self,
        root_id: &str,
        ranked: &[RankedCandidate],
        tree: &VpTree,
    ) -> NeighborLists {
        let len = self.options.neighbor_list_len;
        ranked
            .iter()
            .map(|candidate| {
                let mut list: Vec<Neighbor> = tree
                    .k_nearest(&candidate.vector, len + 1, None)
                    .into_iter()
                    .filter(|hit| hit.id != candidate.id)
                    .take(len)
                    .map(|hit| Neighbor {
                        similarity: edge_weight(hit.similarity),
                        id: hit.id,
                    })
                    .collect();
                list.push(Neighbor {
                    id: root_id.to_string(),
                    similarity: edge_weight(candidate.resume_similarity),
                });
                list.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
                list.truncate(len);
                (candidate.id.clone(), list)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(values: &[f32]) -> String {
        serde_json::to_string(values).unwrap()
    }

    fn builder(primary_branches: usize) -> GraphBuilder {
        GraphBuilder::new(BuildOptions::default().with_primary_branches(primary_branches)).unwrap()
    }

    #[test]
    fn test_empty_candidates_yield_root_only() {
        let built = builder(20).build("root", &[1.0, 0.0], &[]);

        assert_eq!(built.graph.node_count(), 1);
        assert_eq!(built.graph.edge_count(), 0);
        assert!(built.neighbor_lists.is_empty());
        assert!(built.top_branches.is_empty());
        assert_eq!(built.diagnostics.fanout_cap, 15);
    }

    #[test]
    fn test_three_axes_scenario() {
        let candidates = vec![
            Candidate::new("a", embedding(&[1.0, 0.0, 0.0])),
            Candidate::new("b", embedding(&[0.0, 1.0, 0.0])),
            Candidate::new("c", embedding(&[0.0, 0.0, 1.0])),
        ];
        let built = builder(2).build("root", &[1.0, 0.0, 0.0], &candidates);

        assert_eq!(built.graph.node_count(), 4);
        assert_eq!(built.graph.edge_count(), 3);

        let edges = built.graph.edges();
        let into = |id: &str| edges.iter().find(|e| e.target == id).unwrap().clone();
        assert_eq!(into("a").source, "root");
        // b and c tie at similarity 0, so stable order keeps b as the second primary
        assert_eq!(into("b").source, "root");
        let c = into("c");
        assert!(c.source == "a" || c.source == "b");
    }

    #[test]
    fn test_invalid_embedding_is_dropped() {
        let candidates = vec![
            Candidate::new("good", embedding(&[1.0, 0.0])),
            Candidate::new("bad", "{not json"),
            Candidate::new("short", embedding(&[1.0])),
        ];
        let built = builder(20).build("root", &[1.0, 0.0], &candidates);

        assert_eq!(built.graph.node_count(), 2);
        assert!(built.graph.find_node("bad").is_none());
        assert!(built.graph.find_node("short").is_none());
        assert_eq!(built.diagnostics.dropped_invalid, 2);
    }

    #[test]
    fn test_duplicate_and_root_ids_are_dropped() {
        let candidates = vec![
            Candidate::new("root", embedding(&[1.0, 0.0])),
            Candidate::new("a", embedding(&[1.0, 0.0])),
            Candidate::new("a", embedding(&[0.0, 1.0])),
        ];
        let built = builder(20).build("root", &[1.0, 0.0], &candidates);

        assert_eq!(built.graph.node_count(), 2);
        assert_eq!(built.diagnostics.dropped_invalid, 2);
    }

    #[test]
    fn test_invalid_occurrence_does_not_claim_id() {
        let candidates = vec![
            Candidate::new("a", "[1.0, oops]"),
            Candidate::new("a", embedding(&[1.0, 0.0])),
            Candidate::new("a", embedding(&[0.0, 1.0])),
        ];
        let built = builder(20).build("root", &[1.0, 0.0], &candidates);

        assert_eq!(built.graph.node_count(), 2);
        assert!(built.graph.find_node("a").is_some());
        assert_eq!(built.diagnostics.dropped_invalid, 2);
        assert_eq!(built.neighbor_lists["a"][0].id, "root");
        assert!((built.neighbor_lists["a"][0].similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_neighbor_lists_include_root_and_exclude_self() {
        let candidates = vec![
            Candidate::new("a", embedding(&[1.0, 0.1])),
            Candidate::new("b", embedding(&[1.0, 0.2])),
            Candidate::new("c", embedding(&[0.1, 1.0])),
        ];
        let built = builder(1).build("root", &[1.0, 0.0], &candidates);

        for (id, list) in &built.neighbor_lists {
            assert!(list.len() <= 5);
            assert!(list.iter().all(|n| &n.id != id));
            assert!(list.iter().any(|n| n.id == "root"));
            assert!(list.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        }
        assert_eq!(built.neighbor_lists.len(), 3);
    }

    #[test]
    fn test_child_counts_match_edges() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| Candidate::new(format!("n{i}"), embedding(&[1.0, i as f32 * 0.1])))
            .collect();
        let built = builder(2).build("root", &[1.0, 0.0], &candidates);

        let edges = built.graph.edges();
        for node in built.graph.nodes() {
            let expected = edges.iter().filter(|e| e.source == node.id).count();
            assert_eq!(node.child_count, expected);
        }
        assert!(!built.top_branches.is_empty());
    }
}
