//! Structural health checks for similarity trees.
//!
//! Verifies the invariants every build and reconnection result must hold:
//! - exactly one root
//! - one incoming edge per visible non-root node
//! - every visible node reachable from root
//! - edge weights within [-1, 1]

use crate::traverse::mark_reachable;
use crate::types::{GraphEdge, GraphNode, NodeTier, SimilarityGraph};
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Something unusual but not necessarily wrong.
    Warning,
    /// An invariant violation.
    Error,
    /// The structure cannot be interpreted as a tree at all.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
}

impl ValidationIssue {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            node_id: None,
        }
    }

    fn with_node(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// No errors or critical issues (warnings allowed).
    pub fn is_healthy(&self) -> bool {
        !self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

/// Check a node/edge set, ignoring `hidden` nodes and any edge touching them.
pub fn validate_graph(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    hidden: &HashSet<String>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    let roots: Vec<&GraphNode> = nodes.iter().filter(|n| n.tier == NodeTier::Root).collect();
    if roots.len() != 1 {
        report.push(ValidationIssue::new(
            Severity::Critical,
            format!("expected exactly one root, found {}", roots.len()),
        ));
    }
    let root_id = roots.first().map(|n| n.id.as_str());

    let visible: HashSet<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| Some(*id) == root_id || !hidden.contains(*id))
        .collect();

    let mut incoming: HashMap<&str, usize> = HashMap::new();
    let mut live_edges = Vec::with_capacity(edges.len());
    for edge in edges {
        if hidden.contains(&edge.source) || hidden.contains(&edge.target) {
            continue;
        }
        if !visible.contains(edge.source.as_str()) || !visible.contains(edge.target.as_str()) {
            report.push(ValidationIssue::new(
                Severity::Error,
                format!("edge {} -> {} references an unknown node", edge.source, edge.target),
            ));
            continue;
        }
        if !edge.weight.is_finite() || !(-1.0..=1.0).contains(&edge.weight) {
            report.push(
                ValidationIssue::new(
                    Severity::Error,
                    format!("edge {} -> {} has weight {} outside [-1, 1]", edge.source, edge.target, edge.weight),
                )
                .with_node(edge.target.clone()),
            );
        }
        *incoming.entry(edge.target.as_str()).or_insert(0) += 1;
        live_edges.push((edge.source.as_str(), edge.target.as_str()));
    }

    for node in nodes {
        let id = node.id.as_str();
        if !visible.contains(id) {
            continue;
        }
        let count = incoming.get(id).copied().unwrap_or(0);
        if Some(id) == root_id {
            if count > 0 {
                report.push(
                    ValidationIssue::new(Severity::Warning, "root has incoming edges")
                        .with_node(id),
                );
            }
        } else if count != 1 {
            report.push(
                ValidationIssue::new(
                    Severity::Error,
                    format!("node has {count} incoming edges, expected 1"),
                )
                .with_node(id),
            );
        }
    }

    if let Some(root_id) = root_id {
        let adjacency: DiGraphMap<&str, ()> = DiGraphMap::from_edges(live_edges);
        let mut reached: HashSet<&str> = HashSet::new();
        mark_reachable(&adjacency, root_id, &mut reached);
        for node in nodes {
            let id = node.id.as_str();
            if visible.contains(id) && !reached.contains(id) {
                report.push(
                    ValidationIssue::new(Severity::Error, "node unreachable from root")
                        .with_node(id),
                );
            }
        }
    }

    report
}

impl SimilarityGraph {
    /// Validate the built tree, including the secondary fan-out cap.
    pub fn validate(&self, fanout_cap: usize) -> ValidationReport {
        let nodes: Vec<GraphNode> = self.nodes().cloned().collect();
        let mut report = validate_graph(&nodes, &self.edges(), &HashSet::new());

        let fanout = self.max_secondary_fanout();
        if fanout > fanout_cap {
            report.push(ValidationIssue::new(
                Severity::Error,
                format!("secondary fan-out {fanout} exceeds cap {fanout_cap}"),
            ));
        }
        report
    }
}
