use crate::builder::{BuiltGraph, Candidate, GraphBuilder};
use crate::error::{GraphError, Result};
use crate::options::BuildOptions;
use crate::reconnect::reconnect;
use crate::types::{GraphEdge, GraphNode, NeighborLists, NodeTier};
use crate::validate::{validate_graph, Severity};
use simtree_protocol::{
    BuildDiagnostics as DiagnosticsRecord, BuildRequest, BuildResponse, EdgeRecord,
    IssueSeverity, NeighborRecord, NodeRecord, ReconnectRequest, ReconnectResponse,
    TopBranchRecord, ValidateRequest, ValidateResponse, ValidationIssueRecord,
};
use simtree_vector_store::Neighbor;
use std::collections::{BTreeMap, HashSet};

/// Run a build request. `options.primary_branches` is overridden by the request when set.
pub fn build_from_request(request: &BuildRequest, options: &BuildOptions) -> Result<BuildResponse> {
    let mut options = options.clone();
    if let Some(primary_branches) = request.primary_branches {
        options.primary_branches = primary_branches;
    }
    let builder = GraphBuilder::new(options)?;

    let candidates: Vec<Candidate> = request
        .candidates
        .iter()
        .map(|c| Candidate::new(c.id.clone(), c.raw_embedding.clone()))
        .collect();
    let built = builder.build(&request.root_id, &request.root_embedding, &candidates);
    Ok(built.to_response())
}

/// Run a reconnection request against the wire representation.
pub fn reconnect_from_request(request: &ReconnectRequest) -> Result<ReconnectResponse> {
    let nodes = nodes_from_records(&request.nodes)?;
    let edges: Vec<GraphEdge> = request.edges.iter().map(edge_from_record).collect();
    let hidden: HashSet<String> = request.hidden_ids.iter().cloned().collect();
    let neighbor_lists = neighbor_lists_from_records(&request.neighbor_lists);

    let edges = reconnect(&edges, &hidden, &nodes, &neighbor_lists)?;
    Ok(ReconnectResponse {
        edges: edges.iter().map(edge_to_record).collect(),
    })
}

pub fn validate_from_request(request: &ValidateRequest) -> Result<ValidateResponse> {
    let nodes = nodes_from_records(&request.nodes)?;
    let edges: Vec<GraphEdge> = request.edges.iter().map(edge_from_record).collect();
    let hidden: HashSet<String> = request.hidden_ids.iter().cloned().collect();

    let report = validate_graph(&nodes, &edges, &hidden);
    Ok(ValidateResponse {
        healthy: report.is_healthy(),
        issues: report
            .issues
            .into_iter()
            .map(|issue| ValidationIssueRecord {
                severity: match issue.severity {
                    Severity::Warning => IssueSeverity::Warning,
                    Severity::Error => IssueSeverity::Error,
                    Severity::Critical => IssueSeverity::Critical,
                },
                message: issue.message,
                node_id: issue.node_id,
            })
            .collect(),
    })
}

impl BuiltGraph {
    pub fn to_response(&self) -> BuildResponse {
        BuildResponse {
            nodes: self.graph.nodes().map(NodeRecord::from).collect(),
            edges: self.graph.edges().iter().map(edge_to_record).collect(),
            neighbor_lists: self
                .neighbor_lists
                .iter()
                .map(|(id, list)| {
                    let records = list
                        .iter()
                        .map(|n| NeighborRecord {
                            id: n.id.clone(),
                            weight: n.similarity,
                        })
                        .collect();
                    (id.clone(), records)
                })
                .collect(),
            top_branches: self
                .top_branches
                .iter()
                .map(|b| TopBranchRecord {
                    label: b.label.clone(),
                    child_count: b.child_count,
                })
                .collect(),
            diagnostics: DiagnosticsRecord {
                dropped_invalid: self.diagnostics.dropped_invalid,
                capped_secondary: self.diagnostics.capped_secondary,
                orphans_repaired: self.diagnostics.orphans_repaired,
                fanout_cap: self.diagnostics.fanout_cap,
            },
        }
    }
}

impl From<&GraphNode> for NodeRecord {
    fn from(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            tier: node.tier.as_i8(),
            child_count: node.child_count,
        }
    }
}

impl TryFrom<&NodeRecord> for GraphNode {
    type Error = GraphError;

    fn try_from(record: &NodeRecord) -> Result<Self> {
        let tier = NodeTier::from_i8(record.tier).ok_or_else(|| GraphError::InvalidTier {
            id: record.id.clone(),
            tier: record.tier,
        })?;
        Ok(Self {
            id: record.id.clone(),
            tier,
            child_count: record.child_count,
        })
    }
}

fn nodes_from_records(records: &[NodeRecord]) -> Result<Vec<GraphNode>> {
    records.iter().map(GraphNode::try_from).collect()
}

fn edge_from_record(record: &EdgeRecord) -> GraphEdge {
    GraphEdge::new(record.source.clone(), record.target.clone(), record.weight)
}

fn edge_to_record(edge: &GraphEdge) -> EdgeRecord {
    EdgeRecord {
        source: edge.source.clone(),
        target: edge.target.clone(),
        weight: edge.weight,
    }
}

fn neighbor_lists_from_records(records: &BTreeMap<String, Vec<NeighborRecord>>) -> NeighborLists {
    records
        .iter()
        .map(|(id, list)| {
            let neighbors = list
                .iter()
                .map(|n| Neighbor {
                    id: n.id.clone(),
                    similarity: n.weight,
                })
                .collect();
            (id.clone(), neighbors)
        })
        .collect()
}
