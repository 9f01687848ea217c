use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROTOCOL_SCHEMA_VERSION: u32 = 1;

pub const TIER_ROOT: i8 = -1;
pub const TIER_PRIMARY: i8 = 1;
pub const TIER_SECONDARY: i8 = 2;

/// Candidate item as delivered by the fetch layer; the embedding is still raw JSON.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    pub raw_embedding: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub root_id: String,
    pub root_embedding: Vec<f32>,
    #[serde(default)]
    pub candidates: Vec<CandidateRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_branches: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    /// -1 root, 1 primary, 2 secondary.
    pub tier: i8,
    #[serde(default)]
    pub child_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct NeighborRecord {
    pub id: String,
    pub weight: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopBranchRecord {
    pub label: String,
    pub child_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    pub dropped_invalid: usize,
    pub capped_secondary: usize,
    pub orphans_repaired: usize,
    pub fanout_cap: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub neighbor_lists: BTreeMap<String, Vec<NeighborRecord>>,
    pub top_branches: Vec<TopBranchRecord>,
    pub diagnostics: BuildDiagnostics,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectRequest {
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub hidden_ids: Vec<String>,
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub neighbor_lists: BTreeMap<String, Vec<NeighborRecord>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ReconnectResponse {
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ValidateRequest {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub hidden_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssueRecord {
    pub severity: IssueSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ValidateResponse {
    pub healthy: bool,
    pub issues: Vec<ValidationIssueRecord>,
}

/// JSON Schemas for every request/response pair, keyed by type name.
pub fn schemas() -> serde_json::Value {
    serde_json::json!({
        "schema_version": PROTOCOL_SCHEMA_VERSION,
        "BuildRequest": schemars::schema_for!(BuildRequest),
        "BuildResponse": schemars::schema_for!(BuildResponse),
        "ReconnectRequest": schemars::schema_for!(ReconnectRequest),
        "ReconnectResponse": schemars::schema_for!(ReconnectResponse),
        "ValidateRequest": schemars::schema_for!(ValidateRequest),
        "ValidateResponse": schemars::schema_for!(ValidateResponse),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_request_uses_camel_case() {
        let raw = r#"{
            "rootId": "resume",
            "rootEmbedding": [1.0, 0.0],
            "candidates": [{"id": "job-1", "rawEmbedding": "[0.5, 0.5]"}],
            "primaryBranches": 3
        }"#;
        let request: BuildRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.root_id, "resume");
        assert_eq!(request.candidates[0].raw_embedding, "[0.5, 0.5]");
        assert_eq!(request.primary_branches, Some(3));
    }

    #[test]
    fn reconnect_request_defaults_optional_fields() {
        let raw = r#"{"edges": [], "nodes": [{"id": "r", "tier": -1}]}"#;
        let request: ReconnectRequest = serde_json::from_str(raw).unwrap();
        assert!(request.hidden_ids.is_empty());
        assert!(request.neighbor_lists.is_empty());
        assert_eq!(request.nodes[0].child_count, 0);
    }

    #[test]
    fn schemas_cover_every_request() {
        let value = schemas();
        for key in ["BuildRequest", "ReconnectRequest", "ValidateRequest"] {
            assert!(value.get(key).is_some(), "missing schema {key}");
        }
    }
}
