use serde::{Deserialize, Serialize};

/// Unit indexed by the VP-Tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub embedding: Vec<f32>,
}

impl Point {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
        }
    }
}

/// Query hit: similarity is `1 - cosine distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    pub similarity: f32,
}
