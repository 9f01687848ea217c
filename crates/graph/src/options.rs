use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIMARY_BRANCHES: usize = 20;
pub const DEFAULT_MAX_CHILDREN_PER_NODE: usize = 15;
pub const DEFAULT_SECONDARY_SEARCH_K: usize = 20;
pub const DEFAULT_NEIGHBOR_LIST_LEN: usize = 5;
pub const DEFAULT_TOP_BRANCHES_LEN: usize = 10;

/// Tunables for a single build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Candidates attached directly to root
    pub primary_branches: usize,

    /// Fan-out cap for secondary placement
    pub max_children_per_node: usize,

    /// Neighbors fetched per secondary item
    pub secondary_search_k: usize,

    /// Entries kept per neighbor list
    pub neighbor_list_len: usize,

    /// Entries in the diagnostic top-branches list
    pub top_branches_len: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            primary_branches: DEFAULT_PRIMARY_BRANCHES,
            max_children_per_node: DEFAULT_MAX_CHILDREN_PER_NODE,
            secondary_search_k: DEFAULT_SECONDARY_SEARCH_K,
            neighbor_list_len: DEFAULT_NEIGHBOR_LIST_LEN,
            top_branches_len: DEFAULT_TOP_BRANCHES_LEN,
        }
    }
}

impl BuildOptions {
    #[must_use]
    pub fn with_primary_branches(mut self, primary_branches: usize) -> Self {
        self.primary_branches = primary_branches;
        self
    }

    #[must_use]
    pub fn with_max_children(mut self, max_children_per_node: usize) -> Self {
        self.max_children_per_node = max_children_per_node;
        self
    }

    #[must_use]
    pub fn with_search_k(mut self, secondary_search_k: usize) -> Self {
        self.secondary_search_k = secondary_search_k;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_children_per_node == 0 {
            return Err(GraphError::InvalidOptions(
                "max_children_per_node must be at least 1".to_string(),
            ));
        }
        if self.secondary_search_k == 0 {
            return Err(GraphError::InvalidOptions(
                "secondary_search_k must be at least 1".to_string(),
            ));
        }
        if self.neighbor_list_len == 0 {
            return Err(GraphError::InvalidOptions(
                "neighbor_list_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
