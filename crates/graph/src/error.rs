use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Root node not found in supplied node set")]
    RootNotFound,

    #[error("Expected exactly one root node, found {0}")]
    MultipleRoots(usize),

    #[error("Invalid tier {tier} for node {id}")]
    InvalidTier { id: String, tier: i8 },

    #[error("Invalid build options: {0}")]
    InvalidOptions(String),
}
