use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("File path must not be empty")]
    EmptyPath,
}

/// Why the assembler gave up on one branch of a traversal.
///
/// These never abort a traversal; they are recorded inline as sentinel
/// entries so the caller sees exactly where the slice stops.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TraversalFailure {
    #[error("file not indexed: {file}")]
    FileNotIndexed { file: String },

    #[error("id not found: {id}")]
    IdNotFound { id: String },
}
