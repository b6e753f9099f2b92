use thiserror::Error;

/// Result type for annotation editing
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Errors raised by editor actions on stored annotations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Annotation item {index} out of range (file has {len})")]
    ItemOutOfRange { index: usize, len: usize },

    #[error("Comment {index} out of range (item has {len})")]
    CommentOutOfRange { index: usize, len: usize },
}
