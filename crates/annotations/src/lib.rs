//! # Aion Annotations
//!
//! Comments attached to symbol occurrences, carried across re-analysis.
//!
//! ```text
//! FileAnnotation (fresh analyzer output)
//!     │
//!     └──> update_links(stored, fresh)
//!            ├─ exact pass:  identical anchors
//!            ├─ fuzzy pass:  same symbol, overlapping lines
//!            ├─ new symbols: appended without comments
//!            └─ orphans:     kept as they were, reported
//! ```
//!
//! Comment positions are relative to their owner's first line, so a symbol
//! that moves keeps its comments in place relative to its body.

mod comment;
mod error;
mod file_info;
mod item;
mod overlay;
mod reconcile;

pub use comment::{line_hash, Comment};
pub use error::{AnnotationError, Result};
pub use file_info::AiFileInfo;
pub use item::AiAnnotationItem;
pub use overlay::{overlay_comments, Overlay};
pub use reconcile::{update_links, LinkKind, Reconciliation};
