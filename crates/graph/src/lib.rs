//! # Aion Graph
//!
//! Symbol index and cross-reference context assembly for LLM prompts.
//!
//! ## Architecture
//!
//! ```text
//! External analyzer
//!     │
//!     └──> SymbolIndex (file path -> FileAnnotation)
//!            ├─ items:  declarations and definitions
//!            ├─ locals: function-local symbols
//!            └─ refs:   use sites -> declaration sites
//!
//! Seed range (file, begin..end)
//!     │
//!     └──> ContextAssembler (depth-first, per session)
//!            ├─ Definitions: descend into the body
//!            ├─ Declarations: jump to the definition anywhere in the index
//!            ├─ References: follow each distinct edge once
//!            └─ ContextSlice (ordered, deduplicated, bounded)
//! ```
//!
//! ## Example
//!
//! ```
//! use aion_graph::{AnnotationItem, ContextAssembler, FileAnnotation, Point, SymbolIndex};
//!
//! let fa = FileAnnotation {
//!     items: vec![AnnotationItem {
//!         id: "main".to_string(),
//!         begin: Point::new(0, 0),
//!         end: Point::new(1, 3),
//!         definition: true,
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//! let mut index = SymbolIndex::new();
//! index.insert("main.cpp", fa.clone()).unwrap();
//!
//! let mut assembler = ContextAssembler::new(&index);
//! assembler.begin();
//! assembler.visit("main.cpp", &fa, Point::new(0, 0), Point::new(0, 3));
//! assert_eq!(assembler.entries().len(), 1);
//! ```

mod assembler;
mod error;
mod index;
mod types;

pub use assembler::{
    CancellationToken, ContextAssembler, ContextEntry, ContextSlice, EntryPayload,
    DEFAULT_PROMPT_LIMIT,
};
pub use error::{GraphError, Result, TraversalFailure};
pub use index::{Definition, SymbolIndex};
pub use types::{AnnotationItem, FileAnnotation, Point, ReferenceItem, SymbolKind};
