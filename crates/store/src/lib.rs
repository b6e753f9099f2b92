//! # Aion Store
//!
//! Persistence for symbol annotations.
//!
//! ```text
//! source file
//!     │
//!     └──> PathResolver
//!            ├─ package dir: nearest ancestor with a marker file
//!            └─ document:    <ai_root>/<dir under include root>/AI.json
//!
//! AionIndex (document path -> AionFile, loaded lazily)
//!     │
//!     └──> AionFile (relative source path -> AiFileInfo)
//!            └─ save: digest check, file lock, temp file + rename
//! ```

mod aion_file;
mod config;
mod error;
mod index;
mod lock;
mod resolve;
mod roots;

pub use aion_file::AionFile;
pub use config::{StoreConfig, DEFAULT_FILE_NAME};
pub use error::{Result, StoreError};
pub use index::AionIndex;
pub use resolve::PathResolver;
pub use roots::{normalize, to_key};
