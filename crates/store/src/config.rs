use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_FILE_NAME: &str = "AI.json";

/// Where annotation documents live and how source paths map onto them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory trees mirroring the source tree, in preference order
    pub ai_roots: Vec<PathBuf>,

    /// Project roots the source tree is mirrored from
    pub include_roots: Vec<PathBuf>,

    /// Compiler include directories; used to place packages that live under
    /// no include root
    pub extra_include_dirs: Vec<PathBuf>,

    /// File names marking a package directory (e.g. "Cargo.toml").
    /// A source file belongs to the nearest ancestor holding one of them;
    /// empty means every directory is its own package.
    pub package_markers: Vec<String>,

    /// Name of the annotation document inside a package's mirror directory
    pub file_name: String,

    /// Quiet period before a changed document is written
    pub save_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ai_roots: Vec::new(),
            include_roots: Vec::new(),
            extra_include_dirs: Vec::new(),
            package_markers: Vec::new(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            save_delay_ms: 1_000,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn with_ai_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.ai_roots.push(root.into());
        self
    }

    pub fn with_include_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.include_roots.push(root.into());
        self
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "file_name must not be empty".to_string(),
            ));
        }
        if self.file_name.contains(|c: char| c == '/' || c == '\\') {
            return Err(StoreError::InvalidConfig(format!(
                "file_name ({}) must be a bare file name",
                self.file_name
            )));
        }

        let roots = self
            .ai_roots
            .iter()
            .chain(&self.include_roots)
            .chain(&self.extra_include_dirs);
        for root in roots {
            if !root.is_absolute() {
                return Err(StoreError::InvalidConfig(format!(
                    "root {} must be absolute",
                    root.display()
                )));
            }
        }

        if self.package_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(StoreError::InvalidConfig(
                "package_markers must not contain empty names".to_string(),
            ));
        }

        Ok(())
    }
}
