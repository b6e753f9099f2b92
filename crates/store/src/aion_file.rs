use crate::error::{Result, StoreError};
use crate::lock::acquire_save_lock;
use aion_annotations::AiFileInfo;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    files: BTreeMap<String, AiFileInfo>,
}

/// One on-disk annotation document: relative source path -> file record.
///
/// Loading is explicit and saving is driven by the caller: mutations call
/// [`AionFile::post_save`], and a periodic [`AionFile::save_if_due`] writes
/// once the document has been quiet long enough.
#[derive(Debug)]
pub struct AionFile {
    path: PathBuf,
    document: Document,
    loaded: bool,
    last_change: Option<Instant>,
    saved_digest: Option<[u8; 32]>,
}

impl AionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Document::default(),
            loaded: false,
            last_change: None,
            saved_digest: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the in-memory records with the document on disk.
    /// A missing document loads as empty.
    pub fn load(&mut self) -> Result<()> {
        self.document = match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(err) => return Err(err.into()),
        };
        self.saved_digest = if self.path.exists() {
            Some(digest(&self.serialize()?))
        } else {
            None
        };
        self.loaded = true;
        self.last_change = None;

        log::info!(
            "loaded {} ({} files)",
            self.path.display(),
            self.document.files.len()
        );
        Ok(())
    }

    /// Write the document if it differs from what was last loaded or saved.
    /// Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool> {
        self.write(false)
    }

    /// Write the document even when it is unchanged.
    pub fn force_save(&mut self) -> Result<()> {
        self.write(true).map(|_| ())
    }

    fn write(&mut self, force: bool) -> Result<bool> {
        let bytes = self.serialize()?;
        let current = digest(&bytes);
        if !force && self.saved_digest == Some(current) && self.path.exists() {
            self.last_change = None;
            return Ok(false);
        }

        let parent = self.path.parent().ok_or_else(|| {
            StoreError::InvalidPath(format!("{} has no parent", self.path.display()))
        })?;
        std::fs::create_dir_all(parent)?;

        let _lock = acquire_save_lock(&self.path)?;
        let tmp = tmp_path_for(&self.path);
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;

        self.saved_digest = Some(current);
        self.last_change = None;
        log::info!("saved {} ({} bytes)", self.path.display(), bytes.len());
        Ok(true)
    }

    /// Drop every record in memory. The document on disk is untouched until
    /// the next save.
    pub fn clear(&mut self) {
        self.document.files.clear();
    }

    /// Record that the document changed and should be written soon.
    pub fn post_save(&mut self) {
        self.last_change = Some(Instant::now());
    }

    pub fn is_dirty(&self) -> bool {
        self.last_change.is_some()
    }

    /// Save when the last recorded change is at least `delay` old.
    pub fn save_if_due(&mut self, delay: Duration) -> Result<bool> {
        match self.last_change {
            Some(changed) if changed.elapsed() >= delay => self.save(),
            _ => Ok(false),
        }
    }

    /// Record for `rel_path`, created empty on first use.
    pub fn realize_path(&mut self, rel_path: &str) -> &mut AiFileInfo {
        self.document.files.entry(rel_path.to_string()).or_default()
    }

    pub fn file_info(&self, rel_path: &str) -> Option<&AiFileInfo> {
        self.document.files.get(rel_path)
    }

    pub fn file_info_mut(&mut self, rel_path: &str) -> Option<&mut AiFileInfo> {
        self.document.files.get_mut(rel_path)
    }

    /// Records in key order
    pub fn files(&self) -> impl Iterator<Item = (&str, &AiFileInfo)> {
        self.document
            .files
            .iter()
            .map(|(path, info)| (path.as_str(), info))
    }

    pub fn file_count(&self) -> usize {
        self.document.files.len()
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.document)?)
    }
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_graph::{AnnotationItem, FileAnnotation, Point};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn annotate(file: &mut AionFile, rel: &str) {
        let info = file.realize_path(rel);
        aion_annotations::update_links(
            info,
            &FileAnnotation {
                items: vec![AnnotationItem {
                    id: "run".to_string(),
                    begin: Point::new(0, 3),
                    end: Point::new(1, 9),
                    definition: true,
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        info.item_mut(0).unwrap().add_comment(1, "entry point", "  init();");
        file.post_save();
    }

    #[test]
    fn missing_document_loads_empty() {
        let tmp = tempdir().unwrap();
        let mut file = AionFile::new(tmp.path().join("AI.json"));

        file.load().unwrap();

        assert!(file.is_loaded());
        assert_eq!(file.file_count(), 0);
        assert!(!file.is_dirty());
    }

    #[test]
    fn round_trip_preserves_comments() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(".ai").join("pkg").join("AI.json");
        let mut file = AionFile::new(&path);
        annotate(&mut file, "sub/a.cpp");

        assert!(file.save().unwrap());
        assert!(!file.is_dirty());

        let mut reloaded = AionFile::new(&path);
        reloaded.load().unwrap();
        let info = reloaded.file_info("sub/a.cpp").unwrap();
        assert_eq!(info.items()[0].comments()[0].text, "entry point");
        assert_eq!(info, file.file_info("sub/a.cpp").unwrap());
    }

    #[test]
    fn unchanged_document_is_not_rewritten() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("AI.json");
        let mut file = AionFile::new(&path);
        annotate(&mut file, "a.cpp");
        assert!(file.save().unwrap());

        let mut reloaded = AionFile::new(&path);
        reloaded.load().unwrap();
        reloaded.realize_path("a.cpp");
        assert!(!reloaded.save().unwrap());

        reloaded.realize_path("b.cpp");
        assert!(reloaded.save().unwrap());
    }

    #[test]
    fn on_disk_layout_uses_short_keys() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("AI.json");
        let mut file = AionFile::new(&path);
        annotate(&mut file, "a.cpp");
        file.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let item = &raw["files"]["a.cpp"]["items"][0];
        assert_eq!(item["a"]["id"], "run");
        assert_eq!(item["c"][0]["l"], 1);
        assert_eq!(item["c"][0]["s"], "entry point");
        assert!(item["c"][0]["h"].is_i64());
    }

    #[test]
    fn save_waits_for_the_quiet_period() {
        let tmp = tempdir().unwrap();
        let mut file = AionFile::new(tmp.path().join("AI.json"));
        annotate(&mut file, "a.cpp");

        assert!(!file.save_if_due(Duration::from_secs(3600)).unwrap());
        assert!(file.is_dirty());
        assert!(file.save_if_due(Duration::ZERO).unwrap());
        assert!(!file.is_dirty());
    }

    #[test]
    fn corrupt_document_is_reported() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("AI.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AionFile::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::JsonError(_)));
    }

    #[test]
    fn clear_then_save_writes_an_empty_document() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("AI.json");
        let mut file = AionFile::new(&path);
        annotate(&mut file, "a.cpp");
        file.save().unwrap();

        file.clear();
        assert!(file.save().unwrap());

        let mut reloaded = AionFile::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.file_count(), 0);
    }
}
