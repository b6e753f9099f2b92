use crate::aion_file::AionFile;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::resolve::PathResolver;
use aion_annotations::{update_links, AiFileInfo, Reconciliation};
use aion_graph::FileAnnotation;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

/// Every annotation document opened by this process, keyed by its path.
///
/// Documents are loaded on first use and stay cached. The map and each
/// document are locked separately, so a background thread can save while
/// another thread edits.
#[derive(Debug)]
pub struct AionIndex {
    resolver: PathResolver,
    files: RwLock<HashMap<PathBuf, Arc<Mutex<AionFile>>>>,
}

impl AionIndex {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver: PathResolver::new(config),
            files: RwLock::new(HashMap::new()),
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &StoreConfig {
        self.resolver.config()
    }

    pub fn resolve_aion_file_path(&self, source: &Path) -> Result<PathBuf> {
        self.resolver.resolve_aion_file_path(source)
    }

    /// Document owning `source`, loaded from disk on first use.
    pub fn resolve(&self, source: &Path) -> Result<Arc<Mutex<AionFile>>> {
        let path = self.resolver.resolve_aion_file_path(source)?;
        self.open(path)
    }

    fn open(&self, path: PathBuf) -> Result<Arc<Mutex<AionFile>>> {
        if let Some(file) = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path)
        {
            return Ok(Arc::clone(file));
        }

        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = files.get(&path) {
            return Ok(Arc::clone(file));
        }
        let mut file = AionFile::new(&path);
        file.load()?;
        let file = Arc::new(Mutex::new(file));
        files.insert(path, Arc::clone(&file));
        Ok(file)
    }

    /// Reconcile the stored record of `source` against fresh analyzer output.
    pub fn update_links(&self, source: &Path, fresh: &FileAnnotation) -> Result<Reconciliation> {
        let result = self.with_file_info(source, |info| update_links(info, fresh))?;
        log::debug!(
            "{}: {} links, {} orphans",
            source.display(),
            result.links.len(),
            result.orphans.len()
        );
        Ok(result)
    }

    /// Run `f` on the record of `source`, creating it if needed. The owning
    /// document is marked for saving when the record was created or `f`
    /// changed it.
    pub fn with_file_info<R>(
        &self,
        source: &Path,
        f: impl FnOnce(&mut AiFileInfo) -> R,
    ) -> Result<R> {
        let (path, key) = self.resolver.document_key(source)?;
        let file = self.open(path)?;
        let mut file = lock(&file);

        let before = file.file_info(&key).cloned();
        let info = file.realize_path(&key);
        let result = f(&mut *info);
        if before.as_ref() != Some(&*info) {
            file.post_save();
        }
        Ok(result)
    }

    /// Run `f` on the stored record of `source`, `None` when there is none.
    /// Nothing is created and the document is not marked for saving.
    pub fn read_file_info<R>(
        &self,
        source: &Path,
        f: impl FnOnce(Option<&AiFileInfo>) -> R,
    ) -> Result<R> {
        let (path, key) = self.resolver.document_key(source)?;
        let file = self.open(path)?;
        let file = lock(&file);
        Ok(f(file.file_info(&key)))
    }

    /// Save documents whose last change is at least `delay` old.
    /// Returns how many were written.
    pub fn save_due(&self, delay: Duration) -> Result<usize> {
        self.save_each(|file| file.save_if_due(delay))
    }

    /// Save every loaded document that changed since it was last written.
    pub fn save_all(&self) -> Result<usize> {
        self.save_each(AionFile::save)
    }

    /// Paths of the loaded documents, sorted
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    // Every document is attempted; the first failure is returned.
    fn save_each(&self, mut save: impl FnMut(&mut AionFile) -> Result<bool>) -> Result<usize> {
        let files: Vec<Arc<Mutex<AionFile>>> = self
            .files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut written = 0;
        let mut first_error = None;
        for file in files {
            let mut file = lock(&file);
            match save(&mut *file) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(err) => {
                    log::warn!("failed to save {}: {err}", file.path().display());
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(written),
        }
    }
}

fn lock(file: &Mutex<AionFile>) -> MutexGuard<'_, AionFile> {
    file.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn sources_in_one_package_share_a_document() {
        let tmp = tempdir().unwrap();
        let index = AionIndex::new(
            StoreConfig::default()
                .with_ai_root(tmp.path().join(".ai"))
                .with_include_root(tmp.path().join("src")),
        )
        .unwrap();

        let a = index.resolve(&tmp.path().join("src/pkg/a.cpp")).unwrap();
        let b = index.resolve(&tmp.path().join("src/pkg/b.cpp")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(
            index.loaded_paths(),
            vec![tmp.path().join(".ai").join("pkg").join("AI.json")]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(AionIndex::new(StoreConfig::default().with_ai_root("relative")).is_err());
    }

    #[test]
    fn file_info_edits_mark_the_document_dirty() {
        let tmp = tempdir().unwrap();
        let index = AionIndex::new(StoreConfig::default()).unwrap();
        let source = tmp.path().join("a.cpp");

        let len = index.with_file_info(&source, |info| info.len()).unwrap();

        assert_eq!(len, 0);
        let file = index.resolve(&source).unwrap();
        assert!(lock(&file).is_dirty());
        assert!(lock(&file).file_info("a.cpp").is_some());
    }

    #[test]
    fn reads_leave_the_document_clean() {
        let tmp = tempdir().unwrap();
        let index = AionIndex::new(StoreConfig::default()).unwrap();
        let source = tmp.path().join("a.cpp");

        let missing = index.read_file_info(&source, |info| info.is_none()).unwrap();
        assert!(missing);
        let file = index.resolve(&source).unwrap();
        assert!(!lock(&file).is_dirty());
        assert_eq!(lock(&file).file_count(), 0);

        index.with_file_info(&source, |_| ()).unwrap();
        assert_eq!(index.save_all().unwrap(), 1);

        let len = index.with_file_info(&source, |info| info.len()).unwrap();
        assert_eq!(len, 0);
        let count = index.read_file_info(&source, |info| info.map(AiFileInfo::len)).unwrap();
        assert_eq!(count, Some(0));
        assert!(!lock(&file).is_dirty());
        assert_eq!(index.save_due(Duration::ZERO).unwrap(), 0);
    }

    #[test]
    fn save_due_respects_the_delay() {
        let tmp = tempdir().unwrap();
        let index = AionIndex::new(StoreConfig::default()).unwrap();
        index
            .with_file_info(&tmp.path().join("a.cpp"), |_| ())
            .unwrap();

        assert_eq!(index.save_due(Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(index.save_due(Duration::ZERO).unwrap(), 1);
        assert!(tmp.path().join("AI.json").exists());
        assert_eq!(index.save_all().unwrap(), 0);
    }
}
