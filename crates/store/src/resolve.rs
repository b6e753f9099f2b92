use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::roots::{containing_roots, nearest_root, normalize, relative_to, to_key};
use std::path::{Path, PathBuf};

/// Maps source files onto the annotation documents that own them.
///
/// Resolution reads the filesystem (marker files, existing documents) but
/// never writes to it.
#[derive(Debug, Clone)]
pub struct PathResolver {
    config: StoreConfig,
}

impl PathResolver {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Document path for a source file.
    pub fn resolve_aion_file_path(&self, source: &Path) -> Result<PathBuf> {
        let package_dir = self.package_dir(source)?;
        Ok(self.aion_path_for_dir(&package_dir))
    }

    /// Nearest ancestor of `source` holding a package marker, else the
    /// directory of `source`.
    pub fn package_dir(&self, source: &Path) -> Result<PathBuf> {
        let source = normalize(source);
        let dir = source
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                StoreError::InvalidPath(format!("{} has no parent directory", source.display()))
            })?;

        if self.config.package_markers.is_empty() {
            return Ok(dir.to_path_buf());
        }
        let package = dir.ancestors().find(|candidate| {
            self.config
                .package_markers
                .iter()
                .any(|marker| candidate.join(marker).is_file())
        });
        Ok(package.unwrap_or(dir).to_path_buf())
    }

    /// Document path for a package directory.
    ///
    /// 1. a mirror of `dir` under an AI root that already exists, trying each
    ///    include root containing `dir` against each AI root;
    /// 2. the first such mirror even if absent;
    /// 3. `dir` relative to its nearest extra include directory, placed
    ///    under the first AI root;
    /// 4. a document next to the sources.
    pub fn aion_path_for_dir(&self, dir: &Path) -> PathBuf {
        let dir = normalize(dir);
        let file_name = self.config.file_name.as_str();

        if let Some(first_ai_root) = self.config.ai_roots.first() {
            let mut first_candidate = None;
            for rel in containing_roots(&dir, &self.config.include_roots) {
                for ai_root in &self.config.ai_roots {
                    let candidate = ai_root.join(&rel).join(file_name);
                    if candidate.is_file() {
                        log::debug!("{} maps to existing {}", dir.display(), candidate.display());
                        return candidate;
                    }
                    first_candidate.get_or_insert(candidate);
                }
            }
            if let Some(candidate) = first_candidate {
                return candidate;
            }

            if let Some((include_dir, rel)) = nearest_root(&dir, &self.config.extra_include_dirs) {
                log::debug!(
                    "{} is outside every include root; placing it via {}",
                    dir.display(),
                    include_dir.display()
                );
                return first_ai_root.join(rel).join(file_name);
            }
        }

        dir.join(file_name)
    }

    /// Document path for a source file together with the key its record is
    /// stored under.
    pub fn document_key(&self, source: &Path) -> Result<(PathBuf, String)> {
        let package_dir = self.package_dir(source)?;
        let document = self.aion_path_for_dir(&package_dir);
        let base = self.key_base(&document, &package_dir);
        let key = self.relative_key(&base, source);
        Ok((document, key))
    }

    /// Directory the keys of `document` are relative to.
    ///
    /// A document mirrored under an AI root can be shared by same-named
    /// packages of several include roots. Its base is then the mirror
    /// directory of the first include root, in configuration order, that
    /// exists or is `package_dir` itself. Other documents use `package_dir`.
    /// The result depends on configuration and the filesystem only, never on
    /// which source opened the document first.
    pub fn key_base(&self, document: &Path, package_dir: &Path) -> PathBuf {
        let package_dir = normalize(package_dir);
        let Some(rel) = document
            .parent()
            .and_then(|dir| nearest_root(dir, &self.config.ai_roots))
            .map(|(_, rel)| rel)
        else {
            return package_dir;
        };
        self.config
            .include_roots
            .iter()
            .map(|root| normalize(&root.join(&rel)))
            .find(|base| *base == package_dir || base.is_dir())
            .unwrap_or(package_dir)
    }

    /// Key of `source` inside a document whose keys are relative to `base`:
    /// `/` separators, `..` segments when `source` lies outside `base`, and
    /// the absolute path without its root when the two share no anchor.
    pub fn relative_key(&self, base: &Path, source: &Path) -> String {
        match relative_to(source, base) {
            Some(rel) => to_key(&rel),
            None => to_key(&normalize(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn resolver(ai_roots: &[&str], include_roots: &[&str]) -> PathResolver {
        PathResolver::new(StoreConfig {
            ai_roots: ai_roots.iter().map(PathBuf::from).collect(),
            include_roots: include_roots.iter().map(PathBuf::from).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn mirrors_include_root_into_ai_root() {
        let resolver = resolver(&["/proj/.ai"], &["/proj/src"]);
        assert_eq!(
            resolver.aion_path_for_dir(Path::new("/proj/src/pkg")),
            PathBuf::from("/proj/.ai/pkg/AI.json")
        );
    }

    #[test]
    fn prefers_an_existing_document_in_a_later_ai_root() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let first = tmp.path().join("ai-a");
        let second = tmp.path().join("ai-b");
        fs::create_dir_all(second.join("pkg")).unwrap();
        fs::write(second.join("pkg").join("AI.json"), "{}").unwrap();

        let resolver = PathResolver::new(StoreConfig {
            ai_roots: vec![first, second.clone()],
            include_roots: vec![src.clone()],
            ..Default::default()
        });

        assert_eq!(
            resolver.aion_path_for_dir(&src.join("pkg")),
            second.join("pkg").join("AI.json")
        );
    }

    #[test]
    fn falls_back_to_extra_include_dirs() {
        let resolver = PathResolver::new(StoreConfig {
            ai_roots: vec![PathBuf::from("/proj/.ai"), PathBuf::from("/other/.ai")],
            include_roots: vec![PathBuf::from("/proj/src")],
            extra_include_dirs: vec![PathBuf::from("/usr"), PathBuf::from("/usr/include")],
            ..Default::default()
        });
        assert_eq!(
            resolver.aion_path_for_dir(Path::new("/usr/include/zlib")),
            PathBuf::from("/proj/.ai/zlib/AI.json")
        );
    }

    #[test]
    fn without_ai_roots_documents_sit_next_to_sources() {
        let resolver = resolver(&[], &["/proj/src"]);
        assert_eq!(
            resolver.aion_path_for_dir(Path::new("/proj/src/pkg")),
            PathBuf::from("/proj/src/pkg/AI.json")
        );
    }

    #[test]
    fn unrelated_dir_gets_a_dummy_document() {
        let resolver = resolver(&["/proj/.ai"], &["/proj/src"]);
        assert_eq!(
            resolver.aion_path_for_dir(Path::new("/elsewhere/pkg")),
            PathBuf::from("/elsewhere/pkg/AI.json")
        );
    }

    #[test]
    fn package_dir_walks_up_to_the_marker() {
        let tmp = tempdir().unwrap();
        let pkg = tmp.path().join("pkg");
        fs::create_dir_all(pkg.join("sub")).unwrap();
        fs::write(pkg.join("pkg.toml"), "").unwrap();

        let resolver = PathResolver::new(StoreConfig {
            package_markers: vec!["pkg.toml".to_string()],
            ..Default::default()
        });

        assert_eq!(resolver.package_dir(&pkg.join("sub").join("a.cpp")).unwrap(), pkg);
        assert_eq!(
            resolver.relative_key(&pkg, &pkg.join("sub").join("a.cpp")),
            "sub/a.cpp"
        );
    }

    #[test]
    fn package_dir_defaults_to_the_parent() {
        let resolver = resolver(&[], &[]);
        assert_eq!(
            resolver.package_dir(Path::new("/proj/src/pkg/a.cpp")).unwrap(),
            PathBuf::from("/proj/src/pkg")
        );
        assert!(resolver.package_dir(Path::new("a.cpp")).is_err());
    }

    #[test]
    fn relative_key_climbs_out_of_the_base() {
        let resolver = resolver(&["/proj/.ai"], &["/proj/src"]);
        assert_eq!(
            resolver.relative_key(Path::new("/proj/src/pkg"), Path::new("/proj/src/lib/x.h")),
            "../lib/x.h"
        );
        assert_eq!(
            resolver.relative_key(Path::new("/proj/src/pkg"), Path::new("lib/x.h")),
            "lib/x.h"
        );
    }

    #[test]
    fn mirrored_packages_share_a_base_in_configuration_order() {
        let tmp = tempdir().unwrap();
        let (src, lib) = (tmp.path().join("src"), tmp.path().join("lib"));
        fs::create_dir_all(src.join("pkg")).unwrap();
        fs::create_dir_all(lib.join("pkg")).unwrap();
        let resolver = PathResolver::new(StoreConfig {
            ai_roots: vec![tmp.path().join(".ai")],
            include_roots: vec![src.clone(), lib.clone()],
            ..Default::default()
        });

        let (doc_src, key_src) = resolver.document_key(&src.join("pkg/a.cpp")).unwrap();
        let (doc_lib, key_lib) = resolver.document_key(&lib.join("pkg/a.cpp")).unwrap();

        assert_eq!(doc_src, doc_lib);
        assert_eq!(key_src, "a.cpp");
        assert_eq!(key_lib, "../../lib/pkg/a.cpp");
    }

    #[test]
    fn package_without_a_first_root_mirror_keys_from_itself() {
        let tmp = tempdir().unwrap();
        let (src, lib) = (tmp.path().join("src"), tmp.path().join("lib"));
        fs::create_dir_all(lib.join("only")).unwrap();
        let resolver = PathResolver::new(StoreConfig {
            ai_roots: vec![tmp.path().join(".ai")],
            include_roots: vec![src, lib.clone()],
            ..Default::default()
        });

        let (_, key) = resolver.document_key(&lib.join("only/x.cpp")).unwrap();
        assert_eq!(key, "x.cpp");
    }
}
