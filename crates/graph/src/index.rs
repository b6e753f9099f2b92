use crate::error::{GraphError, Result};
use crate::types::{AnnotationItem, FileAnnotation};
use std::collections::{BTreeMap, HashMap};

/// A definition located in the index, with the record of its owning file
#[derive(Debug, Clone, Copy)]
pub struct Definition<'a> {
    pub path: &'a str,
    pub file: &'a FileAnnotation,
    pub item: &'a AnnotationItem,
}

/// Project-wide symbol index (file path -> analyzer output)
///
/// Built by the caller from the external analyzer. A [`crate::ContextAssembler`]
/// borrows it for a whole traversal, so a traversal always sees one snapshot.
#[derive(Debug, Default, Clone)]
pub struct SymbolIndex {
    /// File path -> annotation record, in path order
    files: BTreeMap<String, FileAnnotation>,

    /// Definition id -> owning file path
    definitions: HashMap<String, String>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `path`, returning the previous one.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        annotation: FileAnnotation,
    ) -> Result<Option<FileAnnotation>> {
        let path = path.into();
        if path.is_empty() {
            return Err(GraphError::EmptyPath);
        }

        let previous = self.files.insert(path.clone(), annotation);
        if previous.is_some() {
            self.rebuild_definitions();
        } else if let Some(annotation) = self.files.get(&path) {
            for item in annotation.definitions() {
                register_definition(&mut self.definitions, &item.id, &path);
            }
        }
        Ok(previous)
    }

    pub fn remove(&mut self, path: &str) -> Option<FileAnnotation> {
        let removed = self.files.remove(path);
        if removed.is_some() {
            self.rebuild_definitions();
        }
        removed
    }

    pub fn get(&self, path: &str) -> Option<&FileAnnotation> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All files in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileAnnotation)> {
        self.files.iter().map(|(path, fa)| (path.as_str(), fa))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Find the definition of `id` anywhere in the project.
    pub fn find_definition(&self, id: &str) -> Option<Definition<'_>> {
        let path = self.definitions.get(id)?;
        let (path, file) = self.files.get_key_value(path)?;
        file.definitions()
            .find(|item| item.id == id)
            .map(|item| Definition {
                path: path.as_str(),
                file,
                item,
            })
    }

    fn rebuild_definitions(&mut self) {
        self.definitions.clear();
        for (path, annotation) in &self.files {
            for item in annotation.definitions() {
                register_definition(&mut self.definitions, &item.id, path);
            }
        }
    }
}

fn register_definition(definitions: &mut HashMap<String, String>, id: &str, path: &str) {
    match definitions.get(id) {
        None => {
            definitions.insert(id.to_string(), path.to_string());
        }
        Some(owner) if owner.as_str() == path => {}
        Some(owner) => {
            // Lexicographically first path wins.
            if path < owner.as_str() {
                log::warn!("definition {id} in both {path} and {owner}, using {path}");
                definitions.insert(id.to_string(), path.to_string());
            } else {
                log::warn!("definition {id} in both {owner} and {path}, using {owner}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, SymbolKind};

    fn def(id: &str, line: i32) -> AnnotationItem {
        AnnotationItem {
            id: id.to_string(),
            kind: SymbolKind::Function,
            pos: Point::new(0, line),
            begin: Point::new(0, line),
            end: Point::new(0, line + 2),
            definition: true,
            ..Default::default()
        }
    }

    fn file(items: Vec<AnnotationItem>) -> FileAnnotation {
        FileAnnotation {
            items,
            ..Default::default()
        }
    }

    #[test]
    fn finds_definitions_across_files() {
        let mut index = SymbolIndex::new();
        index.insert("a.cpp", file(vec![def("A", 1)])).unwrap();
        index.insert("b.cpp", file(vec![def("B", 5)])).unwrap();

        let found = index.find_definition("B").expect("B defined");
        assert_eq!(found.path, "b.cpp");
        assert_eq!(found.item.begin.y, 5);
        assert!(index.find_definition("C").is_none());
    }

    #[test]
    fn declarations_are_not_definitions() {
        let mut decl = def("A", 1);
        decl.definition = false;
        let mut index = SymbolIndex::new();
        index.insert("a.h", file(vec![decl])).unwrap();
        assert!(index.find_definition("A").is_none());
    }

    #[test]
    fn replacing_a_file_drops_its_old_definitions() {
        let mut index = SymbolIndex::new();
        index.insert("a.cpp", file(vec![def("A", 1)])).unwrap();
        let previous = index.insert("a.cpp", file(vec![def("A2", 1)])).unwrap();

        assert!(previous.is_some());
        assert!(index.find_definition("A").is_none());
        assert!(index.find_definition("A2").is_some());

        index.remove("a.cpp");
        assert_eq!(index.definition_count(), 0);
    }

    #[test]
    fn duplicate_definitions_resolve_to_first_path() {
        let mut index = SymbolIndex::new();
        index.insert("z.cpp", file(vec![def("A", 1)])).unwrap();
        index.insert("m.cpp", file(vec![def("A", 9)])).unwrap();
        assert_eq!(index.find_definition("A").map(|d| d.path), Some("m.cpp"));
    }

    #[test]
    fn rejects_empty_path() {
        let mut index = SymbolIndex::new();
        assert!(matches!(
            index.insert("", FileAnnotation::default()),
            Err(GraphError::EmptyPath)
        ));
    }
}
