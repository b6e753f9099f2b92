use crate::error::{AnnotationError, Result};
use crate::item::AiAnnotationItem;
use serde::{Deserialize, Serialize};

/// Stored annotations of one source file
///
/// Items are only appended by [`crate::update_links`]; comments are edited
/// through [`AiFileInfo::item_mut`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiFileInfo {
    #[serde(default)]
    pub(crate) items: Vec<AiAnnotationItem>,
}

impl AiFileInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[AiAnnotationItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&AiAnnotationItem> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Result<&mut AiAnnotationItem> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(AnnotationError::ItemOutOfRange { index, len })
    }

    /// Index of the first item whose line span contains `line`
    pub fn item_at_line(&self, line: i32) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.annotation.contains_line(line))
    }

    pub fn comment_count(&self) -> usize {
        self.items.iter().map(|item| item.comments().len()).sum()
    }

    /// Drop the given orphaned items that carry no comments.
    ///
    /// `orphans` are indices reported by [`crate::Reconciliation::orphans`] for
    /// this file; indices of later items shift down. Returns how many were
    /// removed.
    pub fn prune_orphans(&mut self, orphans: &[usize]) -> usize {
        let mut doomed: Vec<usize> = orphans
            .iter()
            .copied()
            .filter(|&i| self.items.get(i).is_some_and(|item| !item.has_comments()))
            .collect();
        doomed.sort_unstable();
        doomed.dedup();
        for &index in doomed.iter().rev() {
            self.items.remove(index);
        }
        if !doomed.is_empty() {
            log::debug!("pruned {} uncommented orphans", doomed.len());
        }
        doomed.len()
    }
}
