use crate::file_info::AiFileInfo;
use crate::item::AiAnnotationItem;
use aion_graph::{AnnotationItem, FileAnnotation};
use serde::Serialize;

/// How a fresh item found its stored wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Identical anchor
    Exact,

    /// Same symbol with a moved or resized line span
    Fuzzy,

    /// No stored wrapper; a new one was appended
    Created,
}

/// Outcome of [`update_links`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Fresh item index -> stored index it was matched to, `None` when new
    pub links: Vec<Option<usize>>,

    /// Fresh item index -> how it was linked
    pub kinds: Vec<LinkKind>,

    /// Fresh item index -> index of its wrapper after the call
    pub wrappers: Vec<usize>,

    /// Stored items no fresh item matched. They are kept as they were.
    pub orphans: Vec<usize>,
}

impl Reconciliation {
    pub fn count(&self, kind: LinkKind) -> usize {
        self.kinds.iter().filter(|&&k| k == kind).count()
    }

    /// Nothing was created and nothing orphaned
    pub fn is_stable(&self) -> bool {
        self.orphans.is_empty() && !self.kinds.contains(&LinkKind::Created)
    }
}

/// Carry stored annotations forward onto a fresh analysis of the same file.
///
/// An empty `stored` adopts `fresh.items` one to one. Otherwise fresh items
/// are paired with stored wrappers greedily, first by exact identity, then by
/// overlapping line span; each side is used at most once. Matched wrappers
/// keep their comments and take the fresh anchor. Unmatched fresh items are
/// appended as new wrappers, so `stored` never shrinks. Unmatched stored
/// wrappers stay in place and are reported as orphans.
pub fn update_links(stored: &mut AiFileInfo, fresh: &FileAnnotation) -> Reconciliation {
    if stored.is_empty() {
        return adopt(stored, &fresh.items);
    }

    let fresh_items = &fresh.items;
    let stored_len = stored.items.len();
    let mut links: Vec<Option<usize>> = vec![None; fresh_items.len()];
    let mut kinds: Vec<LinkKind> = vec![LinkKind::Created; fresh_items.len()];
    let mut taken = vec![false; stored_len];

    let passes: [(LinkKind, fn(&AnnotationItem, &AnnotationItem) -> bool); 2] = [
        (LinkKind::Exact, AnnotationItem::is_same_content),
        (LinkKind::Fuzzy, AnnotationItem::is_line_area_partial_match),
    ];
    for (kind, matches) in passes {
        for (i, item) in fresh_items.iter().enumerate() {
            if links[i].is_some() {
                continue;
            }
            let found = (0..stored_len)
                .find(|&j| !taken[j] && matches(item, &stored.items[j].annotation));
            if let Some(j) = found {
                taken[j] = true;
                links[i] = Some(j);
                kinds[i] = kind;
            }
        }
    }

    let mut wrappers = Vec::with_capacity(fresh_items.len());
    for (i, item) in fresh_items.iter().enumerate() {
        match links[i] {
            Some(j) => {
                let wrapper = &mut stored.items[j];
                if wrapper.annotation != *item {
                    wrapper.annotation = item.clone();
                }
                wrappers.push(j);
            }
            None => {
                stored.items.push(AiAnnotationItem::new(item.clone()));
                wrappers.push(stored.items.len() - 1);
            }
        }
    }

    let orphans: Vec<usize> = (0..stored_len).filter(|&j| !taken[j]).collect();
    let result = Reconciliation {
        links,
        kinds,
        wrappers,
        orphans,
    };
    log::debug!(
        "reconciled {} fresh items: {} exact, {} fuzzy, {} created, {} orphaned",
        fresh_items.len(),
        result.count(LinkKind::Exact),
        result.count(LinkKind::Fuzzy),
        result.count(LinkKind::Created),
        result.orphans.len()
    );
    result
}

fn adopt(stored: &mut AiFileInfo, fresh_items: &[AnnotationItem]) -> Reconciliation {
    stored.items = fresh_items
        .iter()
        .cloned()
        .map(AiAnnotationItem::new)
        .collect();
    log::debug!("adopted {} fresh items", fresh_items.len());
    Reconciliation {
        links: vec![None; fresh_items.len()],
        kinds: vec![LinkKind::Created; fresh_items.len()],
        wrappers: (0..fresh_items.len()).collect(),
        orphans: Vec::new(),
    }
}
