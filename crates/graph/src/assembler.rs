use crate::error::TraversalFailure;
use crate::index::SymbolIndex;
use crate::types::{AnnotationItem, FileAnnotation, Point, ReferenceItem};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Entry limit used when a slice is assembled for a prompt
pub const DEFAULT_PROMPT_LIMIT: usize = 1000;

/// Cross-reference context assembler for LLM prompts
///
/// Walks the symbol index depth-first from a seed range, following
/// definitions, declarations and references, and collects every visited
/// symbol once. The output is a deterministic function of the seed range and
/// the borrowed index.
///
/// A session starts with [`ContextAssembler::begin`]; repeated
/// [`ContextAssembler::visit`] calls within one session share the visited
/// sets, so nothing is emitted twice.
pub struct ContextAssembler<'a> {
    index: &'a SymbolIndex,
    limit: Option<usize>,
    cancellation: Option<CancellationToken>,

    /// Ids already emitted as definitions
    visited_definitions: HashSet<String>,

    /// Ids already emitted as declarations
    visited_declarations: HashSet<String>,

    /// (use-site file, referenced position) edges already followed
    visited_edges: HashSet<(String, Point)>,

    entries: Vec<ContextEntry>,
    truncated: bool,
    cancelled: bool,
}

/// One line of an assembled context slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub file: String,
    pub pos: Point,

    /// Recursion depth; 0 for symbols inside the seed range
    pub depth: usize,

    #[serde(flatten)]
    pub payload: EntryPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entry", content = "data", rename_all = "snake_case")]
pub enum EntryPayload {
    Annotation(AnnotationItem),

    /// A use site, with the definition it resolved to
    Reference {
        reference: ReferenceItem,
        link: Option<AnnotationItem>,
    },

    /// Sentinel: traversal gave up on this branch
    Failure(TraversalFailure),
}

/// Output of one assembly session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextSlice {
    pub entries: Vec<ContextEntry>,

    /// An entry was refused because the limit was reached
    pub truncated: bool,

    /// The traversal was stopped through its cancellation token
    pub cancelled: bool,
}

/// Cooperative stop signal shared with a running traversal
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Candidate<'f> {
    Annotation(&'f AnnotationItem),
    Reference(&'f ReferenceItem),
}

impl Candidate<'_> {
    fn pos(&self) -> Point {
        match self {
            Candidate::Annotation(item) => item.pos,
            Candidate::Reference(reference) => reference.pos,
        }
    }
}

/// Pending candidates of one line range. The traversal keeps these on an
/// explicit stack, so chain length is bounded by memory, not by the call
/// stack.
struct Frame<'f> {
    file: &'f str,
    candidates: std::vec::IntoIter<Candidate<'f>>,
    depth: usize,
}

impl<'f> Frame<'f> {
    fn new(
        file: &'f str,
        annotation: &'f FileAnnotation,
        first_line: i32,
        last_line: i32,
        depth: usize,
    ) -> Self {
        Self {
            file,
            candidates: collect_candidates(annotation, first_line, last_line).into_iter(),
            depth,
        }
    }
}

impl<'a> ContextAssembler<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self {
            index,
            limit: None,
            cancellation: None,
            visited_definitions: HashSet::new(),
            visited_declarations: HashSet::new(),
            visited_edges: HashSet::new(),
            entries: Vec::new(),
            truncated: false,
            cancelled: false,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Start a new session: forget visited symbols and clear the output.
    pub fn begin(&mut self) {
        self.visited_definitions.clear();
        self.visited_declarations.clear();
        self.visited_edges.clear();
        self.entries.clear();
        self.truncated = false;
        self.cancelled = false;
    }

    /// Cap the output at `limit` entries (sentinels included). Clears the
    /// truncation flag, so a later visit can continue with the new budget.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = Some(limit);
        self.truncated = false;
    }

    pub fn set_no_limit(&mut self) {
        self.limit = None;
        self.truncated = false;
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Visit every symbol of `annotation` whose line lies within
    /// `begin.y..=end.y`, following definitions and references from there.
    pub fn visit(&mut self, file: &str, annotation: &FileAnnotation, begin: Point, end: Point) {
        let before = self.entries.len();
        self.visit_lines(file, annotation, begin.y, end.y);
        log::debug!(
            "visited {file} lines {}..={}: {} new entries (total {}, truncated={}, cancelled={})",
            begin.y,
            end.y,
            self.entries.len() - before,
            self.entries.len(),
            self.truncated,
            self.cancelled
        );
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn finish(self) -> ContextSlice {
        ContextSlice {
            entries: self.entries,
            truncated: self.truncated,
            cancelled: self.cancelled,
        }
    }

    fn visit_lines<'f>(
        &mut self,
        file: &'f str,
        annotation: &'f FileAnnotation,
        first_line: i32,
        last_line: i32,
    ) where
        'a: 'f,
    {
        let mut stack = vec![Frame::new(file, annotation, first_line, last_line, 0)];
        while let Some(frame) = stack.last_mut() {
            if self.should_stop() {
                break;
            }
            let Some(candidate) = frame.candidates.next() else {
                stack.pop();
                continue;
            };
            let (file, depth) = (frame.file, frame.depth);
            let child = match candidate {
                Candidate::Annotation(item) => self.visit_annotation(file, item, depth),
                Candidate::Reference(reference) => self.visit_reference(file, reference, depth),
            };
            stack.extend(child);
        }
    }

    /// Emit `item` and return the range to descend into next, if any.
    fn visit_annotation<'f>(
        &mut self,
        file: &'f str,
        item: &'f AnnotationItem,
        depth: usize,
    ) -> Option<Frame<'f>>
    where
        'a: 'f,
    {
        let seen = if item.definition {
            &self.visited_definitions
        } else {
            &self.visited_declarations
        };
        if seen.contains(&item.id) {
            return None;
        }

        let entry = ContextEntry {
            file: file.to_string(),
            pos: item.pos,
            depth,
            payload: EntryPayload::Annotation(item.clone()),
        };
        if !self.emit(entry) {
            return None;
        }
        if item.definition {
            self.visited_definitions.insert(item.id.clone());
        } else {
            self.visited_declarations.insert(item.id.clone());
        }

        let index: &'a SymbolIndex = self.index;
        if item.definition {
            // Descend into the body of the definition.
            match index.get(file) {
                Some(owner) => Some(Frame::new(file, owner, item.begin.y, item.end.y, depth + 1)),
                None => {
                    self.fail(
                        file,
                        item.pos,
                        depth + 1,
                        TraversalFailure::FileNotIndexed {
                            file: file.to_string(),
                        },
                    );
                    None
                }
            }
        } else {
            match index.find_definition(&item.id) {
                Some(def) => Some(Frame::new(
                    def.path,
                    def.file,
                    def.item.begin.y,
                    def.item.end.y,
                    depth + 1,
                )),
                None => {
                    self.fail(
                        file,
                        item.pos,
                        depth + 1,
                        TraversalFailure::IdNotFound {
                            id: item.id.clone(),
                        },
                    );
                    None
                }
            }
        }
    }

    fn visit_reference<'f>(
        &mut self,
        file: &'f str,
        reference: &'f ReferenceItem,
        depth: usize,
    ) -> Option<Frame<'f>>
    where
        'a: 'f,
    {
        let edge = (file.to_string(), reference.ref_pos);
        if self.visited_edges.contains(&edge) {
            return None;
        }

        let index: &'a SymbolIndex = self.index;
        let definition = index.find_definition(&reference.id);
        let entry = ContextEntry {
            file: file.to_string(),
            pos: reference.pos,
            depth,
            payload: EntryPayload::Reference {
                reference: reference.clone(),
                link: definition.map(|def| def.item.clone()),
            },
        };
        if !self.emit(entry) {
            return None;
        }
        self.visited_edges.insert(edge);

        match definition {
            Some(def) => Some(Frame::new(
                def.path,
                def.file,
                def.item.begin.y,
                def.item.end.y,
                depth + 1,
            )),
            None => {
                self.fail(
                    file,
                    reference.pos,
                    depth + 1,
                    TraversalFailure::IdNotFound {
                        id: reference.id.clone(),
                    },
                );
                None
            }
        }
    }

    fn fail(&mut self, file: &str, pos: Point, depth: usize, failure: TraversalFailure) {
        log::debug!("{file} {pos}: {failure}");
        self.emit(ContextEntry {
            file: file.to_string(),
            pos,
            depth,
            payload: EntryPayload::Failure(failure),
        });
    }

    /// Append an entry unless the budget is spent.
    fn emit(&mut self, entry: ContextEntry) -> bool {
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                self.truncated = true;
                return false;
            }
        }
        self.entries.push(entry);
        true
    }

    fn should_stop(&mut self) -> bool {
        if !self.cancelled {
            if let Some(token) = &self.cancellation {
                self.cancelled = token.is_cancelled();
            }
        }
        self.cancelled || self.truncated
    }
}

/// Symbols of `annotation` on lines `first_line..=last_line`, in source order.
fn collect_candidates(
    annotation: &FileAnnotation,
    first_line: i32,
    last_line: i32,
) -> Vec<Candidate<'_>> {
    let in_range = |pos: Point| first_line <= pos.y && pos.y <= last_line;

    let mut candidates: Vec<Candidate<'_>> = annotation
        .items
        .iter()
        .chain(annotation.locals.iter())
        .filter(|item| in_range(item.pos))
        .map(Candidate::Annotation)
        .chain(
            annotation
                .refs
                .iter()
                .filter(|reference| in_range(reference.pos))
                .map(Candidate::Reference),
        )
        .collect();

    // Stable: items, then locals, then refs on identical positions.
    candidates.sort_by_key(Candidate::pos);
    candidates
}

impl ContextEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self.payload, EntryPayload::Failure(_))
    }

    /// Id of the symbol this entry is about, if any
    pub fn symbol_id(&self) -> Option<&str> {
        match &self.payload {
            EntryPayload::Annotation(item) => Some(&item.id),
            EntryPayload::Reference { reference, .. } => Some(&reference.id),
            EntryPayload::Failure(_) => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationItem> {
        match &self.payload {
            EntryPayload::Annotation(item) => Some(item),
            _ => None,
        }
    }
}

/// Tab separated: file, position, kind, id, type, referenced position, error.
impl fmt::Display for ContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}\t{}", "  ".repeat(self.depth), self.file, self.pos)?;
        match &self.payload {
            EntryPayload::Annotation(item) => {
                write!(f, "\t{}\t{}\t{}\t\t", item.kind, item.id, item.type_name)
            }
            EntryPayload::Reference { reference, link } => {
                let type_name = link.as_ref().map_or("", |item| item.type_name.as_str());
                write!(
                    f,
                    "\t{}\t{}\t{}\t{}\t",
                    reference.kind, reference.id, type_name, reference.ref_pos
                )
            }
            EntryPayload::Failure(failure) => write!(f, "\t\t\t\t\t{failure}"),
        }
    }
}

impl ContextSlice {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.iter().filter(|entry| entry.is_failure())
    }

    /// One line per entry, indented by depth
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}
