use crate::file_info::AiFileInfo;

const COMMENT_PREFIX: &str = "/// ";

/// Source text with stored comments interleaved as `///` lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    pub lines: Vec<String>,

    /// Overlay line -> source line; `None` for inserted comment lines
    pub line_to_source: Vec<Option<usize>>,

    /// Source line -> overlay line
    pub source_to_line: Vec<usize>,
}

impl Overlay {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Insert every comment of `info` above the source line it is anchored to.
///
/// A comment line copies the indentation of its target line, one level
/// deeper when the target closes a block. Comments anchored outside the
/// source are skipped.
pub fn overlay_comments<S: AsRef<str>>(source: &[S], info: &AiFileInfo) -> Overlay {
    let mut anchored: Vec<(usize, &str)> = Vec::new();
    for item in info.items() {
        for comment in item.comments() {
            let line = item.absolute_line(comment);
            match usize::try_from(line) {
                Ok(line) if line < source.len() => anchored.push((line, comment.text.as_str())),
                _ => log::debug!(
                    "comment on {} anchored at line {line} is outside the source",
                    item.annotation.id
                ),
            }
        }
    }
    anchored.sort_by_key(|&(line, _)| line);

    let mut overlay = Overlay {
        lines: Vec::with_capacity(source.len() + anchored.len()),
        line_to_source: Vec::with_capacity(source.len() + anchored.len()),
        source_to_line: Vec::with_capacity(source.len()),
    };
    let mut pending = anchored.into_iter().peekable();
    for (line_no, line) in source.iter().enumerate() {
        let line = line.as_ref();
        while let Some((_, text)) = pending.next_if(|&(anchor, _)| anchor == line_no) {
            overlay.lines.push(format!("{}{}{}", indentation(line), COMMENT_PREFIX, text));
            overlay.line_to_source.push(None);
        }
        overlay.source_to_line.push(overlay.lines.len());
        overlay.lines.push(line.to_string());
        overlay.line_to_source.push(Some(line_no));
    }
    overlay
}

fn indentation(line: &str) -> String {
    let trimmed = line.trim_start();
    let mut indent = line[..line.len() - trimmed.len()].to_string();
    if trimmed.starts_with('}') {
        indent.push('\t');
    }
    indent
}
