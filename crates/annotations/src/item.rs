use crate::comment::Comment;
use crate::error::{AnnotationError, Result};
use aion_graph::AnnotationItem;
use serde::{Deserialize, Serialize};

/// A symbol occurrence together with the comments attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnnotationItem {
    /// Anchor: the analyzer's record of the symbol
    #[serde(rename = "a")]
    pub annotation: AnnotationItem,

    /// Comments, ascending by `rel_line`
    #[serde(rename = "c", default)]
    comments: Vec<Comment>,
}

impl AiAnnotationItem {
    pub fn new(annotation: AnnotationItem) -> Self {
        Self {
            annotation,
            comments: Vec::new(),
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn has_comments(&self) -> bool {
        !self.comments.is_empty()
    }

    /// Attach a comment to `rel_line`, after any comments already on that line.
    ///
    /// `source_line` is the text of the anchored line; its hash is kept with the
    /// comment. Returns the index of the new comment.
    pub fn add_comment(
        &mut self,
        rel_line: i32,
        text: impl Into<String>,
        source_line: &str,
    ) -> usize {
        let at = self.comments.partition_point(|c| c.rel_line <= rel_line);
        self.comments.insert(at, Comment::new(rel_line, text, source_line));
        at
    }

    pub fn remove_comment(&mut self, index: usize) -> Result<Comment> {
        if index >= self.comments.len() {
            return Err(AnnotationError::CommentOutOfRange {
                index,
                len: self.comments.len(),
            });
        }
        Ok(self.comments.remove(index))
    }

    pub fn comments_at(&self, rel_line: i32) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(move |c| c.rel_line == rel_line)
    }

    /// Absolute source line a comment is anchored to
    pub fn absolute_line(&self, comment: &Comment) -> i32 {
        self.annotation.begin.y + comment.rel_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aion_graph::Point;

    fn wrapper() -> AiAnnotationItem {
        AiAnnotationItem::new(AnnotationItem {
            id: "Foo::run".to_string(),
            begin: Point::new(0, 40),
            end: Point::new(1, 60),
            definition: true,
            ..Default::default()
        })
    }

    #[test]
    fn comments_stay_sorted_by_relative_line() {
        let mut item = wrapper();
        item.add_comment(5, "second", "x");
        item.add_comment(1, "first", "y");
        let at = item.add_comment(5, "third", "z");

        let texts: Vec<&str> = item.comments().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(at, 2);
        assert_eq!(item.comments_at(5).count(), 2);
        assert_eq!(item.absolute_line(&item.comments()[0]), 41);
    }

    #[test]
    fn removing_missing_comment_is_an_error() {
        let mut item = wrapper();
        item.add_comment(0, "only", "x");
        assert_eq!(
            item.remove_comment(3),
            Err(AnnotationError::CommentOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(item.remove_comment(0).map(|c| c.text), Ok("only".to_string()));
        assert!(!item.has_comments());
    }

    #[test]
    fn serializes_anchor_and_comments_under_short_keys() {
        let mut item = wrapper();
        item.add_comment(2, "note", "x");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["a"]["id"], "Foo::run");
        assert_eq!(value["c"][0]["s"], "note");
        assert_eq!(value["c"][0]["l"], 2);
    }
}
