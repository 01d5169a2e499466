use oxc_allocator::Vec;
use oxc_ast::Comment;

/// Pending comment re-anchoring, recorded while a visitor holds the tree and
/// applied to `Program::comments` once the walk is over.
#[derive(Debug, Default)]
pub struct CommentMoves {
    moves: std::vec::Vec<(u32, u32)>,
}

impl CommentMoves {
    /// Comments attached to the node starting at `from` will print before the
    /// node starting at `to`.
    pub fn push(&mut self, from: u32, to: u32) {
        if from != to {
            self.moves.push((from, to));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Applies moves in recording order so chained removals carry comments
    /// all the way to the last survivor.
    pub fn apply(self, comments: &mut Vec<'_, Comment>) {
        for (from, to) in self.moves {
            for comment in comments.iter_mut() {
                if comment.is_leading() && comment.attached_to == from {
                    comment.attached_to = to;
                }
            }
        }
    }
}

pub fn is_pure_annotation(text: &str) -> bool {
    text.contains("#__PURE__") || text.contains("@__PURE__")
}

/// Drops `#__PURE__` annotations anchored to any of `anchors`.
pub fn strip_pure_annotations(comments: &mut Vec<'_, Comment>, source_text: &str, anchors: &[u32]) {
    if anchors.is_empty() {
        return;
    }
    comments.retain(|comment| {
        let text = comment.span.source_text(source_text);
        !(anchors.contains(&comment.attached_to) && is_pure_annotation(text))
    });
}
