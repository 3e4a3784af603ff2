//! Diff result types.

use serde::{Deserialize, Serialize};
use similar::DiffOp;

/// How a line relates the old text to the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineTag {
    /// Present in both texts.
    Unchanged,
    /// Only present in the new text.
    Added,
    /// Only present in the old text.
    Removed,
}

impl LineTag {
    /// The unified-diff prefix for this tag.
    pub fn sign(&self) -> char {
        match self {
            LineTag::Unchanged => ' ',
            LineTag::Added => '+',
            LineTag::Removed => '-',
        }
    }

    fn inverse(self) -> Self {
        match self {
            LineTag::Unchanged => LineTag::Unchanged,
            LineTag::Added => LineTag::Removed,
            LineTag::Removed => LineTag::Added,
        }
    }
}

/// A run of characters within a line.
///
/// `emphasized` marks the words that actually changed on a line that was
/// paired with a counterpart on the other side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSegment {
    pub emphasized: bool,
    pub value: String,
}

/// One line of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub tag: LineTag,

    /// The line exactly as it appears in its text, including the line
    /// terminator when there is one.
    pub value: String,

    /// Zero-based line index in the old text.
    pub old_index: Option<usize>,

    /// Zero-based line index in the new text.
    pub new_index: Option<usize>,

    /// Segments that concatenate to `value`.
    pub segments: Vec<InlineSegment>,
}

impl DiffLine {
    /// The line without its terminator.
    pub fn text(&self) -> &str {
        self.value
            .strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(&self.value)
    }

    /// Whether this is the last line of a text that has no trailing newline.
    pub fn missing_newline(&self) -> bool {
        !self.value.ends_with('\n')
    }

    /// Concatenation of the emphasized segments.
    pub fn emphasized(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.emphasized)
            .map(|s| s.value.as_str())
            .collect()
    }

    fn inverted(mut self) -> Self {
        self.tag = self.tag.inverse();
        std::mem::swap(&mut self.old_index, &mut self.new_index);
        self
    }
}

/// Line counts by tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    /// Total number of changed lines.
    pub fn changes(&self) -> usize {
        self.added + self.removed
    }
}

/// An ordered, line-level description of how to turn one text into another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub lines: Vec<DiffLine>,

    /// The line alignment `lines` was built from, indexing the old and new
    /// texts.
    #[serde(default)]
    pub ops: Vec<DiffOp>,
}

impl DiffResult {
    pub fn new(lines: Vec<DiffLine>, ops: Vec<DiffOp>) -> Self {
        Self { lines, ops }
    }

    /// True when both texts were empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when there are no added or removed lines.
    pub fn is_identical(&self) -> bool {
        self.lines.iter().all(|l| l.tag == LineTag::Unchanged)
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for line in &self.lines {
            match line.tag {
                LineTag::Unchanged => stats.unchanged += 1,
                LineTag::Added => stats.added += 1,
                LineTag::Removed => stats.removed += 1,
            }
        }
        stats
    }

    /// Lines with the given tag, in order.
    pub fn with_tag(&self, tag: LineTag) -> impl Iterator<Item = &DiffLine> {
        self.lines.iter().filter(move |l| l.tag == tag)
    }

    pub fn added(&self) -> impl Iterator<Item = &DiffLine> {
        self.with_tag(LineTag::Added)
    }

    pub fn removed(&self) -> impl Iterator<Item = &DiffLine> {
        self.with_tag(LineTag::Removed)
    }

    /// Rebuild the old text from unchanged and removed lines.
    pub fn old_text(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.tag != LineTag::Added)
            .map(|l| l.value.as_str())
            .collect()
    }

    /// Rebuild the new text from unchanged and added lines.
    pub fn new_text(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.tag != LineTag::Removed)
            .map(|l| l.value.as_str())
            .collect()
    }

    /// The diff describing the reverse edit.
    ///
    /// Additions and removals swap. Within each run of changed lines the
    /// removals are listed before the additions, keeping the relative order
    /// inside each group.
    pub fn inverted(&self) -> Self {
        let mut lines = Vec::with_capacity(self.lines.len());
        let mut removed = Vec::new();
        let mut added = Vec::new();

        for line in self.lines.iter().cloned().map(DiffLine::inverted) {
            match line.tag {
                LineTag::Removed => removed.push(line),
                LineTag::Added => added.push(line),
                LineTag::Unchanged => {
                    lines.append(&mut removed);
                    lines.append(&mut added);
                    lines.push(line);
                }
            }
        }
        lines.append(&mut removed);
        lines.append(&mut added);

        Self {
            lines,
            ops: self.ops.iter().map(|op| invert_op(*op)).collect(),
        }
    }
}

fn invert_op(op: DiffOp) -> DiffOp {
    match op {
        DiffOp::Equal {
            old_index,
            new_index,
            len,
        } => DiffOp::Equal {
            old_index: new_index,
            new_index: old_index,
            len,
        },
        DiffOp::Delete {
            old_index,
            old_len,
            new_index,
        } => DiffOp::Insert {
            old_index: new_index,
            new_index: old_index,
            new_len: old_len,
        },
        DiffOp::Insert {
            old_index,
            new_index,
            new_len,
        } => DiffOp::Delete {
            old_index: new_index,
            old_len: new_len,
            new_index: old_index,
        },
        DiffOp::Replace {
            old_index,
            old_len,
            new_index,
            new_len,
        } => DiffOp::Replace {
            old_index: new_index,
            old_len: new_len,
            new_index: old_index,
            new_len: old_len,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(tag: LineTag, value: &str, old: Option<usize>, new: Option<usize>) -> DiffLine {
        DiffLine {
            tag,
            value: value.to_string(),
            old_index: old,
            new_index: new,
            segments: vec![InlineSegment {
                emphasized: tag != LineTag::Unchanged,
                value: value.to_string(),
            }],
        }
    }

    fn sample() -> DiffResult {
        let lines = vec![
            line(LineTag::Unchanged, "a\n", Some(0), Some(0)),
            line(LineTag::Removed, "b\n", Some(1), None),
            line(LineTag::Added, "B\n", None, Some(1)),
            line(LineTag::Added, "C\n", None, Some(2)),
            line(LineTag::Unchanged, "d", Some(2), Some(3)),
        ];
        let ops = vec![
            DiffOp::Equal {
                old_index: 0,
                new_index: 0,
                len: 1,
            },
            DiffOp::Replace {
                old_index: 1,
                old_len: 1,
                new_index: 1,
                new_len: 2,
            },
            DiffOp::Equal {
                old_index: 2,
                new_index: 3,
                len: 1,
            },
        ];
        DiffResult::new(lines, ops)
    }

    #[test]
    fn test_reconstruct_both_sides() {
        let diff = sample();
        assert_eq!(diff.old_text(), "a\nb\nd");
        assert_eq!(diff.new_text(), "a\nB\nC\nd");
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();
        assert_eq!(stats.added, 2);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unchanged, 2);
        assert_eq!(stats.changes(), 3);
    }

    #[test]
    fn test_inverted_swaps_and_orders_removals_first() {
        let inverted = sample().inverted();
        let tags: Vec<_> = inverted.lines.iter().map(|l| l.tag).collect();
        assert_eq!(
            tags,
            vec![
                LineTag::Unchanged,
                LineTag::Removed,
                LineTag::Removed,
                LineTag::Added,
                LineTag::Unchanged,
            ]
        );
        assert_eq!(inverted.old_text(), "a\nB\nC\nd");
        assert_eq!(inverted.new_text(), "a\nb\nd");
        assert_eq!(inverted.lines[1].old_index, Some(1));
        assert_eq!(inverted.lines[1].new_index, None);
        assert_eq!(inverted.inverted(), sample());
    }

    #[test]
    fn test_inverted_ops_swap_sides() {
        let inverted = sample().inverted();
        assert_eq!(
            inverted.ops[1],
            DiffOp::Replace {
                old_index: 1,
                old_len: 2,
                new_index: 1,
                new_len: 1,
            }
        );
        assert_eq!(inverted.ops[2].old_range(), 3..4);
        assert_eq!(inverted.ops[2].new_range(), 2..3);
    }

    #[test]
    fn test_line_text_strips_terminator() {
        let crlf = line(LineTag::Unchanged, "windows\r\n", Some(0), Some(0));
        assert_eq!(crlf.text(), "windows");
        assert!(!crlf.missing_newline());

        let last = line(LineTag::Unchanged, "tail", Some(1), Some(1));
        assert_eq!(last.text(), "tail");
        assert!(last.missing_newline());
    }

    #[test]
    fn test_serializes_tags_snake_case() {
        let json = serde_json::to_string(&LineTag::Unchanged).unwrap();
        assert_eq!(json, "\"unchanged\"");
    }
}
