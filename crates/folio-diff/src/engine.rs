//! Line-level diff computation.

use crate::{DiffLine, DiffResult, InlineSegment, LineTag};
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, DiffTag, TextDiff};

/// Sequence-alignment algorithm used to match lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
}

impl From<DiffAlgorithm> for Algorithm {
    fn from(value: DiffAlgorithm) -> Self {
        match value {
            DiffAlgorithm::Myers => Algorithm::Myers,
            DiffAlgorithm::Patience => Algorithm::Patience,
        }
    }
}

/// Diff engine options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    pub algorithm: DiffAlgorithm,

    /// Unchanged lines shown around each hunk in unified output.
    pub context_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            algorithm: DiffAlgorithm::Myers,
            context_lines: 3,
        }
    }
}

/// Computes line-level diffs between two texts.
///
/// The engine is pure: no state is kept between calls. `diff(a, b)` and
/// `diff(b, a)` always describe exactly inverse edits, because both are
/// derived from a single alignment computed in a canonical orientation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Diff `old` against `new`.
    pub fn diff(&self, old: &str, new: &str) -> DiffResult {
        if old <= new {
            self.align(old, new)
        } else {
            self.align(new, old).inverted()
        }
    }

    /// Render a diff as unified text using the configured context radius.
    pub fn unified(&self, result: &DiffResult, old_label: &str, new_label: &str) -> String {
        crate::unified::render(result, old_label, new_label, self.options.context_lines)
    }

    fn align(&self, old: &str, new: &str) -> DiffResult {
        let diff = TextDiff::configure()
            .algorithm(self.options.algorithm.into())
            .diff_lines(old, new);
        let old_lines = diff.old_slices();
        let new_lines = diff.new_slices();
        let mut lines = Vec::with_capacity(old_lines.len().max(new_lines.len()));

        for op in diff.ops() {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    for (o, n) in old_range.zip(new_range) {
                        lines.push(whole_line(LineTag::Unchanged, old_lines[o], Some(o), Some(n)));
                    }
                }
                DiffTag::Delete => {
                    for o in old_range {
                        lines.push(whole_line(LineTag::Removed, old_lines[o], Some(o), None));
                    }
                }
                DiffTag::Insert => {
                    for n in new_range {
                        lines.push(whole_line(LineTag::Added, new_lines[n], None, Some(n)));
                    }
                }
                DiffTag::Replace => {
                    // Pair lines positionally so the changed words can be
                    // emphasized; leftovers on either side stay whole.
                    let paired = old_range.len().min(new_range.len());
                    let mut added = Vec::with_capacity(new_range.len());

                    for (o, n) in old_range.clone().zip(new_range.clone()) {
                        let (old_segments, new_segments) =
                            self.inline_segments(old_lines[o], new_lines[n]);
                        lines.push(DiffLine {
                            tag: LineTag::Removed,
                            value: old_lines[o].to_string(),
                            old_index: Some(o),
                            new_index: None,
                            segments: old_segments,
                        });
                        added.push(DiffLine {
                            tag: LineTag::Added,
                            value: new_lines[n].to_string(),
                            old_index: None,
                            new_index: Some(n),
                            segments: new_segments,
                        });
                    }
                    for o in old_range.skip(paired) {
                        lines.push(whole_line(LineTag::Removed, old_lines[o], Some(o), None));
                    }
                    for n in new_range.skip(paired) {
                        added.push(whole_line(LineTag::Added, new_lines[n], None, Some(n)));
                    }
                    lines.append(&mut added);
                }
            }
        }

        DiffResult::new(lines, diff.ops().to_vec())
    }

    /// Word-level diff of a paired old/new line.
    fn inline_segments(&self, old: &str, new: &str) -> (Vec<InlineSegment>, Vec<InlineSegment>) {
        let diff = TextDiff::configure()
            .algorithm(self.options.algorithm.into())
            .diff_words(old, new);
        let mut old_segments = Vec::new();
        let mut new_segments = Vec::new();

        for change in diff.iter_all_changes() {
            let value = change.value();
            match change.tag() {
                ChangeTag::Equal => {
                    push_segment(&mut old_segments, false, value);
                    push_segment(&mut new_segments, false, value);
                }
                ChangeTag::Delete => push_segment(&mut old_segments, true, value),
                ChangeTag::Insert => push_segment(&mut new_segments, true, value),
            }
        }

        (old_segments, new_segments)
    }
}

fn whole_line(tag: LineTag, value: &str, old: Option<usize>, new: Option<usize>) -> DiffLine {
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

fn push_segment(segments: &mut Vec<InlineSegment>, emphasized: bool, value: &str) {
    match segments.last_mut() {
        Some(last) if last.emphasized == emphasized => last.value.push_str(value),
        _ => segments.push(InlineSegment {
            emphasized,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DiffEngine {
        DiffEngine::default()
    }

    fn texts(lines: &[&DiffLine]) -> Vec<String> {
        lines.iter().map(|l| l.text().to_string()).collect()
    }

    #[test]
    fn test_identical_texts_are_all_unchanged() {
        let text = "one\ntwo\nthree\n";
        let diff = engine().diff(text, text);
        assert!(diff.is_identical());
        assert_eq!(diff.stats().unchanged, 3);
        assert_eq!(diff.stats().changes(), 0);
    }

    #[test]
    fn test_both_empty_is_valid_and_empty() {
        let diff = engine().diff("", "");
        assert!(diff.is_empty());
        assert!(diff.is_identical());
    }

    #[test]
    fn test_empty_against_text_is_all_added() {
        let diff = engine().diff("", "a\nb\n");
        assert_eq!(diff.stats().added, 2);
        assert_eq!(diff.stats().removed, 0);
        assert_eq!(diff.stats().unchanged, 0);
        assert_eq!(diff.new_text(), "a\nb\n");
    }

    #[test]
    fn test_insertion_shifts_do_not_break_alignment() {
        let old = "a\nb\nc\nd\n";
        let new = "x\na\nb\nc\nd\n";
        let diff = engine().diff(old, new);
        let stats = diff.stats();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.unchanged, 4);
        assert_eq!(diff.added().next().unwrap().text(), "x");
    }

    #[test]
    fn test_reconstructs_both_texts() {
        let old = "fn main() {\n    println!(\"hi\");\n}\n";
        let new = "fn main() {\n    let x = 1;\n    println!(\"{x}\");\n}";
        let diff = engine().diff(old, new);
        assert_eq!(diff.old_text(), old);
        assert_eq!(diff.new_text(), new);
    }

    #[test]
    fn test_reverse_diff_is_inverse() {
        let a = "alpha\nbeta\ngamma\ndelta\n";
        let b = "gamma\nalpha\nBETA\ndelta\nepsilon\n";

        let forward = engine().diff(a, b);
        let backward = engine().diff(b, a);

        let forward_added: Vec<_> = forward.added().collect();
        let backward_removed: Vec<_> = backward.removed().collect();
        assert_eq!(texts(&forward_added), texts(&backward_removed));

        let forward_removed: Vec<_> = forward.removed().collect();
        let backward_added: Vec<_> = backward.added().collect();
        assert_eq!(texts(&forward_removed), texts(&backward_added));

        assert_eq!(forward.inverted(), backward);
    }

    #[test]
    fn test_changed_words_are_emphasized() {
        let diff = engine().diff("hello", "hello world");

        let removed: Vec<_> = diff.removed().collect();
        let added: Vec<_> = diff.added().collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].text(), "hello world");
        assert_eq!(added[0].emphasized(), " world");
        assert_eq!(removed[0].emphasized(), "");

        let rebuilt: String = added[0].segments.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(rebuilt, added[0].value);
    }

    #[test]
    fn test_patience_algorithm_reconstructs() {
        let engine = DiffEngine::new(DiffOptions {
            algorithm: DiffAlgorithm::Patience,
            context_lines: 1,
        });
        let old = "}\n}\nfn a() {\n}\n";
        let new = "}\nfn b() {\n}\n}\nfn a() {\n}\n";
        let diff = engine.diff(old, new);
        assert_eq!(diff.old_text(), old);
        assert_eq!(diff.new_text(), new);
        assert_eq!(diff.stats().removed, 0);
    }

    #[test]
    fn test_algorithm_serde_lowercase() {
        let algo: DiffAlgorithm = serde_json::from_str("\"patience\"").unwrap();
        assert_eq!(algo, DiffAlgorithm::Patience);
    }
}
