//! Unified diff rendering.

use crate::{DiffLine, DiffResult, LineTag};
use similar::udiff::UnifiedHunkHeader;
use similar::{group_diff_ops, DiffTag};

/// Render `result` in unified diff format.
///
/// Hunks are the result's alignment ops grouped with `context` unchanged
/// lines around each change. Identical inputs render as an empty string.
pub fn render(result: &DiffResult, old_label: &str, new_label: &str, context: usize) -> String {
    if result.is_identical() {
        return String::new();
    }

    // Lines of each text in index order
    let old_lines: Vec<&DiffLine> = result
        .lines
        .iter()
        .filter(|l| l.tag != LineTag::Added)
        .collect();
    let new_lines: Vec<&DiffLine> = result
        .lines
        .iter()
        .filter(|l| l.tag != LineTag::Removed)
        .collect();

    let mut output = String::new();
    output.push_str(&format!("--- {}\n", old_label));
    output.push_str(&format!("+++ {}\n", new_label));

    for group in group_diff_ops(result.ops.clone(), context) {
        output.push_str(&format!("{}\n", UnifiedHunkHeader::new(&group)));

        for op in &group {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => push_lines(&mut output, ' ', &old_lines[old_range]),
                DiffTag::Delete => push_lines(&mut output, '-', &old_lines[old_range]),
                DiffTag::Insert => push_lines(&mut output, '+', &new_lines[new_range]),
                DiffTag::Replace => {
                    push_lines(&mut output, '-', &old_lines[old_range]);
                    push_lines(&mut output, '+', &new_lines[new_range]);
                }
            }
        }
    }

    output
}

fn push_lines(output: &mut String, sign: char, lines: &[&DiffLine]) {
    for line in lines {
        output.push(sign);
        output.push_str(line.text());
        output.push('\n');
        if line.missing_newline() {
            output.push_str("\\ No newline at end of file\n");
        }
    }
}
