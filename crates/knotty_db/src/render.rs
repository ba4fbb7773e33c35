//! Renders a [`Diagnostic`](knotty_semantic::diagnostic::Diagnostic) to an
//! annotated source excerpt (§6: "diagnostics rendering" is an external
//! collaborator; §4.8 gives it a concrete, minimal implementation here).
//!
//! Format matches the line/caret style used throughout the retrieval pack's
//! own test fixtures (e.g. the annotated-diagnostic blocks in
//! `ouros_type_checking`'s expectation files): a `-->` location line
//! followed by the offending source line with a caret underline.

use ruff_text_size::{TextRange, TextSize};

/// Everything needed to render one diagnostic: where it is and what the
/// source looks like there. Kept free of any dependency on
/// `knotty_semantic::diagnostic::Diagnostic` itself so this crate doesn't
/// need a path dependency back on the semantic core purely for rendering.
pub struct RenderInput<'a> {
    pub rule: &'a str,
    pub severity: &'a str,
    pub file: &'a std::path::Path,
    pub source: &'a str,
    pub range: TextRange,
    pub message: &'a str,
}

/// Renders one diagnostic as a `rustc`-style annotated block:
/// ```text
/// warning[unused-variable]: unused variable 'x'
///  --> mod.py:2:1
///   |
/// 2 | x = 1
///   | ^
/// ```
#[must_use]
pub fn render(input: &RenderInput) -> String {
    let (line_index, line_text, column) = locate(input.source, input.range.start());
    let underline_len = input.range.len().to_usize().max(1);

    let mut out = String::new();
    out.push_str(&format!("{}[{}]: {}\n", input.severity, input.rule, input.message));
    out.push_str(&format!(
        " --> {}:{}:{}\n",
        input.file.display(),
        line_index + 1,
        column + 1
    ));
    out.push_str("  |\n");
    out.push_str(&format!("{:>2} | {}\n", line_index + 1, line_text));
    out.push_str(&format!(
        "   | {}{}\n",
        " ".repeat(column),
        "^".repeat(underline_len.min(line_text.len().saturating_sub(column).max(1)))
    ));
    out
}

/// Finds the 0-based line index, that line's text, and the 0-based column
/// within it for a byte offset into `source`.
fn locate(source: &str, offset: TextSize) -> (usize, &str, usize) {
    let offset = usize::from(offset).min(source.len());
    let mut line_start = 0;
    for (index, line) in source.split_inclusive('\n').enumerate() {
        let line_end = line_start + line.len();
        if offset < line_end || index == source.split_inclusive('\n').count().saturating_sub(1) {
            let column = offset.saturating_sub(line_start);
            return (index, line.trim_end_matches('\n'), column);
        }
        line_start = line_end;
    }
    (0, "", 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_and_caret() {
        let source = "x = 1\ny = 2\n";
        let input = RenderInput {
            rule: "unused-variable",
            severity: "warning",
            file: std::path::Path::new("mod.py"),
            source,
            range: TextRange::new(TextSize::from(6), TextSize::from(7)),
            message: "unused variable 'y'",
        };
        let rendered = render(&input);
        assert!(rendered.contains("mod.py:2:1"));
        assert!(rendered.contains("y = 2"));
        assert!(rendered.contains('^'));
    }
}
