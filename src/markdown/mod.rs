//! Structural text-to-Markdown rewriting.
//!
//! Raw text extracted from a document carries Markdown-like structure
//! (`# headings`, `- items`, `> quotes`, fenced code) but no guarantee of
//! canonical spacing. This module reclassifies it line by line:
//!
//! ```text
//! raw text ──▶ segment ──▶ classify (per line) ──▶ assemble
//!              (paragraphs,  (ordered rule table)   (blank-line
//!               fences)                              separators)
//! ```
//!
//! 1. [`segment`]  — paragraphs on `"\n\n"`, lines on `"\n"`, fenced blocks
//!    accumulated into single lines
//! 2. [`classify`] — first-match-wins rule table, total over all input
//! 3. [`fence`]    — fenced block recognition shared by both
//!
//! Everything here is pure and side-effect free, so units of a document can
//! be converted in parallel without coordination.

pub mod classify;
pub mod fence;
pub mod segment;

pub use classify::{classify, ClassifiedLine, ConstructKind, LineClassifier, LinkPolicy};
pub use segment::{assemble, segment, ConstructStats, Line, Paragraph};

/// Convert one unit of raw text to Markdown with the default classifier.
///
/// # Example
/// ```rust
/// let md = doc2md::markdown::convert_text("# Title\n\nSome *text* here.\n- item");
/// assert_eq!(md, "# Title\n\nSome *text* here.\n- item");
/// ```
pub fn convert_text(text: &str) -> String {
    assemble(&segment(text), &LineClassifier::default())
}

/// Convert one unit of raw text with `classifier`, returning construct counts.
pub fn convert_text_with(text: &str, classifier: &LineClassifier) -> (String, ConstructStats) {
    segment::assemble_with_stats(&segment(text), classifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_block() {
        let input = "# Title\n\nSome *text* here.\n- item one\n- item two";
        assert_eq!(
            convert_text(input),
            "# Title\n\nSome *text* here.\n- item one\n- item two"
        );
    }

    #[test]
    fn blank_line_inside_paragraph_survives() {
        assert_eq!(convert_text("a\n   \nb"), "a\n\nb");
    }

    #[test]
    fn paragraph_round_trip() {
        assert_eq!(segment("a\n\nb").len(), 2);
        assert_eq!(convert_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn final_output_is_trimmed() {
        assert_eq!(convert_text("   leading indent"), "leading indent");
        assert_eq!(convert_text("first\n   second"), "first\n   second");
    }

    #[test]
    fn link_policy_flows_through() {
        let preserve = LineClassifier::new(LinkPolicy::PreserveSurrounding);
        let (md, stats) = convert_text_with("go [here](u) now", &preserve);
        assert_eq!(md, "go [here](u) now");
        assert_eq!(stats.links, 0);

        let (md, stats) = convert_text_with("go [here](u) now", &LineClassifier::default());
        assert_eq!(md, "[here](u)");
        assert_eq!(stats.links, 1);
    }
}
