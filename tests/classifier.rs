//! Behavioural tests for the line classifier and text segmenter.
//!
//! These need no native library and always run.

use doc2md::markdown::{convert_text, convert_text_with, segment};
use doc2md::{classify, ConstructKind, LineClassifier, LinkPolicy};

/// A spread of awkward inputs: empty, whitespace, unicode, stray markers.
const ODD_INPUTS: &[&str] = &[
    "",
    " ",
    "\t\t",
    "#",
    "# ",
    "##",
    "1.",
    "1.x",
    "-",
    "- ",
    ">",
    "> ",
    "[",
    "[]()",
    "[a](",
    "```",
    "``` ",
    "***",
    "* * *",
    "_",
    "__init__",
    "**unclosed",
    "......",
    "Ünïcödé ✓ текст",
    "\u{200B}",
    "a\tb",
    "    ",
];

// ── Totality ────────────────────────────────────────────────────────────────

#[test]
fn classify_is_total() {
    for input in ODD_INPUTS {
        let _ = classify(input);
        let _ = LineClassifier::new(LinkPolicy::PreserveSurrounding).classify(input);
        let _ = convert_text(input);
    }
}

#[test]
fn classify_never_emits_newlines_for_single_lines() {
    for input in ODD_INPUTS {
        assert!(
            !classify(input).contains('\n'),
            "single line {input:?} became multi-line"
        );
    }
}

// ── Canonical forms ─────────────────────────────────────────────────────────

#[test]
fn canonical_forms_are_fixed_points() {
    let samples = [
        "#   Heading",
        "###### Deep",
        "12.    twelve",
        "*   star item",
        "+ plus item",
        "-    dash item",
        ">    quoted",
        "[docs](https://example.com)",
        "- - -",
        "...table...",
    ];
    for sample in samples {
        let once = classify(sample);
        let twice = classify(&once);
        assert_eq!(once, twice, "not idempotent for {sample:?}");
    }
}

#[test]
fn heading_bound_is_six() {
    assert_eq!(classify("###### six"), "###### six");
    assert_eq!(classify("####### text"), "####### text");
    let classified = LineClassifier::default().classify_line("####### text");
    assert_eq!(classified.kind, ConstructKind::PlainText);
}

#[test]
fn ordered_list_spacing_is_normalised() {
    assert_eq!(classify("3.   hello"), "3. hello");
    assert_eq!(classify("  42.\tanswer"), "42. answer");
}

#[test]
fn horizontal_rules_collapse() {
    for rule in ["***", "---", "___", "-*_", "----------"] {
        assert_eq!(classify(rule), "---", "input {rule:?}");
    }
}

#[test]
fn plain_text_keeps_indentation() {
    assert_eq!(classify("    indented words"), "    indented words");
    assert_eq!(classify("  two  "), "  two");
    assert_eq!(classify("flush"), "flush");
}

#[test]
fn link_policy_controls_surrounding_text() {
    let line = "see [docs](https://example.com) for more";
    assert_eq!(classify(line), "[docs](https://example.com)");
    assert_eq!(
        LineClassifier::new(LinkPolicy::PreserveSurrounding).classify(line),
        line
    );
}

#[test]
fn emphasis_is_left_intact() {
    assert_eq!(classify("a **b** c *d* e _f_"), "a **b** c *d* e _f_");
}

// ── Segmentation and assembly ───────────────────────────────────────────────

#[test]
fn paragraph_round_trip() {
    assert_eq!(segment("a\n\nb").len(), 2);
    assert_eq!(convert_text("a\n\nb"), "a\n\nb");
}

#[test]
fn blank_lines_pass_through_inside_paragraph() {
    assert_eq!(convert_text("a\n\t\nb"), "a\n\nb");
}

#[test]
fn end_to_end_document() {
    let input = "# Title\n\nSome *text* here.\n- item one\n- item two";
    assert_eq!(convert_text(input), input);
}

#[test]
fn messy_document_is_normalised() {
    let input = "#    Report\n\n1.   first\n2.  second\n\n>   note\n***";
    assert_eq!(
        convert_text(input),
        "# Report\n\n1. first\n2. second\n\n> note\n---"
    );
}

#[test]
fn fence_spanning_lines_is_verbatim() {
    let input = "intro\n```python\ndef f():\n\n    return 1\n```\noutro";
    assert_eq!(convert_text(input), input);

    let (_, stats) = convert_text_with(input, &LineClassifier::default());
    assert_eq!(stats.code_fences, 1);
    assert_eq!(stats.plain_lines, 2);
}

#[test]
fn fence_contents_are_not_classified() {
    let input = "```\n#   not a heading\n3.   not a list\n```";
    assert_eq!(convert_text(input), input);
}

#[test]
fn unterminated_fence_falls_back_to_lines() {
    assert_eq!(convert_text("```\n#  Heading"), "```\n# Heading");
}

#[test]
fn output_has_no_outer_whitespace() {
    let md = convert_text("\n\n  text  \n\n");
    assert_eq!(md, md.trim());
}
