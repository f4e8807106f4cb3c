//! Line classification: rewrite one line of extracted text as Markdown.
//!
//! The classifier is a fixed, ordered rule table. The first rule that
//! matches decides the construct; a line nothing matches is emitted as
//! plain text with its original indentation. Classification never fails.
//!
//! ## Rule Order
//!
//! ```text
//! 1. code fence        ```lang\n…\n```   (indentation kept)
//! 2. heading           # … ###### …       (levels 1–6 only)
//! 3. ordered item      12. …
//! 4. unordered item    * … / + … / - …
//! 5. quote             > …
//! 6. link              [text](url)        (see LinkPolicy)
//!    ── emphasis rewrite: **b**, *i*, _i_ ──
//! 7. horizontal rule   ---, ***, ___, -*_ …
//! 8. table marker      ...anything...
//! 9. plain text        indentation + trimmed content
//! ```
//!
//! Rules 2–9 look at the trimmed content only, so matched constructs lose
//! the source indentation and come out in canonical spacing. That makes the
//! output a fixed point: classifying a canonical line again returns it
//! unchanged.

use crate::markdown::fence;
use crate::markdown::segment::leading_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+) (.*)$").unwrap());
static RE_ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").unwrap());
static RE_UNORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([*+-])\s+(.*)$").unwrap());
static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s+(.*)$").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static RE_ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.*?)_").unwrap());

static RE_HORIZONTAL_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*_]{3,}$").unwrap());
static RE_TABLE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.\.\.(.*?)\.\.\.$").unwrap());

/// Highest heading level Markdown supports.
const MAX_HEADING_LEVEL: usize = 6;

/// The Markdown construct a line was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructKind {
    CodeFence,
    Heading(u8),
    OrderedListItem,
    UnorderedListItem,
    Quote,
    Link,
    HorizontalRule,
    TableMarker,
    PlainText,
}

/// A line after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub kind: ConstructKind,
    pub text: String,
}

impl ClassifiedLine {
    fn new(kind: ConstructKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// What the link rule does with text around the first `[text](url)`.
///
/// The legacy behaviour replaces the whole line with the link and drops
/// everything else on it. `PreserveSurrounding` leaves the line alone so it
/// falls through to the remaining rules intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkPolicy {
    /// Emit only the first link on the line. (default)
    #[default]
    LinkOnly,
    /// Keep the whole line; links are already valid Markdown.
    PreserveSurrounding,
}

/// A rule sees the classifier, the raw line and its trimmed content.
type Rule = fn(&LineClassifier, &str, &str) -> Option<ClassifiedLine>;

/// Rules evaluated before the emphasis rewrite, in priority order.
const STRUCTURAL_RULES: [Rule; 6] = [
    code_fence_rule,
    heading_rule,
    ordered_item_rule,
    unordered_item_rule,
    quote_rule,
    link_rule,
];

/// Rules evaluated on the emphasis-rewritten content.
const REWRITTEN_RULES: [fn(&str) -> Option<ClassifiedLine>; 2] =
    [horizontal_rule_rule, table_marker_rule];

/// Rewrites single lines of extracted text into Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineClassifier {
    link_policy: LinkPolicy,
}

impl LineClassifier {
    pub fn new(link_policy: LinkPolicy) -> Self {
        Self { link_policy }
    }

    pub fn link_policy(&self) -> LinkPolicy {
        self.link_policy
    }

    /// Classify `line` and return the Markdown text only.
    pub fn classify(&self, line: &str) -> String {
        self.classify_line(line).text
    }

    /// Classify `line`, returning the construct kind alongside the text.
    pub fn classify_line(&self, line: &str) -> ClassifiedLine {
        let content = line.trim();

        for rule in STRUCTURAL_RULES {
            if let Some(classified) = rule(self, line, content) {
                return classified;
            }
        }

        let rewritten = rewrite_emphasis(content);

        for rule in REWRITTEN_RULES {
            if let Some(classified) = rule(&rewritten) {
                return classified;
            }
        }

        let indent = leading_whitespace(line);
        ClassifiedLine::new(
            ConstructKind::PlainText,
            format!("{}{}", " ".repeat(indent), rewritten.trim()),
        )
    }
}

/// Classify one line with the default [`LineClassifier`].
pub fn classify(line: &str) -> String {
    LineClassifier::default().classify(line)
}

/// Rewrite `**bold**`, `*italic*` and `_italic_` spans.
///
/// The rewrite is the identity on its matches: downstream renderers read the
/// same syntax, so spans are normalised in place rather than stripped.
pub fn rewrite_emphasis(content: &str) -> String {
    let s = RE_BOLD.replace_all(content, "**${1}**");
    let s = RE_ITALIC_STAR.replace_all(&s, "*${1}*");
    RE_ITALIC_UNDERSCORE
        .replace_all(&s, "_${1}_")
        .into_owned()
}

// ── Structural rules ─────────────────────────────────────────────────────────

fn code_fence_rule(_: &LineClassifier, line: &str, _: &str) -> Option<ClassifiedLine> {
    fence::match_fence(line)
        .map(|block| ClassifiedLine::new(ConstructKind::CodeFence, block.to_markdown()))
}

fn heading_rule(_: &LineClassifier, _: &str, content: &str) -> Option<ClassifiedLine> {
    let caps = RE_HEADING.captures(content)?;
    let level = caps[1].len();
    if !(1..=MAX_HEADING_LEVEL).contains(&level) {
        return None;
    }
    Some(ClassifiedLine::new(
        ConstructKind::Heading(level as u8),
        format!("{} {}", "#".repeat(level), caps[2].trim()),
    ))
}

fn ordered_item_rule(_: &LineClassifier, _: &str, content: &str) -> Option<ClassifiedLine> {
    let caps = RE_ORDERED_ITEM.captures(content)?;
    Some(ClassifiedLine::new(
        ConstructKind::OrderedListItem,
        format!("{}. {}", &caps[1], &caps[2]),
    ))
}

fn unordered_item_rule(_: &LineClassifier, _: &str, content: &str) -> Option<ClassifiedLine> {
    let caps = RE_UNORDERED_ITEM.captures(content)?;
    Some(ClassifiedLine::new(
        ConstructKind::UnorderedListItem,
        format!("{} {}", &caps[1], &caps[2]),
    ))
}

fn quote_rule(_: &LineClassifier, _: &str, content: &str) -> Option<ClassifiedLine> {
    let caps = RE_QUOTE.captures(content)?;
    Some(ClassifiedLine::new(
        ConstructKind::Quote,
        format!("> {}", caps[1].trim()),
    ))
}

fn link_rule(classifier: &LineClassifier, _: &str, content: &str) -> Option<ClassifiedLine> {
    if classifier.link_policy == LinkPolicy::PreserveSurrounding {
        return None;
    }
    let caps = RE_LINK.captures(content)?;
    Some(ClassifiedLine::new(
        ConstructKind::Link,
        format!("[{}]({})", &caps[1], &caps[2]),
    ))
}

// ── Rules on rewritten content ───────────────────────────────────────────────

fn horizontal_rule_rule(content: &str) -> Option<ClassifiedLine> {
    RE_HORIZONTAL_RULE
        .is_match(content)
        .then(|| ClassifiedLine::new(ConstructKind::HorizontalRule, "---"))
}

fn table_marker_rule(content: &str) -> Option<ClassifiedLine> {
    RE_TABLE_MARKER
        .is_match(content)
        .then(|| ClassifiedLine::new(ConstructKind::TableMarker, content))
}
