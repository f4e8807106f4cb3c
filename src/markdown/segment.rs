//! Paragraph segmentation and reassembly.
//!
//! Text is split into paragraphs on `"\n\n"` and each paragraph into lines
//! on `"\n"`. Reassembly classifies every non-blank line, passes blank lines
//! through as empty strings, and closes each paragraph with one blank
//! separator line before the whole document is trimmed.
//!
//! Fenced code blocks are the one construct that spans real lines. While
//! segmenting, an opening fence switches the segmenter into `InFence`, and
//! every following line (including paragraph boundaries, which become blank
//! lines inside the block) is accumulated until the closing fence. The
//! finished block is emitted as a single [`Line`] with embedded newlines so
//! the classifier can treat it atomically.

use crate::markdown::classify::{ClassifiedLine, ConstructKind, LineClassifier};
use crate::markdown::fence;
use serde::{Deserialize, Serialize};

/// Count of leading whitespace characters in `line`.
pub(crate) fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// One line of a paragraph (or one assembled fenced block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    raw: String,
}

impl Line {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The line exactly as segmented.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of leading whitespace characters.
    pub fn indent(&self) -> usize {
        leading_whitespace(&self.raw)
    }

    /// The line with surrounding whitespace removed.
    pub fn content(&self) -> &str {
        self.raw.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.content().is_empty()
    }

    /// Whether this line is an assembled multi-line fenced block.
    pub fn is_fenced_block(&self) -> bool {
        self.raw.contains('\n')
    }
}

/// A blank-line-delimited group of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub lines: Vec<Line>,
}

impl Paragraph {
    fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }
}

/// Lines held back while inside a fence, with paragraph boundaries kept so
/// an unterminated fence can be replayed as ordinary lines.
#[derive(Debug, Default)]
struct FenceBuffer {
    items: Vec<Option<String>>,
}

impl FenceBuffer {
    fn push_line(&mut self, raw: &str) {
        self.items.push(Some(raw.to_string()));
    }

    fn push_boundary(&mut self) {
        self.items.push(None);
    }

    fn joined(&self) -> String {
        self.items
            .iter()
            .map(|item| item.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

enum State {
    Normal,
    InFence(FenceBuffer),
}

/// Split `text` into paragraphs of lines.
pub fn segment(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<Line> = Vec::new();
    let mut state = State::Normal;

    for (i, chunk) in text.split("\n\n").enumerate() {
        if i > 0 {
            match state {
                State::InFence(ref mut buffer) => buffer.push_boundary(),
                State::Normal => paragraphs.push(Paragraph::new(std::mem::take(&mut current))),
            }
        }

        for raw in chunk.split('\n') {
            state = match state {
                State::Normal if fence::is_fence_open(raw) => {
                    let mut buffer = FenceBuffer::default();
                    buffer.push_line(raw);
                    State::InFence(buffer)
                }
                State::Normal => {
                    current.push(Line::new(raw));
                    State::Normal
                }
                State::InFence(mut buffer) => {
                    buffer.push_line(raw);
                    if fence::is_fence_close(raw) {
                        current.push(Line::new(buffer.joined()));
                        State::Normal
                    } else {
                        State::InFence(buffer)
                    }
                }
            };
        }
    }

    if let State::InFence(buffer) = state {
        // Unterminated fence: replay the held lines as if no fence had opened.
        for item in buffer.items {
            match item {
                Some(raw) => current.push(Line::new(raw)),
                None => paragraphs.push(Paragraph::new(std::mem::take(&mut current))),
            }
        }
    }

    paragraphs.push(Paragraph::new(current));
    paragraphs
}

/// Per-construct line counts for one converted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructStats {
    pub code_fences: usize,
    pub headings: usize,
    pub ordered_items: usize,
    pub unordered_items: usize,
    pub quotes: usize,
    pub links: usize,
    pub horizontal_rules: usize,
    pub table_markers: usize,
    pub plain_lines: usize,
    pub blank_lines: usize,
}

impl ConstructStats {
    fn record(&mut self, kind: ConstructKind) {
        match kind {
            ConstructKind::CodeFence => self.code_fences += 1,
            ConstructKind::Heading(_) => self.headings += 1,
            ConstructKind::OrderedListItem => self.ordered_items += 1,
            ConstructKind::UnorderedListItem => self.unordered_items += 1,
            ConstructKind::Quote => self.quotes += 1,
            ConstructKind::Link => self.links += 1,
            ConstructKind::HorizontalRule => self.horizontal_rules += 1,
            ConstructKind::TableMarker => self.table_markers += 1,
            ConstructKind::PlainText => self.plain_lines += 1,
        }
    }
}

/// Classify every line of `paragraphs` and join them back into Markdown.
pub fn assemble(paragraphs: &[Paragraph], classifier: &LineClassifier) -> String {
    assemble_with_stats(paragraphs, classifier).0
}

/// Like [`assemble`], also counting the constructs that were produced.
pub fn assemble_with_stats(
    paragraphs: &[Paragraph],
    classifier: &LineClassifier,
) -> (String, ConstructStats) {
    let mut stats = ConstructStats::default();
    let mut out: Vec<String> = Vec::new();

    for paragraph in paragraphs {
        for line in &paragraph.lines {
            if line.is_blank() {
                stats.blank_lines += 1;
                out.push(String::new());
                continue;
            }
            let ClassifiedLine { kind, text } = classifier.classify_line(line.raw());
            stats.record(kind);
            out.push(text);
        }
        out.push(String::new());
    }

    (out.join("\n").trim().to_string(), stats)
}
