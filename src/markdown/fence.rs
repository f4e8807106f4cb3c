//! Fenced code block detection.
//!
//! A fenced block reaches the classifier as a single "line" with embedded
//! newlines: the opening fence, one or more content lines and the closing
//! fence. The segmenter assembles that token from real lines with a small
//! `Normal`/`InFence` state machine built on [`is_fence_open`] and
//! [`is_fence_close`]; [`match_fence`] then recognises the assembled block
//! and reproduces it verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^( {0,3})```([^\n]*)\n(.*?)\n( {0,3})```$").unwrap());

/// An opening marker: up to three spaces, three backticks, then an info
/// string that contains no further backticks.
static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}```[^`]*$").unwrap());

static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}```\s*$").unwrap());

/// A fenced code block captured from one assembled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub opening_indent: String,
    pub language: String,
    pub content: String,
    pub closing_indent: String,
}

impl FencedBlock {
    /// Render the block back to Markdown, keeping both indentation prefixes
    /// and the language tag exactly as captured.
    pub fn to_markdown(&self) -> String {
        format!(
            "{}```{}\n{}\n{}```",
            self.opening_indent, self.language, self.content, self.closing_indent
        )
    }
}

/// Match a complete fenced block encoded as one string.
///
/// Leading indentation is significant (0–3 spaces); trailing whitespace is
/// ignored.
pub fn match_fence(line: &str) -> Option<FencedBlock> {
    let caps = RE_FENCED_BLOCK.captures(line.trim_end())?;
    Some(FencedBlock {
        opening_indent: caps[1].to_string(),
        language: caps[2].to_string(),
        content: caps[3].to_string(),
        closing_indent: caps[4].to_string(),
    })
}

/// Whether a real line opens a fenced block.
pub fn is_fence_open(line: &str) -> bool {
    RE_FENCE_OPEN.is_match(line.trim_end())
}

/// Whether a real line closes a fenced block.
pub fn is_fence_close(line: &str) -> bool {
    RE_FENCE_CLOSE.is_match(line)
}
