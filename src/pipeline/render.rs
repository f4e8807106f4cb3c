//! Markdown rendering: lay a Markdown fragment out on one page and
//! rasterise it to an image via pdfium.
//!
//! Rendering is two steps:
//!
//! 1. [`PageLayout::build`] walks pulldown-cmark events and produces
//!    positioned text runs and rules in page points. This step is pure and
//!    needs no native library.
//! 2. [`render_unit_blocking`] draws the layout onto a fresh single-page PDF
//!    using pdfium's built-in fonts and rasterises it at the configured DPI.
//!
//! Glyph widths are approximated per font face rather than measured, so
//! wrapping is close to but not exactly what a typesetter would produce.
//! Content that does not fit on the page is clipped.
//!
//! pdfium is not safe to call from async contexts, so the async entry point
//! moves the work onto `spawn_blocking`.

use crate::config::ConversionConfig;
use crate::error::{Doc2MdError, UnitError};
use crate::pipeline::pdfium;
use image::DynamicImage;
use pdfium_render::prelude::*;
use pulldown_cmark::{Event, Parser, Tag};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

// ── Options ──────────────────────────────────────────────────────────────────

/// Page geometry and typography of the rendered image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Page width in points. Default: 595 (A4).
    pub page_width_pt: f32,
    /// Page height in points. Default: 842 (A4).
    pub page_height_pt: f32,
    /// Margin on every side, in points. Default: 48.
    pub margin_pt: f32,
    /// Body text size in points. Default: 11.
    pub base_font_size: f32,
    /// Line height as a multiple of the font size. Default: 1.35.
    pub line_spacing: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_width_pt: 595.0,
            page_height_pt: 842.0,
            margin_pt: 48.0,
            base_font_size: 11.0,
            line_spacing: 1.35,
        }
    }
}

impl LayoutOptions {
    /// Check that the options describe a page with room for text.
    pub fn validate(&self) -> Result<(), Doc2MdError> {
        if self.page_width_pt <= 0.0 || self.page_height_pt <= 0.0 {
            return Err(Doc2MdError::InvalidConfig(
                "Page dimensions must be positive".into(),
            ));
        }
        let min_side = self.page_width_pt.min(self.page_height_pt);
        if self.margin_pt < 0.0 || self.margin_pt * 2.0 >= min_side {
            return Err(Doc2MdError::InvalidConfig(format!(
                "Margin {}pt leaves no room on a {}x{}pt page",
                self.margin_pt, self.page_width_pt, self.page_height_pt
            )));
        }
        if !(4.0..=72.0).contains(&self.base_font_size) {
            return Err(Doc2MdError::InvalidConfig(format!(
                "Base font size must be 4–72pt, got {}",
                self.base_font_size
            )));
        }
        if self.line_spacing < 1.0 {
            return Err(Doc2MdError::InvalidConfig(
                "Line spacing must be ≥ 1.0".into(),
            ));
        }
        Ok(())
    }

    fn content_width(&self) -> f32 {
        self.page_width_pt - 2.0 * self.margin_pt
    }

    fn bottom_limit(&self) -> f32 {
        self.page_height_pt - self.margin_pt
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// One of pdfium's standard fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    Mono,
}

impl FontFace {
    /// Approximate average glyph advance as a fraction of the font size.
    fn advance(self) -> f32 {
        match self {
            FontFace::Regular | FontFace::Italic => 0.5,
            FontFace::Bold => 0.55,
            FontFace::Mono => 0.6,
        }
    }

    fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * self.advance() * size
    }
}

/// A positioned element of a page. Coordinates are in points from the
/// top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Text {
        x_pt: f32,
        baseline_pt: f32,
        size_pt: f32,
        face: FontFace,
        text: String,
    },
    Rule {
        x1_pt: f32,
        y1_pt: f32,
        x2_pt: f32,
        y2_pt: f32,
        width_pt: f32,
    },
}

/// A fully positioned page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width_pt: f32,
    pub height_pt: f32,
    pub items: Vec<LayoutItem>,
    /// True if some content did not fit and was dropped.
    pub overflowed: bool,
}

impl PageLayout {
    /// Lay out a Markdown fragment.
    pub fn build(markdown: &str, options: &LayoutOptions) -> Self {
        let mut builder = LayoutBuilder::new(options);
        for event in Parser::new(markdown) {
            builder.event(event);
        }
        builder.finish()
    }

    /// Text of every run, in drawing order.
    pub fn text_runs(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            LayoutItem::Text { text, .. } => Some(text.as_str()),
            LayoutItem::Rule { .. } => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Blocks the layout builder tracks between a start and an end event.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Open {
    Paragraph,
    Heading(f32),
    List,
    Item,
    Quote,
    CodeBlock,
    Emphasis,
    Strong,
    Other,
}

#[derive(Debug, Clone)]
struct Run {
    text: String,
    face: FontFace,
}

struct LayoutBuilder<'a> {
    options: &'a LayoutOptions,
    items: Vec<LayoutItem>,
    /// Top of the next line, in points from the page top.
    cursor: f32,
    overflowed: bool,
    stack: Vec<Open>,
    /// Counters of the enclosing lists; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    runs: Vec<Run>,
    prefix: Option<String>,
    code: String,
}

impl<'a> LayoutBuilder<'a> {
    fn new(options: &'a LayoutOptions) -> Self {
        Self {
            options,
            items: Vec::new(),
            cursor: options.margin_pt,
            overflowed: false,
            stack: Vec::new(),
            lists: Vec::new(),
            runs: Vec::new(),
            prefix: None,
            code: String::new(),
        }
    }

    fn finish(mut self) -> PageLayout {
        self.flush_block();
        PageLayout {
            width_pt: self.options.page_width_pt,
            height_pt: self.options.page_height_pt,
            items: self.items,
            overflowed: self.overflowed,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => {
                if let Some(open) = self.stack.pop() {
                    self.end(open);
                }
            }
            Event::Text(text) => {
                if self.in_code_block() {
                    self.code.push_str(&text);
                } else {
                    self.push_text(&text, self.inline_face());
                }
            }
            Event::Code(code) => self.push_text(&code, FontFace::Mono),
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_text(&html, self.inline_face())
            }
            Event::SoftBreak => self.push_text(" ", self.inline_face()),
            Event::HardBreak => self.push_text("\n", FontFace::Regular),
            Event::Rule => {
                self.flush_block();
                self.rule();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => Open::Paragraph,
            Tag::Heading { level, .. } => {
                self.flush_block();
                Open::Heading(heading_scale(level as usize))
            }
            Tag::List(first) => {
                self.flush_block();
                self.lists.push(first);
                Open::List
            }
            Tag::Item => {
                self.flush_block();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}.", n);
                        *n += 1;
                        marker
                    }
                    _ => "\u{2022}".to_string(),
                };
                self.prefix = Some(marker);
                Open::Item
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                Open::Quote
            }
            Tag::CodeBlock(_) => {
                self.flush_block();
                self.code.clear();
                Open::CodeBlock
            }
            Tag::Emphasis => Open::Emphasis,
            Tag::Strong => Open::Strong,
            _ => Open::Other,
        };
        self.stack.push(open);
    }

    fn end(&mut self, open: Open) {
        match open {
            Open::Paragraph | Open::Item => self.flush_block(),
            Open::Heading(scale) => self.flush_heading(scale),
            Open::List => {
                self.flush_block();
                self.lists.pop();
            }
            Open::Quote => self.flush_block(),
            Open::CodeBlock => self.flush_code(),
            Open::Emphasis | Open::Strong | Open::Other => {}
        }
    }

    fn in_code_block(&self) -> bool {
        self.stack.contains(&Open::CodeBlock)
    }

    fn inline_face(&self) -> FontFace {
        if self.stack.iter().any(|o| matches!(o, Open::Strong | Open::Heading(_))) {
            FontFace::Bold
        } else if self.stack.contains(&Open::Emphasis) {
            FontFace::Italic
        } else {
            FontFace::Regular
        }
    }

    fn quote_depth(&self) -> usize {
        self.stack.iter().filter(|o| **o == Open::Quote).count()
    }

    fn indent(&self) -> f32 {
        let size = self.options.base_font_size;
        self.quote_depth() as f32 * size * 1.6 + self.lists.len() as f32 * size * 1.8
    }

    fn push_text(&mut self, text: &str, face: FontFace) {
        match self.runs.last_mut() {
            Some(last) if last.face == face => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                face,
            }),
        }
    }

    fn flush_block(&mut self) {
        let size = self.options.base_font_size;
        self.flush_runs(size);
    }

    fn flush_heading(&mut self, scale: f32) {
        let size = self.options.base_font_size * scale;
        self.cursor += size * 0.3;
        self.flush_runs(size);
    }

    fn flush_runs(&mut self, size: f32) {
        let runs = std::mem::take(&mut self.runs);
        let prefix = self.prefix.take();
        if runs.iter().all(|r| r.text.trim().is_empty()) && prefix.is_none() {
            return;
        }

        let indent = self.indent();
        let x0 = self.options.margin_pt + indent;
        let width = self.options.content_width() - indent;
        let line_height = size * self.options.line_spacing;
        let top = self.cursor;

        if let Some(marker) = prefix {
            let marker_x = x0 - FontFace::Regular.text_width(&marker, size) - size * 0.4;
            self.place_text(marker_x.max(self.options.margin_pt), size, FontFace::Regular, marker);
        }

        for line in wrap_runs(&runs, size, width) {
            let mut x = x0;
            for span in line {
                let advance = span.face.text_width(&span.text, size);
                if !span.text.trim().is_empty() {
                    self.place_text(x, size, span.face, span.text);
                }
                x += advance;
            }
            self.cursor += line_height;
        }
        if self.cursor == top {
            self.cursor += line_height;
        }

        self.quote_bar(top);
        self.cursor += size * 0.5;
    }

    fn flush_code(&mut self) {
        let size = self.options.base_font_size * 0.9;
        let line_height = size * self.options.line_spacing;
        let x = self.options.margin_pt + self.indent() + size;
        let max_chars = ((self.options.content_width() - self.indent() - size)
            / (FontFace::Mono.advance() * size))
            .max(1.0) as usize;
        let top = self.cursor;

        let code = std::mem::take(&mut self.code);
        for line in code.trim_end_matches('\n').split('\n') {
            let clipped: String = line.chars().take(max_chars).collect();
            if !clipped.trim().is_empty() {
                self.place_text(x, size, FontFace::Mono, clipped);
            }
            self.cursor += line_height;
        }

        let bar_x = x - size * 0.5;
        self.push_rule(bar_x, top, bar_x, self.cursor, 0.75);
        self.cursor += size * 0.5;
    }

    fn rule(&mut self) {
        let size = self.options.base_font_size;
        let y = self.cursor + size * 0.5;
        let x1 = self.options.margin_pt + self.indent();
        let x2 = self.options.page_width_pt - self.options.margin_pt;
        self.push_rule(x1, y, x2, y, 1.0);
        self.cursor += size * 1.2;
    }

    fn quote_bar(&mut self, top: f32) {
        let depth = self.quote_depth();
        if depth == 0 {
            return;
        }
        let size = self.options.base_font_size;
        for level in 0..depth {
            let x = self.options.margin_pt + level as f32 * size * 1.6 + size * 0.4;
            self.push_rule(x, top, x, self.cursor, 1.5);
        }
    }

    fn place_text(&mut self, x_pt: f32, size_pt: f32, face: FontFace, text: String) {
        let baseline_pt = self.cursor + size_pt;
        if baseline_pt > self.options.bottom_limit() {
            self.overflowed = true;
            return;
        }
        self.items.push(LayoutItem::Text {
            x_pt,
            baseline_pt,
            size_pt,
            face,
            text,
        });
    }

    fn push_rule(&mut self, x1_pt: f32, y1_pt: f32, x2_pt: f32, y2_pt: f32, width_pt: f32) {
        let limit = self.options.bottom_limit();
        if y1_pt > limit {
            self.overflowed = true;
            return;
        }
        self.items.push(LayoutItem::Rule {
            x1_pt,
            y1_pt,
            x2_pt,
            y2_pt: y2_pt.min(limit),
            width_pt,
        });
    }
}

fn heading_scale(level: usize) -> f32 {
    match level {
        1 => 2.0,
        2 => 1.6,
        3 => 1.3,
        4 => 1.15,
        _ => 1.0,
    }
}

/// Greedy word wrap of styled runs into lines of styled spans.
fn wrap_runs(runs: &[Run], size: f32, width: f32) -> Vec<Vec<Run>> {
    let mut lines: Vec<Vec<Run>> = Vec::new();
    let mut line: Vec<Run> = Vec::new();
    let mut used = 0.0f32;

    let push_span = |line: &mut Vec<Run>, text: &str, face: FontFace| match line.last_mut() {
        Some(last) if last.face == face => last.text.push_str(text),
        _ => line.push(Run {
            text: text.to_string(),
            face,
        }),
    };

    for run in runs {
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(std::mem::take(&mut line));
                used = 0.0;
            }
            for word in segment.split_inclusive(char::is_whitespace) {
                let bare = word.trim_end();
                let word_width = run.face.text_width(bare, size);

                if used > 0.0 && used + word_width > width {
                    lines.push(std::mem::take(&mut line));
                    used = 0.0;
                }
                if used == 0.0 && word.trim().is_empty() {
                    continue;
                }

                if word_width > width {
                    // Break an over-long word at the character level.
                    let per_line = (width / (run.face.advance() * size)).max(1.0) as usize;
                    let chars: Vec<char> = bare.chars().collect();
                    for chunk in chars.chunks(per_line) {
                        if used > 0.0 {
                            lines.push(std::mem::take(&mut line));
                        }
                        let piece: String = chunk.iter().collect();
                        used = run.face.text_width(&piece, size);
                        push_span(&mut line, &piece, run.face);
                    }
                    if word.len() > bare.len() {
                        push_span(&mut line, " ", run.face);
                        used += run.face.text_width(" ", size);
                    }
                    continue;
                }

                push_span(&mut line, word, run.face);
                used += run.face.text_width(word, size);
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// ── Rasterisation ────────────────────────────────────────────────────────────

/// Rendering parameters lifted out of [`ConversionConfig`] so they can move
/// into a blocking task.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub layout: LayoutOptions,
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub pdfium_library_path: Option<PathBuf>,
}

impl From<&ConversionConfig> for RenderSettings {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            pdfium_library_path: config.pdfium_library_path.clone(),
        }
    }
}

/// Render one unit's Markdown to an image.
pub async fn render_unit(
    unit: usize,
    markdown: String,
    settings: RenderSettings,
) -> Result<DynamicImage, UnitError> {
    tokio::task::spawn_blocking(move || render_unit_blocking(unit, &markdown, &settings))
        .await
        .map_err(|e| UnitError::RenderFailed {
            unit,
            detail: format!("Render task panicked: {}", e),
        })?
}

/// Blocking implementation of [`render_unit`].
pub fn render_unit_blocking(
    unit: usize,
    markdown: &str,
    settings: &RenderSettings,
) -> Result<DynamicImage, UnitError> {
    let fail = |detail: String| UnitError::RenderFailed { unit, detail };

    let layout = PageLayout::build(markdown, &settings.layout);
    if layout.overflowed {
        debug!("Unit {}: content exceeds one page and was clipped", unit);
    }

    let pdfium = pdfium::bind(settings.pdfium_library_path.as_deref())
        .map_err(|e| fail(e.to_string()))?;
    let image = draw_layout(&pdfium, &layout, settings.dpi, settings.max_rendered_pixels)
        .map_err(|e| fail(format!("{:?}", e)))?;

    debug!(
        "Rendered unit {} → {}x{} px ({} items)",
        unit,
        image.width(),
        image.height(),
        layout.items.len()
    );
    Ok(image)
}

fn draw_layout(
    pdfium: &Pdfium,
    layout: &PageLayout,
    dpi: u32,
    max_pixels: u32,
) -> Result<DynamicImage, PdfiumError> {
    let mut document = pdfium.create_new_pdf()?;

    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();
    let italic = document.fonts_mut().helvetica_oblique();
    let mono = document.fonts_mut().courier();

    let paper = PdfPagePaperSize::from_points(
        PdfPoints::new(layout.width_pt),
        PdfPoints::new(layout.height_pt),
    );
    let mut page = document.pages_mut().create_page_at_end(paper)?;
    let height = layout.height_pt;

    for item in &layout.items {
        match item {
            LayoutItem::Text {
                x_pt,
                baseline_pt,
                size_pt,
                face,
                text,
            } => {
                let font = match face {
                    FontFace::Regular => regular,
                    FontFace::Bold => bold,
                    FontFace::Italic => italic,
                    FontFace::Mono => mono,
                };
                page.objects_mut().create_text_object(
                    PdfPoints::new(*x_pt),
                    PdfPoints::new(height - baseline_pt),
                    text,
                    font,
                    PdfPoints::new(*size_pt),
                )?;
            }
            LayoutItem::Rule {
                x1_pt,
                y1_pt,
                x2_pt,
                y2_pt,
                width_pt,
            } => {
                page.objects_mut().create_path_object_line(
                    PdfPoints::new(*x1_pt),
                    PdfPoints::new(height - y1_pt),
                    PdfPoints::new(*x2_pt),
                    PdfPoints::new(height - y2_pt),
                    PdfColor::new(128, 128, 128, 255),
                    PdfPoints::new(*width_pt),
                )?;
            }
        }
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page.render_with_config(&render_config)?;
    Ok(bitmap.as_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(md: &str) -> PageLayout {
        PageLayout::build(md, &LayoutOptions::default())
    }

    fn texts(md: &str) -> Vec<String> {
        layout(md).text_runs().map(str::to_string).collect()
    }

    #[test]
    fn default_options_are_valid() {
        assert!(LayoutOptions::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_degenerate_pages() {
        let bad_margin = LayoutOptions {
            margin_pt: 300.0,
            ..LayoutOptions::default()
        };
        assert!(bad_margin.validate().is_err());

        let bad_font = LayoutOptions {
            base_font_size: 1.0,
            ..LayoutOptions::default()
        };
        assert!(bad_font.validate().is_err());
    }

    #[test]
    fn empty_markdown_has_no_items() {
        let l = layout("");
        assert!(l.is_empty());
        assert!(!l.overflowed);
    }

    #[test]
    fn heading_is_larger_and_bold() {
        let l = layout("# Title\n\nbody");
        let sizes: Vec<(f32, FontFace)> = l
            .items
            .iter()
            .filter_map(|i| match i {
                LayoutItem::Text { size_pt, face, .. } => Some((*size_pt, *face)),
                _ => None,
            })
            .collect();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0], (22.0, FontFace::Bold));
        assert_eq!(sizes[1], (11.0, FontFace::Regular));
    }

    #[test]
    fn lines_advance_down_the_page() {
        let l = layout("first\n\nsecond");
        let baselines: Vec<f32> = l
            .items
            .iter()
            .filter_map(|i| match i {
                LayoutItem::Text { baseline_pt, .. } => Some(*baseline_pt),
                _ => None,
            })
            .collect();
        assert_eq!(baselines.len(), 2);
        assert!(baselines[1] > baselines[0]);
    }

    #[test]
    fn list_items_get_markers() {
        let t = texts("- one\n- two");
        assert_eq!(t, vec!["\u{2022}", "one", "\u{2022}", "two"]);

        let t = texts("3. three\n4. four");
        assert_eq!(t, vec!["3.", "three", "4.", "four"]);
    }

    #[test]
    fn emphasis_changes_face() {
        let l = layout("plain *slanted* **heavy**");
        let faces: Vec<FontFace> = l
            .items
            .iter()
            .filter_map(|i| match i {
                LayoutItem::Text { face, .. } => Some(*face),
                _ => None,
            })
            .collect();
        assert_eq!(
            faces,
            vec![FontFace::Regular, FontFace::Italic, FontFace::Bold]
        );
    }

    #[test]
    fn horizontal_rule_draws_a_line() {
        let l = layout("above\n\n---\n\nbelow");
        assert!(l.items.iter().any(|i| matches!(i, LayoutItem::Rule { y1_pt, y2_pt, .. } if y1_pt == y2_pt)));
    }

    #[test]
    fn code_block_is_monospaced_and_verbatim() {
        let l = layout("```rust\nfn main() {\n    x();\n}\n```");
        let code: Vec<(&str, FontFace)> = l
            .items
            .iter()
            .filter_map(|i| match i {
                LayoutItem::Text { text, face, .. } => Some((text.as_str(), *face)),
                _ => None,
            })
            .collect();
        assert_eq!(
            code,
            vec![
                ("fn main() {", FontFace::Mono),
                ("    x();", FontFace::Mono),
                ("}", FontFace::Mono),
            ]
        );
    }

    #[test]
    fn quote_is_indented_with_bar() {
        let plain = layout("text");
        let quoted = layout("> text");
        let x_of = |l: &PageLayout| {
            l.items.iter().find_map(|i| match i {
                LayoutItem::Text { x_pt, .. } => Some(*x_pt),
                _ => None,
            })
        };
        assert!(x_of(&quoted) > x_of(&plain));
        assert!(quoted
            .items
            .iter()
            .any(|i| matches!(i, LayoutItem::Rule { x1_pt, x2_pt, .. } if x1_pt == x2_pt)));
    }

    #[test]
    fn long_paragraph_wraps() {
        let words = vec!["word"; 200].join(" ");
        let l = layout(&words);
        let lines = l.text_runs().count();
        assert!(lines > 1);
        for item in &l.items {
            if let LayoutItem::Text { x_pt, text, size_pt, face, .. } = item {
                let right = x_pt + face.text_width(text.trim_end(), *size_pt);
                assert!(right <= 595.0 - 48.0 + 0.01, "run overflows: {}", right);
            }
        }
    }

    #[test]
    fn overflow_is_clipped_and_flagged() {
        let md = (0..200).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n\n");
        let l = layout(&md);
        assert!(l.overflowed);
        for item in &l.items {
            if let LayoutItem::Text { baseline_pt, .. } = item {
                assert!(*baseline_pt <= 842.0 - 48.0);
            }
        }
    }

    #[test]
    fn over_long_word_is_split() {
        let word = "x".repeat(500);
        let l = layout(&word);
        assert!(l.text_runs().count() > 1);
        let joined: String = l.text_runs().collect();
        assert_eq!(joined, word);
    }

    #[test]
    fn settings_follow_config() {
        let config = ConversionConfig::builder().dpi(150).build().expect("valid");
        let settings = RenderSettings::from(&config);
        assert_eq!(settings.dpi, 150);
        assert_eq!(settings.max_rendered_pixels, 4000);
    }
}
