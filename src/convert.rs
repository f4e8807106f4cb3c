//! Eager (full-document) conversion entry points.
//!
//! [`convert`] waits for every unit and returns a [`ConversionOutput`]
//! describing what was written. Use [`crate::stream::convert_stream`]
//! instead to receive units as they finish.
//!
//! A unit's work runs in a fixed order: classify → write `.md` → render
//! `.png` → embed `.npy`. Only a failed Markdown write (or an unreadable
//! unit) fails the unit; render and embedding failures are recorded and the
//! unit still counts as converted.

use crate::config::{ConversionConfig, UnitSelection};
use crate::error::{Doc2MdError, UnitError};
use crate::markdown::{self, LineClassifier};
use crate::output::{ConversionOutput, ConversionStats, DocumentInfo, UnitResult};
use crate::pipeline::embed::EmbeddingService;
use crate::pipeline::extract::{self, SourceUnit};
use crate::pipeline::input::{self, DocumentKind, ResolvedInput};
use crate::pipeline::render::{self, RenderSettings};
use crate::pipeline::{pdfium, sink};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF, DOCX or TXT file into per-unit Markdown files.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_path` — the source document
/// * `output_dir` — created if missing; receives `{base}_page_{n}.*`
/// * `config` — conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some units failed
/// (check `output.stats.failed_units`).
///
/// # Errors
/// Returns `Err(Doc2MdError)` only for fatal errors:
/// - File not found / permission denied / unsupported type
/// - Unreadable container
/// - Output directory not usable
/// - Every selected unit failed
pub async fn convert(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let total_start = Instant::now();
    let prepared = prepare(input_path.as_ref(), output_dir.as_ref(), config).await?;
    let selected = prepared.units.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let context = Arc::clone(&prepared.context);
    let mut units: Vec<UnitResult> = stream::iter(prepared.units)
        .map(|source| process_unit(source, Arc::clone(&context)))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;
    units.sort_by_key(|u| u.index);

    let processed = units.iter().filter(|u| u.is_success()).count();
    let failed = units.len() - processed;

    if processed == 0 && !units.is_empty() {
        let first_error = units
            .iter()
            .find_map(|u| u.errors.first())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Doc2MdError::AllUnitsFailed {
            total: units.len(),
            first_error,
        });
    }

    let stats = ConversionStats {
        total_units: prepared.document.unit_count,
        processed_units: processed,
        failed_units: failed,
        skipped_units: prepared.document.unit_count.saturating_sub(selected),
        rendered_images: units.iter().filter(|u| u.image_path.is_some()).count(),
        render_failures: units
            .iter()
            .flat_map(|u| &u.errors)
            .filter(|e| matches!(e, UnitError::RenderFailed { .. }))
            .count(),
        embeddings: units.iter().filter(|u| u.embedding_path.is_some()).count(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms: prepared.extract_duration_ms,
    };

    info!(
        "Conversion complete: {}/{} {}s, {}ms total",
        processed,
        selected,
        prepared.document.kind.unit_name(),
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, processed);
    }

    Ok(ConversionOutput {
        document: prepared.document,
        output_dir: output_dir.as_ref().to_path_buf(),
        units,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_path, output_dir, config))
}

/// Detect a document's kind and count its units without writing anything.
pub async fn inspect(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentInfo, Doc2MdError> {
    let resolved = input::resolve_input(input_path)?;
    let units = extract::extract_units(&resolved, config).await?;
    Ok(document_info(&resolved, units.len()))
}

/// Classify a whole text file as a single Markdown document.
///
/// Unlike [`convert`], the file is not split into line units: paragraphs
/// and fenced blocks spanning several lines are kept together.
pub async fn convert_text_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<String, Doc2MdError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Doc2MdError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Doc2MdError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Doc2MdError::ReadFailed {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let text = String::from_utf8(bytes).map_err(|e| Doc2MdError::CorruptDocument {
        path: path.to_path_buf(),
        detail: format!("not valid UTF-8: {}", e),
    })?;
    let classifier = LineClassifier::new(config.link_policy);
    let (md, _) = markdown::convert_text_with(&extract::normalise_line_endings(&text), &classifier);
    Ok(md)
}

// ── Shared with the streaming API ────────────────────────────────────────────

/// Everything a unit needs, shared between concurrent unit tasks.
pub(crate) struct UnitContext {
    classifier: LineClassifier,
    output_dir: PathBuf,
    base_name: String,
    total: usize,
    render: RenderPlan,
    embedding: Option<Arc<EmbeddingService>>,
    progress: Option<ProgressCallback>,
}

/// Whether and how units are rendered.
enum RenderPlan {
    Disabled,
    Enabled(RenderSettings),
    /// Rendering was requested but pdfium could not be bound.
    Unavailable(String),
}

/// A document that has been resolved, extracted and filtered to the
/// selected units.
pub(crate) struct Prepared {
    pub(crate) document: DocumentInfo,
    pub(crate) units: Vec<SourceUnit>,
    pub(crate) context: Arc<UnitContext>,
    pub(crate) extract_duration_ms: u64,
}

pub(crate) async fn prepare(
    input_path: &Path,
    output_dir: &Path,
    config: &ConversionConfig,
) -> Result<Prepared, Doc2MdError> {
    info!("Starting conversion: {}", input_path.display());

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_path)?;

    // ── Step 2: Output directory ─────────────────────────────────────────
    sink::ensure_output_dir(output_dir).await?;

    // ── Step 3: Native library ───────────────────────────────────────────
    // PDF extraction cannot proceed without pdfium. Rendering can: units
    // still get their Markdown and record the render failure.
    let pdfium_bound = resolved.kind == DocumentKind::Pdf;
    if pdfium_bound {
        check_pdfium(config).await?;
    }
    let render = if !config.render_images {
        RenderPlan::Disabled
    } else if pdfium_bound {
        RenderPlan::Enabled(RenderSettings::from(config))
    } else {
        match check_pdfium(config).await {
            Ok(()) => RenderPlan::Enabled(RenderSettings::from(config)),
            Err(e) => {
                warn!("Rendering unavailable, writing Markdown only: {}", e);
                RenderPlan::Unavailable(e.to_string())
            }
        }
    };
    if config.embedding.is_some() && !config.render_images {
        warn!("Embeddings are computed from rendered images; with rendering disabled none will be produced");
    }

    // ── Step 4: Extract units ────────────────────────────────────────────
    let extract_start = Instant::now();
    let all_units = extract::extract_units(&resolved, config).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    let total = all_units.len();

    // ── Step 5: Select units ─────────────────────────────────────────────
    let indices = config.units.to_indices(total);
    if indices.is_empty() && total > 0 {
        return Err(Doc2MdError::UnitOutOfRange {
            unit: first_requested(&config.units),
            total,
        });
    }
    debug!("Selected {} of {} units", indices.len(), total);

    let mut wanted = indices.into_iter().peekable();
    let units: Vec<SourceUnit> = all_units
        .into_iter()
        .enumerate()
        .filter_map(|(i, unit)| {
            if wanted.peek() == Some(&i) {
                wanted.next();
                Some(unit)
            } else {
                None
            }
        })
        .collect();

    let context = Arc::new(UnitContext {
        classifier: LineClassifier::new(config.link_policy),
        output_dir: output_dir.to_path_buf(),
        base_name: resolved.base_name.clone(),
        total: units.len(),
        render,
        embedding: config.embedding.clone(),
        progress: config.progress_callback.clone(),
    });

    Ok(Prepared {
        document: document_info(&resolved, total),
        units,
        context,
        extract_duration_ms,
    })
}

/// Convert one unit end to end. Never fails: errors land in the result.
pub(crate) async fn process_unit(source: SourceUnit, ctx: Arc<UnitContext>) -> UnitResult {
    let start = Instant::now();
    let index = source.index;
    let mut result = UnitResult::new(index);

    if let Some(ref cb) = ctx.progress {
        cb.on_unit_start(index, ctx.total);
    }

    let text = match source.text {
        Ok(text) => text,
        Err(e) => {
            record(&ctx, &mut result, e);
            return finish(result, start);
        }
    };

    let (md, constructs) = markdown::convert_text_with(&text, &ctx.classifier);
    result.constructs = constructs;

    let paths = sink::unit_paths(&ctx.output_dir, &ctx.base_name, index);
    if let Err(e) = sink::write_markdown(index, &paths.markdown, &md).await {
        result.markdown = md;
        record(&ctx, &mut result, e);
        return finish(result, start);
    }
    result.markdown_path = Some(paths.markdown.clone());

    if let Some(ref cb) = ctx.progress {
        cb.on_unit_complete(index, ctx.total, md.len());
    }

    if let RenderPlan::Unavailable(ref reason) = ctx.render {
        record(
            &ctx,
            &mut result,
            UnitError::RenderFailed {
                unit: index,
                detail: reason.clone(),
            },
        );
    }

    if let RenderPlan::Enabled(ref settings) = ctx.render {
        match render::render_unit(index, md.clone(), settings.clone()).await {
            Ok(image) => {
                let embedding = ctx.embedding.clone();
                let image_path = paths.image.clone();
                let npy_path = paths.embedding.clone();
                let persisted = tokio::task::spawn_blocking(move || {
                    persist_image(index, &image, &image_path, &npy_path, embedding.as_deref())
                })
                .await;
                match persisted {
                    Ok(outcome) => {
                        result.image_path = outcome.image.then(|| paths.image.clone());
                        result.embedding_path = outcome.embedding.then(|| paths.embedding.clone());
                        for e in outcome.errors {
                            record(&ctx, &mut result, e);
                        }
                    }
                    Err(e) => record(
                        &ctx,
                        &mut result,
                        UnitError::RenderFailed {
                            unit: index,
                            detail: format!("Image task panicked: {}", e),
                        },
                    ),
                }
            }
            Err(e) => record(&ctx, &mut result, e),
        }
    }

    result.markdown = md;
    finish(result, start)
}

struct Persisted {
    image: bool,
    embedding: bool,
    errors: Vec<UnitError>,
}

/// Save the PNG and, if a service is configured, its embedding. Blocking.
fn persist_image(
    unit: usize,
    image: &DynamicImage,
    image_path: &Path,
    npy_path: &Path,
    embedding: Option<&EmbeddingService>,
) -> Persisted {
    let mut out = Persisted {
        image: false,
        embedding: false,
        errors: Vec::new(),
    };

    match sink::write_png(unit, image_path, image) {
        Ok(()) => out.image = true,
        Err(e) => {
            out.errors.push(e);
            return out;
        }
    }

    let Some(service) = embedding else {
        return out;
    };
    let embedded = match service.embed(image) {
        None => return out,
        Some(r) => r,
    };
    let written = embedded
        .map_err(|e| e.to_string())
        .and_then(|e| e.write_npy(npy_path).map_err(|e| e.to_string()));
    match written {
        Ok(()) => out.embedding = true,
        Err(detail) => out.errors.push(UnitError::EmbeddingFailed { unit, detail }),
    }
    out
}

fn record(ctx: &UnitContext, result: &mut UnitResult, error: UnitError) {
    warn!("{}", error);
    if let Some(ref cb) = ctx.progress {
        cb.on_unit_error(error.unit(), ctx.total, &error.to_string());
    }
    result.errors.push(error);
}

fn finish(mut result: UnitResult, start: Instant) -> UnitResult {
    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

async fn check_pdfium(config: &ConversionConfig) -> Result<(), Doc2MdError> {
    let library = config.pdfium_library_path.clone();
    tokio::task::spawn_blocking(move || pdfium::bind(library.as_deref()).map(|_| ()))
        .await
        .map_err(|e| Doc2MdError::Internal(format!("pdfium probe panicked: {}", e)))?
}

fn document_info(resolved: &ResolvedInput, unit_count: usize) -> DocumentInfo {
    DocumentInfo {
        path: resolved.path.clone(),
        kind: resolved.kind,
        base_name: resolved.base_name.clone(),
        unit_count,
        file_size: resolved.file_size,
    }
}

fn first_requested(selection: &UnitSelection) -> usize {
    match selection {
        UnitSelection::All => 0,
        UnitSelection::Single(u) | UnitSelection::Range(u, _) => *u,
        UnitSelection::Set(units) => units.iter().copied().min().unwrap_or(0),
    }
}
