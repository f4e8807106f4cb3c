//! Streaming conversion API: emit units as they complete.
//!
//! Unlike the eager [`crate::convert::convert`] which returns only after
//! every unit finishes, [`convert_stream`] yields one item per unit through
//! a `Stream` as soon as its files are written. Units may arrive out of
//! order (sort by `index` if order matters).
//!
//! Fatal problems (missing input, unreadable container, unusable output
//! directory) still surface as `Err` from `convert_stream` itself, before
//! any unit is produced.
//!
//! Progress callbacks see the same events as with `convert`;
//! `on_conversion_complete` fires once the stream is drained.

use crate::config::ConversionConfig;
use crate::convert::{prepare, process_unit};
use crate::error::{Doc2MdError, UnitError};
use crate::output::UnitResult;
use futures::future;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of unit results.
pub type UnitStream = Pin<Box<dyn Stream<Item = Result<UnitResult, UnitError>> + Send>>;

/// Convert a document, streaming units as they are ready.
///
/// A unit is yielded as `Ok` when its Markdown file was written, even if
/// rendering or embedding failed (those are listed in
/// [`UnitResult::errors`]). It is yielded as `Err` with the error that
/// stopped it otherwise.
///
/// # Returns
/// - `Ok(UnitStream)` — a stream of `Result<UnitResult, UnitError>`
/// - `Err(Doc2MdError)` — fatal error (file not found, corrupt file, etc.)
pub async fn convert_stream(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<UnitStream, Doc2MdError> {
    let prepared = prepare(input_path.as_ref(), output_dir.as_ref(), config).await?;
    let total = prepared.units.len();
    info!("Streaming {} units", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    let context = Arc::clone(&prepared.context);
    let succeeded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&succeeded);
    let units = stream::iter(prepared.units)
        .map(move |source| process_unit(source, Arc::clone(&context)))
        .buffer_unordered(config.concurrency)
        .map(move |result| {
            if result.is_success() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            into_item(result)
        });

    // Runs once every unit has been yielded; contributes no item.
    let callback = config.progress_callback.clone();
    let done = stream::once(async move {
        if let Some(cb) = callback {
            cb.on_conversion_complete(total, succeeded.load(Ordering::SeqCst));
        }
    })
    .filter_map(|()| future::ready(None::<Result<UnitResult, UnitError>>));

    Ok(Box::pin(units.chain(done)))
}

fn into_item(result: UnitResult) -> Result<UnitResult, UnitError> {
    if result.is_success() {
        return Ok(result);
    }
    let fatal = result
        .errors
        .iter()
        .find(|e| e.is_fatal_for_unit())
        .or_else(|| result.errors.first())
        .cloned();
    match fatal {
        Some(e) => Err(e),
        None => Ok(result),
    }
}
