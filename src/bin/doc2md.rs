//! CLI binary for doc2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2md::{
    convert, convert_text_file, inspect, ConversionConfig, ConversionProgressCallback,
    EmbeddingService, LineClassifier, LinkPolicy, ProgressCallback, UnitSelection,
};
use doc2md::pipeline::extract::normalise_line_endings;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// unit. Units may complete out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Units whose Markdown could not be produced.
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting text…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            failures: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} units  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, unit: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&unit)
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting conversion of {total_units} units…"))
        ));
    }

    fn on_unit_start(&self, unit: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(unit, Instant::now());
        self.bar.set_message(format!("unit {unit}"));
    }

    fn on_unit_complete(&self, unit: usize, total: usize, markdown_len: usize) {
        let elapsed = self.elapsed_secs(unit);
        self.bar.println(format!(
            "  {} Unit {:>4}/{:<4}  {:<8}  {}",
            green("✓"),
            unit,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_unit_error(&self, unit: usize, total: usize, error: &str) {
        // Render and embedding errors arrive after on_unit_complete; only a
        // unit that never completed advances the bar here.
        let never_completed = self
            .start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(&unit);
        let elapsed = self.elapsed_secs(unit);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Unit {:>4}/{:<4}  {}  {}",
            red("✗"),
            unit,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        if never_completed {
            self.failures.fetch_add(1, Ordering::SeqCst);
            self.bar.inc(1);
        }
    }

    fn on_conversion_complete(&self, total_units: usize, success_count: usize) {
        let failed = total_units.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} units converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} units converted  ({} failed)",
                if failed == total_units {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_units,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One Markdown file and one PNG per page
  doc2md report.pdf -o out/

  # Paragraphs of a Word document, Markdown only
  doc2md --no-images memo.docx -o out/

  # Lines 10-20 of a text file, with image embeddings
  doc2md --units 10-20 --embeddings notes.txt -o out/

  # Swin features from an ONNX export instead of the weight-free embedder
  doc2md --embedding-model swin/model.onnx report.pdf -o out/

  # Keep text around links instead of reducing the line to the link
  doc2md --link-policy preserve notes.txt -o out/

  # Classify text from stdin and print the Markdown
  cat notes.txt | doc2md --text-only

  # Detected type and unit count
  doc2md --inspect-only report.pdf

  # Machine-readable summary
  doc2md --json report.pdf -o out/ > summary.json

OUTPUT FILES:
  {base}_page_{n}.md    classified Markdown (n is 1-based)
  {base}_page_{n}.png   rendered page (unless --no-images)
  {base}_page_{n}.npy   image embedding (with --embeddings)

  A unit is a page (PDF), a paragraph (DOCX) or a line (TXT).

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Path to libpdfium (file or directory)
  DOC2MD_EMBEDDING_MODEL   ONNX model used for embeddings
  RUST_LOG                 Overrides the log filter (e.g. doc2md=debug)
"#;

/// Convert PDF, DOCX and TXT documents into per-unit Markdown files.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert PDF, DOCX and TXT documents into per-unit Markdown files",
    long_about = "Split a PDF (by page), DOCX (by paragraph) or TXT (by line) document into units, \
normalise each unit's Markdown structure, and write one .md file per unit together with a \
rendered .png image and an optional .npy image embedding.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input document (.pdf, .docx, .txt). With --text-only, omit or use '-' for stdin.
    input: Option<PathBuf>,

    /// Output directory for the unit files.
    #[arg(short, long, env = "DOC2MD_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "DOC2MD_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Maximum rendered image edge in pixels.
    #[arg(long, env = "DOC2MD_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// Number of units processed concurrently.
    #[arg(short, long, env = "DOC2MD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Unit selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "DOC2MD_UNITS", default_value = "all")]
    units: String,

    /// What to do with lines containing [text](url).
    #[arg(long, env = "DOC2MD_LINK_POLICY", value_enum, default_value = "link-only")]
    link_policy: LinkPolicyArg,

    /// Skip PNG rendering (no pdfium needed for DOCX/TXT).
    #[arg(long, env = "DOC2MD_NO_IMAGES")]
    no_images: bool,

    /// Write a .npy image embedding next to every rendered image.
    #[arg(long, env = "DOC2MD_EMBEDDINGS")]
    embeddings: bool,

    /// ONNX vision model for embeddings (implies --embeddings). Without it
    /// the weight-free patch-pool embedder is used.
    #[arg(long, env = "DOC2MD_EMBEDDING_MODEL")]
    embedding_model: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2MD_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Classify a text file (or stdin) as one document and print the Markdown.
    #[arg(long)]
    text_only: bool,

    /// Print the detected type and unit count, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON instead of a summary.
    #[arg(long, env = "DOC2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2MD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LinkPolicyArg {
    LinkOnly,
    Preserve,
}

impl From<LinkPolicyArg> for LinkPolicy {
    fn from(v: LinkPolicyArg) -> Self {
        match v {
            LinkPolicyArg::LinkOnly => LinkPolicy::LinkOnly,
            LinkPolicyArg::Preserve => LinkPolicy::PreserveSurrounding,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are noise while the progress bar is drawing.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && !cli.text_only && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let markdown = match cli.input.as_deref() {
            None => read_stdin_markdown(&cli)?,
            Some(p) if p.as_os_str() == "-" => read_stdin_markdown(&cli)?,
            Some(path) => {
                let config = build_config(&cli, None)?;
                convert_text_file(path, &config)
                    .await
                    .with_context(|| format!("Failed to convert {}", path.display()))?
            }
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input document is required (or use --text-only to read stdin)")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let info = inspect(&input, &config)
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.path.display());
            println!("Type:         {}", info.kind);
            println!("Units:        {} ({}s)", info.unit_count, info.kind.unit_name());
            println!("Size:         {} bytes", info.file_size);
            println!("Output base:  {}_page_N", info.base_name);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let output_dir = cli
        .output
        .clone()
        .context("An output directory is required: -o <DIR>")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&input, &output_dir, &config)
        .await
        .context("Conversion failed")?;

    if let Some(ref service) = config.embedding {
        service.shutdown();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &output.stats;
        let selected = stats.processed_units + stats.failed_units;
        eprintln!(
            "{}  {}/{} {}s  {}ms  →  {}",
            if stats.failed_units == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_units,
            selected,
            output.document.kind.unit_name(),
            stats.total_duration_ms,
            bold(&output_dir.display().to_string()),
        );
        if !cli.no_images {
            eprintln!(
                "   {} images  /  {} render failures  /  {} embeddings",
                dim(&stats.rendered_images.to_string()),
                dim(&stats.render_failures.to_string()),
                dim(&stats.embeddings.to_string()),
            );
        }
    }

    Ok(())
}

fn read_stdin_markdown(cli: &Cli) -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;
    let text = normalise_line_endings(&text);
    let classifier = LineClassifier::new(cli.link_policy.clone().into());
    Ok(doc2md::markdown::convert_text_with(&text, &classifier).0)
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let units = parse_units(&cli.units)?;

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .concurrency(cli.concurrency)
        .units(units)
        .link_policy(cli.link_policy.clone().into())
        .render_images(!cli.no_images);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(service) = embedding_service(cli)? {
        builder = builder.embedding(Arc::new(service));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Pick the embedding service from `--embeddings` / `--embedding-model`.
fn embedding_service(cli: &Cli) -> Result<Option<EmbeddingService>> {
    match cli.embedding_model {
        #[cfg(feature = "onnx")]
        Some(ref model) => Ok(Some(EmbeddingService::onnx(model.clone()))),
        #[cfg(not(feature = "onnx"))]
        Some(_) => anyhow::bail!("--embedding-model requires doc2md built with the `onnx` feature"),
        None if cli.embeddings => Ok(Some(EmbeddingService::patch_pool())),
        None => Ok(None),
    }
}

/// Parse `--units` string into `UnitSelection`.
fn parse_units(s: &str) -> Result<UnitSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(UnitSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start unit in range")?;
        let end: usize = end.trim().parse().context("Invalid end unit in range")?;

        if start < 1 {
            anyhow::bail!("Units are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid unit range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(UnitSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let units: Vec<usize> = s
            .split(',')
            .map(|u| {
                u.trim()
                    .parse::<usize>()
                    .context(format!("Invalid unit number: '{}'", u.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&u) = units.iter().find(|&&u| u < 1) {
            anyhow::bail!("Units are 1-indexed, minimum is 1 (got {})", u);
        }

        return Ok(UnitSelection::Set(units));
    }

    // Single unit: "5"
    let unit: usize = s.parse().context("Invalid unit number")?;
    if unit < 1 {
        anyhow::bail!("Units are 1-indexed, minimum is 1 (got {})", unit);
    }

    Ok(UnitSelection::Single(unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_unit_selections() {
        assert_eq!(parse_units("all").unwrap(), UnitSelection::All);
        assert_eq!(parse_units(" 7 ").unwrap(), UnitSelection::Single(7));
        assert_eq!(parse_units("3-15").unwrap(), UnitSelection::Range(3, 15));
        assert_eq!(
            parse_units("1,3,5").unwrap(),
            UnitSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn reject_bad_unit_selections() {
        assert!(parse_units("0").is_err());
        assert!(parse_units("5-2").is_err());
        assert!(parse_units("1,x").is_err());
        assert!(parse_units("0,2").is_err());
    }

    #[test]
    fn cli_parses_core_flags() {
        let cli = Cli::try_parse_from([
            "doc2md",
            "notes.txt",
            "-o",
            "out",
            "--no-images",
            "--link-policy",
            "preserve",
            "--units",
            "2-4",
        ])
        .expect("parse");
        assert!(cli.no_images);
        let config = build_config(&cli, None).expect("config");
        assert!(!config.render_images);
        assert_eq!(config.link_policy, LinkPolicy::PreserveSurrounding);
        assert_eq!(config.units, UnitSelection::Range(2, 4));
    }

    #[test]
    fn embedding_flags_pick_a_service() {
        let args = |extra: &[&'static str]| {
            let mut v = vec!["doc2md", "notes.txt", "-o", "out"];
            v.extend_from_slice(extra);
            Cli::try_parse_from(v).expect("parse")
        };

        assert!(embedding_service(&args(&[])).expect("service").is_none());

        let service = embedding_service(&args(&["--embeddings"]))
            .expect("service")
            .expect("some");
        assert_eq!(service.name(), "patch-pool-224");

        let with_model = embedding_service(&args(&["--embedding-model", "swin.onnx"]));
        #[cfg(feature = "onnx")]
        {
            let service = with_model.expect("service").expect("some");
            assert_eq!(service.name(), "swin.onnx");
            // loaded lazily; a missing file only disables embeddings
            assert!(!service.init());
        }
        #[cfg(not(feature = "onnx"))]
        assert!(with_model.is_err());
    }

    #[test]
    fn stdin_text_is_normalised_before_classifying() {
        let classifier = LineClassifier::default();
        let text = normalise_line_endings("#  Title\r\n\r\n-   item\r");
        let md = doc2md::markdown::convert_text_with(&text, &classifier).0;
        assert_eq!(md, "# Title\n\n- item");
    }
}
