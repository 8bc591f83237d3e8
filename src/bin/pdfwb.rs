//! CLI binary for pdf-workbench.
//!
//! A thin layer over the library crate: each subcommand maps its flags to
//! library options, runs the job and writes results into the output
//! directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_workbench::pipeline::pages;
use pdf_workbench::tools::{self, ImagesToPdfOptions};
use pdf_workbench::{
    format_file_size, ArtifactInfo, CompressOptions, CompressionLevel, Dependencies,
    DirectorySink, DownloadSink, ImageFormat, ImageOptions, JobObserver, JobOutcome, JobRequest,
    JobSummary, Notification, NotificationLevel, Orchestrator, Orientation, OutputArtifact,
    PageLayout, PageRangeMode, PageSize, PdfiumEngine, QualityPreset, SourceFile, SplitMode,
    WorkbenchConfig,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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

// ── Terminal observer using indicatif ────────────────────────────────────────

/// Prints per-page lines above a percentage bar. The bar position follows
/// the orchestrator's progress channel, not the page count.
struct CliObserver {
    bar: Option<ProgressBar>,
}

impl CliObserver {
    fn new(show_progress: bool) -> Arc<Self> {
        let bar = show_progress.then(|| {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::with_template(concat!(
                "{spinner:.cyan} {prefix:.bold}  ",
                "[{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
            bar.set_style(style);
            bar.set_prefix("Preparing");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self { bar })
    }

    fn println(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl JobObserver for CliObserver {
    fn on_job_start(&self, total_units: usize) {
        if let Some(bar) = &self.bar {
            bar.set_prefix("Converting");
            bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Processing {total_units} pages…"))
            ));
        }
    }

    fn on_unit_complete(
        &self,
        page_num: usize,
        position: usize,
        total_units: usize,
        artifact_name: &str,
    ) {
        if self.bar.is_some() {
            self.println(format!(
                "  {} {}  Page {:>3}  {}",
                green("✓"),
                dim(&format!("[{position}/{total_units}]")),
                page_num,
                artifact_name
            ));
        }
    }

    fn on_unit_error(&self, page_num: usize, position: usize, total_units: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.println(format!(
            "  {} {}  Page {:>3}  {}",
            red("✗"),
            dim(&format!("[{position}/{total_units}]")),
            page_num,
            red(&msg)
        ));
    }

    fn on_job_complete(&self, requested: usize, produced: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(100);
            bar.finish_and_clear();
        }
        let failed = requested.saturating_sub(produced);
        if failed > 0 {
            eprintln!(
                "{} {}/{} pages converted  ({} failed)",
                cyan("⚠"),
                bold(&produced.to_string()),
                requested,
                red(&failed.to_string()),
            );
        }
    }

    fn on_notification(&self, notification: &Notification) {
        if notification.level == NotificationLevel::Error {
            if let Some(bar) = &self.bar {
                bar.finish_and_clear();
            }
            eprintln!(
                "{} {}: {}",
                red("✘"),
                bold(&notification.title),
                notification.description
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page of a PDF to JPEG in ./out
  pdfwb -o out to-images report.pdf

  # Pages 2-4 and 7 as PNG, bundled into report_images.zip
  pdfwb to-images --pages "2-4, 7" --format png --zip report.pdf

  # One PDF per page, or one PDF with the selection
  pdfwb split --pages 1-3 report.pdf
  pdfwb split --pages 1-3 --single report.pdf

  # Merge, compress, images to PDF
  pdfwb merge a.pdf b.pdf c.pdf
  pdfwb compress --level high --remove-metadata big.pdf
  pdfwb from-images --page-size letter --landscape scan1.jpg scan2.png
  pdfwb -o rotated rotate --degrees 270 scan1.jpg

  # Page count and version, as JSON
  pdfwb --json inspect report.pdf

PAGE RANGES:
  Comma-separated pages and inclusive ranges: "1-3, 5, 7-9".
  Tokens that are malformed or outside the document are ignored; a range
  that selects nothing means every page.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory); otherwise the
                          system library search path is used
  PDFWB_OUTPUT_DIR        Default output directory
  PDFWB_MAX_SIZE_MB       Largest accepted input file
  RUST_LOG                Override log filter (e.g. pdf_workbench=debug)
"#;

/// Local PDF toolkit: PDF to images, split, merge, compress, images to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdfwb",
    version,
    about = "Local PDF toolkit: PDF to images, split, merge, compress, images to PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory results are written to.
    #[arg(short, long, global = true, env = "PDFWB_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Largest accepted input file, in MiB.
    #[arg(long, global = true, env = "PDFWB_MAX_SIZE_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_size_mb: u64,

    /// Print a JSON report on stdout.
    #[arg(long, global = true, env = "PDFWB_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFWB_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFWB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFWB_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render PDF pages to images.
    ToImages {
        input: PathBuf,

        /// Page selection: all, or e.g. "1-3, 5".
        #[arg(long, env = "PDFWB_PAGES", default_value = "all")]
        pages: String,

        #[arg(long, value_enum, default_value = "jpg")]
        format: FormatArg,

        #[arg(long, value_enum, default_value = "medium")]
        quality: QualityArg,

        /// Render scale relative to the page's natural size.
        #[arg(long, default_value_t = 2.0)]
        scale: f32,

        /// Write one zip instead of individual files.
        #[arg(long)]
        zip: bool,

        /// PDF user password for encrypted documents.
        #[arg(long, env = "PDFWB_PASSWORD")]
        password: Option<String>,
    },

    /// Copy PDF pages into new documents.
    Split {
        input: PathBuf,

        /// Page selection: all, or e.g. "1-3, 5".
        #[arg(long, env = "PDFWB_PAGES", default_value = "all")]
        pages: String,

        /// One document with every selected page instead of one per page.
        #[arg(long)]
        single: bool,

        /// Write one zip instead of individual files.
        #[arg(long)]
        zip: bool,

        /// PDF user password for encrypted documents.
        #[arg(long, env = "PDFWB_PASSWORD")]
        password: Option<String>,
    },

    /// Merge PDFs, in the order given, into merged.pdf.
    Merge {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },

    /// Shrink a PDF.
    Compress {
        input: PathBuf,

        #[arg(long, value_enum, default_value = "medium")]
        level: LevelArg,

        /// Blank title, author, subject, keywords, producer and creator.
        #[arg(long)]
        remove_metadata: bool,
    },

    /// Build a PDF with one page per image.
    FromImages {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        #[arg(long, value_enum, default_value = "a4")]
        page_size: PageSizeArg,

        /// Page width in millimetres (with --page-size custom).
        #[arg(long, default_value_t = 210.0)]
        width_mm: f32,

        /// Page height in millimetres (with --page-size custom).
        #[arg(long, default_value_t = 297.0)]
        height_mm: f32,

        #[arg(long)]
        landscape: bool,

        /// JPEG quality of embedded images (0.0–1.0).
        #[arg(long, default_value_t = 0.8)]
        quality: f32,

        /// Output file name.
        #[arg(long, default_value = "images.pdf")]
        name: String,
    },

    /// Rotate images clockwise, keeping their names and formats.
    Rotate {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Clockwise rotation; a multiple of 90.
        #[arg(long, default_value_t = 90, allow_hyphen_values = true)]
        degrees: i32,
    },

    /// Print page count and basic facts about a PDF.
    Inspect { input: PathBuf },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpg,
    Png,
    Webp,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpg => ImageFormat::Jpg,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Webp => ImageFormat::Webp,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for QualityPreset {
    fn from(v: QualityArg) -> Self {
        match v {
            QualityArg::High => QualityPreset::High,
            QualityArg::Medium => QualityPreset::Medium,
            QualityArg::Low => QualityPreset::Low,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LevelArg {
    Low,
    Medium,
    High,
}

impl From<LevelArg> for CompressionLevel {
    fn from(v: LevelArg) -> Self {
        match v {
            LevelArg::Low => CompressionLevel::Low,
            LevelArg::Medium => CompressionLevel::Medium,
            LevelArg::High => CompressionLevel::High,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
    Legal,
    Custom,
}

/// What `--json` prints for orchestrated jobs.
#[derive(Serialize)]
struct JobReport {
    source: String,
    summary: Option<JobSummary>,
    artifacts: Vec<ArtifactInfo>,
    written: Vec<PathBuf>,
}

#[derive(Serialize)]
struct InspectReport {
    file: String,
    size: u64,
    size_human: String,
    pages: usize,
    pdf_version: String,
    encrypted: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let config = WorkbenchConfig::builder()
        .max_upload_bytes(cli.max_size_mb * 1024 * 1024)
        .build()
        .context("Invalid configuration")?;

    match &cli.command {
        Command::ToImages {
            input,
            pages,
            format,
            quality,
            scale,
            zip,
            password,
        } => {
            let request = JobRequest::ToImages(ImageOptions {
                format: (*format).into(),
                quality: (*quality).into(),
                scale: *scale,
            });
            let job = JobArgs {
                input,
                pages,
                request,
                zip: *zip,
                password: password.clone(),
            };
            run_job(&cli, config, show_progress, job).await
        }
        Command::Split {
            input,
            pages,
            single,
            zip,
            password,
        } => {
            let mode = if *single {
                SplitMode::Single
            } else {
                SplitMode::Multiple
            };
            let job = JobArgs {
                input,
                pages,
                request: JobRequest::Split(mode),
                zip: *zip,
                password: password.clone(),
            };
            run_job(&cli, config, show_progress, job).await
        }
        Command::Merge { inputs } => {
            let sources = load_all(inputs, &config, false).await?;
            let merged = tokio::task::spawn_blocking(move || tools::merge_documents(&sources))
                .await
                .context("Merge task panicked")?
                .context("Merge failed")?;
            let path = write_output(&cli.output_dir, merged.clone()).await?;
            report_single(&cli, &merged, &path)
        }
        Command::Compress {
            input,
            level,
            remove_metadata,
        } => {
            let source = load_input(input, &config).await?;
            let options = CompressOptions {
                level: (*level).into(),
                remove_metadata: *remove_metadata,
            };
            let report =
                tokio::task::spawn_blocking(move || tools::compress_document(&source, &options))
                    .await
                    .context("Compress task panicked")?
                    .context("Compression failed")?;
            let path = write_output(&cli.output_dir, report.artifact.clone()).await?;
            if !cli.quiet && !cli.json {
                eprintln!(
                    "{}  {} → {}  ({}% smaller)",
                    green("✔"),
                    format_file_size(report.original_size as u64),
                    format_file_size(report.compressed_size as u64),
                    report.savings_percent()
                );
            }
            report_single(&cli, &report.artifact, &path)
        }
        Command::FromImages {
            inputs,
            page_size,
            width_mm,
            height_mm,
            landscape,
            quality,
            name,
        } => {
            let sources = load_all(inputs, &config, true).await?;
            let size = match page_size {
                PageSizeArg::A4 => PageSize::A4,
                PageSizeArg::Letter => PageSize::Letter,
                PageSizeArg::Legal => PageSize::Legal,
                PageSizeArg::Custom => PageSize::Custom {
                    width_mm: *width_mm,
                    height_mm: *height_mm,
                },
            };
            let options = ImagesToPdfOptions {
                layout: PageLayout {
                    size,
                    orientation: if *landscape {
                        Orientation::Landscape
                    } else {
                        Orientation::Portrait
                    },
                },
                quality: *quality,
                filename: name.clone(),
            };
            let task = move || tools::images_to_pdf(&sources, &options);
            let result = tokio::task::spawn_blocking(task)
                .await
                .context("Image task panicked")?
                .context("Images to PDF failed")?;
            for skipped in &result.skipped {
                eprintln!("  {} {} could not be read; its page is blank", cyan("⚠"), skipped);
            }
            let path = write_output(&cli.output_dir, result.artifact.clone()).await?;
            report_single(&cli, &result.artifact, &path)
        }
        Command::Rotate { inputs, degrees } => {
            let sources = load_all(inputs, &config, true).await?;
            for source in sources {
                let degrees = *degrees;
                let name = source.name().to_string();
                let rotated =
                    tokio::task::spawn_blocking(move || tools::rotate_image(&source, degrees))
                        .await
                        .context("Rotate task panicked")?
                        .with_context(|| format!("Failed to rotate {name}"))?;
                let path = write_output(&cli.output_dir, rotated.clone()).await?;
                report_single(&cli, &rotated, &path)?;
            }
            Ok(())
        }
        Command::Inspect { input } => inspect(&cli, input, &config).await,
    }
}

/// What one orchestrated job works on.
struct JobArgs<'a> {
    input: &'a Path,
    pages: &'a str,
    request: JobRequest,
    /// Deliver one archive instead of loose files.
    zip: bool,
    password: Option<String>,
}

/// Drive one orchestrated job from file selection to delivery.
async fn run_job(
    cli: &Cli,
    config: WorkbenchConfig,
    show_progress: bool,
    job: JobArgs<'_>,
) -> Result<()> {
    let JobArgs {
        input,
        pages,
        request,
        zip,
        password,
    } = job;

    let mut engine = PdfiumEngine::new().context("Failed to initialise the PDF engine")?;
    if let Some(p) = password {
        engine = engine.with_password(p);
    }

    let observer = CliObserver::new(show_progress);
    let deps = Dependencies::new(
        Arc::new(engine),
        Arc::new(DirectorySink::new(&cli.output_dir)),
    )
    .with_observer(observer.clone());
    let orch = Orchestrator::new(config, deps);

    let source = SourceFile::from_path(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let source_name = source.name().to_string();
    orch.select_source(source).context("File rejected")?;
    orch.set_page_range_mode(parse_range_mode(pages))
        .context("Invalid page range")?;

    // ── Progress bar follows the progress channel ────────────────────────
    let follower = observer.bar.clone().map(|bar| {
        let mut stream = orch.progress_stream();
        tokio::spawn(async move {
            while let Some(value) = stream.next().await {
                bar.set_position(u64::from(value));
            }
        })
    });

    let outcome = orch.run(request).await.context("Could not start the job")?;
    if let Some(task) = follower {
        task.abort();
    }

    let artifacts = match outcome {
        JobOutcome::Completed(artifacts) => artifacts,
        JobOutcome::Failed(message) => {
            anyhow::bail!("{message} (run with --verbose for details)")
        }
    };

    // ── Deliver ──────────────────────────────────────────────────────────
    let sink = DirectorySink::new(&cli.output_dir);
    let mut written = Vec::new();
    if zip {
        let info = orch.download_all().await.context("Failed to write archive")?;
        written.push(sink.path_for(&info.name));
    } else {
        for index in 0..artifacts.len() {
            let info = orch
                .download_one(index)
                .await
                .with_context(|| format!("Failed to write {}", artifacts[index].name))?;
            written.push(sink.path_for(&info.name));
        }
    }

    if cli.json {
        let report = JobReport {
            source: source_name,
            summary: orch.summary(),
            artifacts: orch.artifact_infos(),
            written,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        let produced = artifacts.len();
        eprintln!(
            "{}  {} files  →  {}",
            green("✔"),
            bold(&produced.to_string()),
            bold(&cli.output_dir.display().to_string()),
        );
        if let Some(summary) = orch.summary().filter(|s| !s.skipped.is_empty()) {
            let skipped: Vec<String> = summary.skipped.iter().map(ToString::to_string).collect();
            eprintln!("   skipped pages: {}", dim(&skipped.join(", ")));
        }
    }
    Ok(())
}

/// `all` (any case) or blank → every page; anything else is a range text.
fn parse_range_mode(s: &str) -> PageRangeMode {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("all") {
        PageRangeMode::All
    } else {
        PageRangeMode::Custom(s.to_string())
    }
}

/// Read an input and validate it against `config`.
async fn load_input(path: &Path, config: &WorkbenchConfig) -> Result<SourceFile> {
    let source = SourceFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    pdf_workbench::source::validate(&source, config)
        .with_context(|| format!("{} rejected", path.display()))?;
    Ok(source)
}

/// Read several inputs; images are checked against an `image/*` accept list.
async fn load_all(
    paths: &[PathBuf],
    config: &WorkbenchConfig,
    images: bool,
) -> Result<Vec<SourceFile>> {
    let image_config;
    let config = if images {
        image_config = WorkbenchConfig::builder()
            .max_upload_bytes(config.max_upload_bytes)
            .accepted_types(["image/*"])
            .build()
            .context("Invalid configuration")?;
        &image_config
    } else {
        config
    };

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(load_input(path, config).await?);
    }
    Ok(sources)
}

async fn write_output(dir: &Path, artifact: OutputArtifact) -> Result<PathBuf> {
    let sink = DirectorySink::new(dir);
    let path = sink.path_for(&artifact.name);
    tokio::task::spawn_blocking(move || {
        sink.deliver(&artifact.name, &artifact.media_type, &artifact.bytes)
    })
    .await
    .context("Write task panicked")?
    .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn report_single(cli: &Cli, artifact: &OutputArtifact, path: &Path) -> Result<()> {
    if cli.json {
        let report = JobReport {
            source: artifact.name.clone(),
            summary: None,
            artifacts: vec![artifact.info()],
            written: vec![path.to_path_buf()],
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {}",
            green("✔"),
            bold(&path.display().to_string()),
            dim(&format_file_size(artifact.size() as u64)),
        );
    }
    Ok(())
}

async fn inspect(cli: &Cli, input: &Path, config: &WorkbenchConfig) -> Result<()> {
    let source = load_input(input, config).await?;
    let bytes = source.shared_bytes();
    let doc = tokio::task::spawn_blocking(move || pages::load(&bytes))
        .await
        .context("Inspect task panicked")?
        .context("Failed to inspect PDF")?;

    let report = InspectReport {
        file: source.name().to_string(),
        size: source.size(),
        size_human: format_file_size(source.size()),
        pages: doc.get_pages().len(),
        pdf_version: doc.version.clone(),
        encrypted: doc.trailer.get(b"Encrypt").is_ok(),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize metadata")?
        );
    } else {
        println!("File:         {}", report.file);
        println!("Size:         {}", report.size_human);
        println!("Pages:        {}", report.pages);
        println!("PDF Version:  {}", report.pdf_version);
        println!("Encrypted:    {}", report.encrypted);
    }
    Ok(())
}
