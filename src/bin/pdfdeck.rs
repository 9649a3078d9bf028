//! CLI binary for pdfdeck.
//!
//! A thin shim over the library crate: maps flags to `BuildConfig` and
//! `TemplateJob`, drives a build or a regeneration, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfdeck::store::{ensure_converted, ensure_generated, resolve_page_count};
use pdfdeck::{
    archive_dir, build_deck, deploy_manifest, generate_from_fragments, inspect, write_tree,
    BuildConfig, BuildProgressCallback, JobRecord, JobStatus, JobStore, PageSelection,
    ProgressCallback, TemplateJob, TemplateKind,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
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

/// Live progress bar plus one log line per rasterised page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_build_start` tells us how many pages to expect.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BuildProgressCallback for CliProgressCallback {
    fn on_build_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_rendered(&self, page_num: usize, total: usize, png_bytes: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>6} KiB", png_bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_build_complete(&self, rendered: usize, file_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages rendered, {} files generated",
                green("✔"),
                bold(&rendered.to_string()),
                file_count
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} shown as placeholders)",
                cyan("⚠"),
                bold(&rendered.to_string()),
                rendered + failed,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Slideshow from a local PDF
  pdfdeck build slides.pdf -o site/

  # Flip-book from a URL, first two pages free, zipped for download
  pdfdeck build https://example.com/catalog.pdf -o catalog/ \
      --template flipbook --job gate.json --archive catalog.zip

  # Regenerate from fragments produced elsewhere
  pdfdeck generate --job job.json --fragments pages/ -o site/

  # Regenerate a stored job with a different template
  pdfdeck generate --store jobs.json --job-id q3 --template documentation -o site/

  # Inspect PDF metadata
  pdfdeck inspect report.pdf --json

  # Content hashes for a hash-addressed upload
  pdfdeck manifest site/ > manifest.json

JOB FILES:
  A job file is the camelCase JSON form of a TemplateJob:
    { "template": "flipbook", "title": "Catalog",
      "hotspots": [{ "id": "buy", "pageIndex": 0, "top": 80, "left": 10,
                     "width": 30, "height": 8, "url": "https://shop.example" }],
      "leadGate": { "enabled": true, "freePages": 2 } }

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory); defaults to the system library
  RUST_LOG          Override the log filter (e.g. pdfdeck=debug)
"#;

/// Turn PDF pages into interactive slideshow, flip-book and scrolling sites.
#[derive(Parser, Debug)]
#[command(
    name = "pdfdeck",
    version,
    about = "Turn PDF pages into interactive slideshow, flip-book and scrolling-document sites",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFDECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFDECK_QUIET")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDFDECK_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a PDF and generate a site from it.
    Build(BuildArgs),
    /// Generate a site from an existing job and page fragments.
    Generate(GenerateArgs),
    /// Print PDF metadata without rendering.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Zip a generated site directory.
    Archive {
        /// Site directory. Omit when using --store/--job-id.
        dir: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, env = "PDFDECK_STORE", requires = "job_id")]
        store: Option<PathBuf>,
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Print the SHA-256 of every file in a site directory as JSON.
    Manifest {
        dir: PathBuf,
    },
}

/// Template and job flags shared by `build` and `generate`.
#[derive(clap::Args, Debug)]
struct JobArgs {
    /// JSON job file (template, hotspots, lead gate, custom CSS…).
    #[arg(long, env = "PDFDECK_JOB")]
    job: Option<PathBuf>,

    /// presentation, flipbook or documentation. Overrides the job file.
    #[arg(short, long, env = "PDFDECK_TEMPLATE")]
    template: Option<String>,

    /// Deck title. Overrides the job file.
    #[arg(long)]
    title: Option<String>,

    /// Site identifier; keys the viewer's unlock flag.
    #[arg(long, env = "PDFDECK_SITE_ID")]
    site_id: Option<String>,

    /// Enable the lead gate with this many free pages.
    #[arg(long)]
    free_pages: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory to write the site into (replaced atomically).
    #[arg(short, long, env = "PDFDECK_OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    job: JobArgs,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDFDECK_PAGES", default_value = "all")]
    pages: String,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDFDECK_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Longest rendered edge in pixels.
    #[arg(long, env = "PDFDECK_MAX_PIXELS", default_value_t = 1600)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFDECK_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFDECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Also zip the generated site to this path.
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Record the build in this job store.
    #[arg(long, env = "PDFDECK_STORE", requires = "job_id")]
    store: Option<PathBuf>,

    #[arg(long)]
    job_id: Option<String>,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Directory of page-N.html fragments (and optional assets/).
    #[arg(long)]
    fragments: Option<PathBuf>,

    /// Directory to write the site into (replaced atomically).
    #[arg(short, long, env = "PDFDECK_OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    job: JobArgs,

    /// Explicit page count.
    #[arg(long)]
    page_count: Option<usize>,

    /// Job store holding conversion results.
    #[arg(long, env = "PDFDECK_STORE", requires = "job_id")]
    store: Option<PathBuf>,

    #[arg(long)]
    job_id: Option<String>,

    /// Also zip the generated site to this path.
    #[arg(long)]
    archive: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && matches!(cli.command, Command::Build(_));
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

    match cli.command {
        Command::Build(ref args) => run_build(args, cli.quiet, show_progress).await,
        Command::Generate(ref args) => run_generate(args, cli.quiet).await,
        Command::Inspect { ref input, json } => run_inspect(input, json).await,
        Command::Archive {
            ref dir,
            ref output,
            ref store,
            ref job_id,
        } => {
            let dir = match (dir, store, job_id) {
                (Some(d), _, _) => d.clone(),
                (None, Some(store), Some(id)) => {
                    let store = JobStore::open(store).await.context("Failed to open job store")?;
                    ensure_generated(store.require(id)?)?.to_path_buf()
                }
                _ => anyhow::bail!("Give a site directory or --store with --job-id"),
            };
            let count = archive_dir(&dir, output).context("Archive failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} files  →  {}",
                    green("✔"),
                    count,
                    bold(&output.display().to_string())
                );
            }
            Ok(())
        }
        Command::Manifest { ref dir } => {
            let manifest = deploy_manifest(dir).context("Failed to hash site")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&manifest).context("Failed to serialise manifest")?
            );
            Ok(())
        }
    }
}

async fn run_build(args: &BuildArgs, quiet: bool, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn BuildProgressCallback>)
    } else {
        None
    };
    let config = build_config(args, progress_cb)?;
    let job = load_job(&args.job).await?;

    let mut store = match (&args.store, &args.job_id) {
        (Some(path), Some(id)) => {
            let mut store = JobStore::open(path).await.context("Failed to open job store")?;
            let mut record = store.get(id).cloned().unwrap_or_else(|| JobRecord::new(id));
            record.status = JobStatus::Converting;
            record.source = Some(args.input.clone());
            record.error = None;
            store.upsert(record);
            store.save().await?;
            Some(store)
        }
        _ => None,
    };

    let output = match build_deck(&args.input, &job, &config).await {
        Ok(output) => output,
        Err(e) => {
            if let (Some(store), Some(id)) = (store.as_mut(), &args.job_id) {
                store.mark_failed(id, &e.to_string()).await?;
            }
            return Err(e).context("Build failed");
        }
    };

    for warning in &output.tree.warnings {
        tracing::warn!("{warning}");
    }
    let report = match write_tree(&output.tree, &args.output).await {
        Ok(report) => report,
        Err(e) => {
            if let (Some(store), Some(id)) = (store.as_mut(), &args.job_id) {
                store.mark_failed(id, &e.to_string()).await?;
            }
            return Err(e).context("Failed to write site");
        }
    };

    if let (Some(store), Some(id)) = (store.as_mut(), &args.job_id) {
        let mut record = store.require(id)?.clone();
        record.status = JobStatus::Generated;
        record.title = job.title.clone().or_else(|| output.metadata.title.clone());
        record.page_count = Some(output.stats.rendered_pages + output.stats.failed_pages);
        record.template = Some(output.tree.template);
        record.output_dir = Some(args.output.clone());
        store.upsert(record);
        store.save().await?;
    }

    if let Some(ref zip) = args.archive {
        archive_dir(&args.output, zip).context("Archive failed")?;
    }

    if !quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {} files  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.rendered_pages,
            stats.rendered_pages + stats.failed_pages,
            report.files,
            stats.total_duration_ms,
            bold(&args.output.display().to_string()),
        );
        if stats.warning_count > 0 {
            eprintln!("   {}", dim(&format!("{} warnings", stats.warning_count)));
        }
    }
    Ok(())
}

async fn run_generate(args: &GenerateArgs, quiet: bool) -> Result<()> {
    let mut job = load_job(&args.job).await?;

    let (mut store, record) = match (&args.store, &args.job_id) {
        (Some(path), Some(id)) => {
            let store = JobStore::open(path).await.context("Failed to open job store")?;
            let record = store.require(id)?.clone();
            (Some(store), Some(record))
        }
        _ => (None, None),
    };

    let fragments_dir: Option<PathBuf> = match (&args.fragments, &record) {
        (Some(dir), _) => Some(dir.clone()),
        (None, Some(record)) => Some(ensure_converted(record)?.to_path_buf()),
        (None, None) => None,
    };

    let explicit = args.page_count.or(job.page_count);
    if explicit.is_some() || record.is_some() || fragments_dir.is_some() {
        job.page_count = Some(
            resolve_page_count(explicit, record.as_ref(), fragments_dir.as_deref()).await?,
        );
    }
    if job.title.is_none() {
        job.title = record.as_ref().and_then(|r| r.title.clone());
    }

    let tree = match fragments_dir {
        Some(ref dir) => generate_from_fragments(dir, &job).await?,
        None => pdfdeck::generate(&job),
    };
    for warning in &tree.warnings {
        tracing::warn!("{warning}");
    }
    let report = write_tree(&tree, &args.output)
        .await
        .context("Failed to write site")?;

    if let (Some(store), Some(mut record)) = (store.as_mut(), record) {
        record.status = JobStatus::Generated;
        record.template = Some(tree.template);
        record.output_dir = Some(args.output.clone());
        record.page_count = job.page_count;
        store.upsert(record);
        store.save().await?;
    }

    if let Some(ref zip) = args.archive {
        archive_dir(&args.output, zip).context("Archive failed")?;
    }

    if !quiet {
        eprintln!(
            "{}  {} {}  {} files  {}  →  {}",
            green("✔"),
            job.resolved_page_count(),
            if job.resolved_page_count() == 1 { "page" } else { "pages" },
            report.files,
            dim(tree.template.name()),
            bold(&args.output.display().to_string()),
        );
        if !tree.warnings.is_empty() {
            eprintln!("   {}", dim(&format!("{} warnings", tree.warnings.len())));
        }
    }
    Ok(())
}

async fn run_inspect(input: &str, json: bool) -> Result<()> {
    let meta = inspect(input).await.context("Failed to inspect PDF")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
        );
        return Ok(());
    }

    println!("File:         {}", input);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    if let Some(ref s) = meta.subject {
        println!("Subject:      {}", s);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
    Ok(())
}

/// Read the job file (if any) and apply flag overrides.
async fn load_job(args: &JobArgs) -> Result<TemplateJob> {
    let mut job = match args.job {
        Some(ref path) => read_job_file(path).await?,
        None => TemplateJob::default(),
    };
    if let Some(ref name) = args.template {
        job.template = TemplateKind::from_name(name);
    }
    if let Some(ref title) = args.title {
        job.title = Some(title.clone());
    }
    if let Some(ref id) = args.site_id {
        job.site_id = Some(id.clone());
    }
    if let Some(free) = args.free_pages {
        job.lead_gate.enabled = true;
        job.lead_gate.free_pages = free;
    }
    Ok(job)
}

async fn read_job_file(path: &Path) -> Result<TemplateJob> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read job file {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid job file {:?}", path))
}

/// Map CLI args to `BuildConfig`.
fn build_config(args: &BuildArgs, progress: Option<ProgressCallback>) -> Result<BuildConfig> {
    let pages = PageSelection::parse(&args.pages).context("Invalid --pages")?;

    let mut builder = BuildConfig::builder()
        .dpi(args.dpi)
        .max_rendered_pixels(args.max_pixels)
        .pages(pages)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
