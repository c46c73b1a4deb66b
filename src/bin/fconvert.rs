//! CLI binary for fconverter.
//!
//! A thin host over the library: maps flags to `ClientConfig`, drives one
//! `Orchestrator` session for a single file, and prints or downloads the
//! result.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fconverter::{
    format_file_size, ClientConfig, ConversionMode, Orchestrator, Phase, RemoteClient,
    SessionObserver, UploadIntake, WorkflowConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
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

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: mirrors the simulated percentage on a progress bar.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        Arc::new(Self { bar })
    }
}

impl SessionObserver for CliObserver {
    fn on_file_staged(&self, name: &str, size_bytes: u64) {
        self.bar.set_message(format!("{name} ({})", format_file_size(size_bytes)));
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_phase_change(&self, phase: &Phase) {
        match phase {
            Phase::Converting => {
                self.bar.set_prefix("Converting");
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            Phase::Succeeded { .. } => {
                self.bar.set_prefix("Done");
                self.bar.finish_and_clear();
            }
            Phase::Failed { .. } => {
                self.bar.abandon();
            }
            Phase::Idle => {}
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert an image; mode inferred from the extension
  fconvert photo.jpg

  # Convert a Word document and download the PDF
  fconvert --mode docx report.docx -o report.pdf

  # Talk to a remote service
  fconvert --base-url https://convert.example.com notes.txt

  # Machine-readable result
  fconvert --json notes.txt

  # Check that the service is up
  fconvert --health

MODES:
  Mode    Wire value     Accepts
  ──────  ─────────────  ───────────────────────────────────
  image   image_to_pdf   .jpg .jpeg .png .gif .bmp .tiff
  docx    docx_to_pdf    .docx
  text    text_to_pdf    .txt

  Files larger than 10 MB are rejected before upload.

ENVIRONMENT VARIABLES:
  FCONVERT_API_BASE_URL   Conversion service address (default http://localhost:8000)
  FCONVERT_TIMEOUT        Request timeout in seconds
  RUST_LOG                Override log filter (e.g. fconverter=debug)
"#;

/// Convert images, Word documents and text files to PDF via a conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "fconvert",
    version,
    about = "Convert images, Word documents and text files to PDF via a conversion service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to convert.
    #[arg(required_unless_present = "health")]
    input: Option<PathBuf>,

    /// Conversion mode. Inferred from the file extension when omitted.
    #[arg(short, long, env = "FCONVERT_MODE", value_enum)]
    mode: Option<ModeArg>,

    /// Download the converted PDF to this path.
    #[arg(short, long, env = "FCONVERT_OUTPUT")]
    output: Option<PathBuf>,

    /// Conversion service base address.
    #[arg(long, env = "FCONVERT_API_BASE_URL", default_value = fconverter::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "FCONVERT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Print the result as JSON.
    #[arg(long, env = "FCONVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Only query the service health endpoint.
    #[arg(long)]
    health: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FCONVERT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Image,
    Docx,
    Text,
}

impl From<ModeArg> for ConversionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Image => ConversionMode::ImageToPdf,
            ModeArg::Docx => ConversionMode::DocxToPdf,
            ModeArg::Text => ConversionMode::TextToPdf,
        }
    }
}

/// What `--json` prints on success.
#[derive(Debug, Serialize)]
struct Report<'a> {
    input: String,
    mode: ConversionMode,
    result_location: &'a str,
    output_filename: Option<&'a str>,
    file_size: Option<u64>,
    downloaded_to: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters; keep library
    // INFO logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.health;
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

    let config = build_config(&cli)?;
    let client = Arc::new(RemoteClient::new(config).context("Failed to create HTTP client")?);

    // ── Health-only mode ─────────────────────────────────────────────────
    if cli.health {
        let health = client.health().await.context("Health check failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&health).context("Failed to serialise health")?
            );
        } else {
            let mark = if health.is_healthy() { green("✔") } else { red("✘") };
            println!("{mark} {}  {}", client.base_url(), bold(&health.status));
            if let Some(ref v) = health.version {
                println!("   version:   {v}");
            }
            if let Some(ref t) = health.timestamp {
                println!("   timestamp: {t}");
            }
        }
        if !health.is_healthy() {
            bail!("service reports status '{}'", health.status);
        }
        return Ok(());
    }

    let Some(input) = cli.input.clone() else {
        bail!("no input file given");
    };

    // ── Mode ─────────────────────────────────────────────────────────────
    let mode = match cli.mode {
        Some(m) => m.into(),
        None => {
            let name = input.to_string_lossy();
            ConversionMode::infer_from_name(&name).with_context(|| {
                format!("Cannot infer a conversion mode for '{name}'; pass --mode image|docx|text")
            })?
        }
    };

    // ── Session ──────────────────────────────────────────────────────────
    let mut session = Orchestrator::new(client.clone(), &WorkflowConfig::default());
    if show_progress {
        session = session.with_observer(CliObserver::new());
    }
    session.request_mode_change(mode)?;

    let mut intake = UploadIntake::new();
    let file = intake
        .pick(&input, mode)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let Some(file) = file else {
        let reason = intake
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "file rejected".to_string());
        bail!("{reason} (accepted: {})", mode.policy().description);
    };

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}  {}",
            cyan("◆"),
            bold(file.name()),
            dim(&format_file_size(file.size_bytes())),
            dim(mode.policy().label),
        );
    }

    session.select_file(file)?;
    session.convert()?;
    session.run_until_settled().await;

    // ── Outcome ──────────────────────────────────────────────────────────
    let state = session.state();
    let Some(result) = state.result() else {
        let message = state.error_message().unwrap_or("conversion did not finish");
        if !cli.quiet {
            eprintln!("{} {}", red("✘"), red(message));
        }
        bail!("Conversion failed: {message}");
    };

    let downloaded_to = match cli.output {
        Some(ref path) => {
            let bytes = client
                .download_to_file(&result.location, path)
                .await
                .context("Download failed")?;
            if !cli.quiet && !cli.json {
                eprintln!(
                    "{} {}  →  {}",
                    green("✔"),
                    dim(&format_file_size(bytes)),
                    bold(&path.display().to_string())
                );
            }
            Some(path.display().to_string())
        }
        None => None,
    };

    if cli.json {
        let report = Report {
            input: input.display().to_string(),
            mode,
            result_location: &result.location,
            output_filename: result.output_filename.as_deref(),
            file_size: result.file_size,
            downloaded_to,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise result")?
        );
    } else if downloaded_to.is_none() {
        println!("{}", result.location);
        if !cli.quiet {
            eprintln!("{} converted", green("✔"));
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    ClientConfig::builder()
        .base_url(cli.base_url.as_str())
        .request_timeout_secs(cli.timeout)
        .build()
        .context("Invalid configuration")
}
