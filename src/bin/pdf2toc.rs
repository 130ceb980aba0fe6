//! CLI binary for pdf2toc.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, runs the conversion and writes the result.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2toc::{
    convert, convert_to_dir, convert_to_file, default_output_dir, inspect, CleanerConfig,
    ConversionConfig, ConversionOutput, ConversionProgressCallback, DetectionMode, HeadingRule,
    PageSelection, ProgressCallback, Stage, WhitespaceSensitivity,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a page bar while text is extracted, then a spinner
/// labelled with the current stage.
struct CliProgressCallback {
    bar: ProgressBar,
    verbose: bool,
}

impl CliProgressCallback {
    fn new(verbose: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar, verbose })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, line_count: usize) {
        if self.verbose {
            self.bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                green("✓"),
                page_num,
                total_pages,
                dim(&format!("{line_count:>5} lines")),
            ));
        }
        self.bar.inc(1);
    }

    fn on_stage(&self, stage: Stage) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix(format!("{:?}", stage));
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_conversion_complete(&self, heading_count: usize, low_confidence: bool) {
        self.bar.finish_and_clear();
        let mark = if low_confidence { yellow("⚠") } else { green("✔") };
        eprintln!("{} {} headings detected", mark, bold(&heading_count.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Write "lecture (a_May_23).md" next to the PDF
  pdf2toc lecture.pdf

  # Into another directory, with an explicit date
  pdf2toc --output-dir notes/ --date 2024-05-23 lecture.pdf

  # Explicit output file (refused if it exists)
  pdf2toc lecture.pdf -o lecture.md

  # Print to stdout, only numbered headings
  pdf2toc --stdout --rules numbered lecture.pdf

  # Strip course running headers and use font cues
  pdf2toc --strip-headers --mode experimental slides.pdf

  # Inspect PDF metadata only
  pdf2toc --inspect-only lecture.pdf

OUTPUT NAMING:
  <name> (<letter>_<Mon>_<DD>).md  e.g. "lecture (a_May_23).md"
  The letter advances a→z past existing files; nothing is ever overwritten.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH      Directory containing libpdfium
  RUST_LOG             Log filter (overrides -v / -q)
"#;

/// Convert a text-based PDF into structured Markdown with a table of contents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2toc",
    version,
    about = "Convert a PDF into structured Markdown with a linked table of contents",
    long_about = "Extract the text of a PDF, remove running headers and footers, detect \
section headings from several independent signals, and write a single Markdown file \
with an anchor-linked table of contents.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Directory for the dated output file (default: the PDF's directory).
    #[arg(long, env = "PDF2TOC_OUTPUT_DIR", conflicts_with_all = ["output", "stdout", "json"])]
    output_dir: Option<PathBuf>,

    /// Write to this exact file; refused if it already exists.
    #[arg(short, long, env = "PDF2TOC_OUTPUT", conflicts_with_all = ["stdout", "json"])]
    output: Option<PathBuf>,

    /// Print Markdown to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Print the full ConversionOutput as JSON to stdout.
    #[arg(long, conflicts_with = "stdout")]
    json: bool,

    /// Date used in the output name, YYYY-MM-DD (default: today).
    #[arg(long, env = "PDF2TOC_DATE", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Document title (default: PDF metadata title, then file name).
    #[arg(long)]
    title: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2TOC_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TOC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Detection mode.
    #[arg(long, value_enum, default_value = "standard")]
    mode: ModeArg,

    /// Enabled heading rules (comma-separated).
    #[arg(long, value_enum, value_delimiter = ',')]
    rules: Vec<RuleArg>,

    /// Additional heading regex (repeatable).
    #[arg(long = "heading-pattern", value_name = "REGEX")]
    heading_patterns: Vec<String>,

    /// Rule used alone when detection falls back to low-confidence mode.
    #[arg(long, value_enum)]
    fallback_rule: Option<RuleArg>,

    /// How much blank lines and indentation count as heading evidence.
    #[arg(long, value_enum, default_value = "full")]
    whitespace: WhitespaceArg,

    /// Independent signals required for a heading (≥ 2).
    #[arg(long)]
    min_signals: Option<usize>,

    /// Heading share above which detection falls back (0–1).
    #[arg(long)]
    max_heading_ratio: Option<f32>,

    /// Experimental: font size ratio over the median that counts as large.
    #[arg(long)]
    font_size_ratio: Option<f32>,

    /// Experimental: share of bold characters that counts as a bold line.
    #[arg(long)]
    bold_fraction: Option<f32>,

    /// Keep lines that recur on most pages.
    #[arg(long)]
    no_boilerplate: bool,

    /// Strip `Chapter N - …`, `Page N` and `[Instructor]` lines.
    #[arg(long)]
    strip_headers: bool,

    /// Additional whole-line regex to strip (repeatable).
    #[arg(long = "strip-pattern", value_name = "REGEX")]
    strip_patterns: Vec<String>,

    /// Omit `[Back to top](#contents)` links.
    #[arg(long)]
    no_back_links: bool,

    /// Omit `---` between sections.
    #[arg(long)]
    no_dividers: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Standard,
    Experimental,
}

impl From<ModeArg> for DetectionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Standard => DetectionMode::Standard,
            ModeArg::Experimental => DetectionMode::Experimental,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RuleArg {
    Numbered,
    Keyword,
    AllCaps,
    TitleCase,
}

impl From<RuleArg> for HeadingRule {
    fn from(v: RuleArg) -> Self {
        match v {
            RuleArg::Numbered => HeadingRule::Numbered,
            RuleArg::Keyword => HeadingRule::Keyword,
            RuleArg::AllCaps => HeadingRule::AllCaps,
            RuleArg::TitleCase => HeadingRule::TitleCase,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum WhitespaceArg {
    Off,
    BlankLines,
    Full,
}

impl From<WhitespaceArg> for WhitespaceSensitivity {
    fn from(v: WhitespaceArg) -> Self {
        match v {
            WhitespaceArg::Off => WhitespaceSensitivity::Off,
            WhitespaceArg::BlankLines => WhitespaceSensitivity::BlankLines,
            WhitespaceArg::Full => WhitespaceSensitivity::Full,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; warnings still get through.
    let prints_to_stdout = cli.stdout || cli.json;
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref()).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
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
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(cli.verbose);
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    if prints_to_stdout {
        let output = convert(&cli.input, &config).context("Conversion failed")?;
        report_warnings(&cli, &output);

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        } else {
            handle
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    let (path, output) = if let Some(ref output_path) = cli.output {
        let output = convert_to_file(&cli.input, output_path, &config)
            .with_context(|| format!("Failed to convert {}", cli.input.display()))?;
        (output_path.clone(), output)
    } else {
        let dir = cli
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&cli.input));
        let date = cli
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        convert_to_dir(&cli.input, &dir, date, &config)
            .with_context(|| format!("Failed to convert {}", cli.input.display()))?
    };

    report_warnings(&cli, &output);
    if !cli.quiet {
        eprintln!(
            "{}  {} headings  {}/{} pages  {}ms",
            green("✔"),
            output.stats.headings,
            output.stats.processed_pages,
            output.stats.total_pages,
            output.stats.total_duration_ms,
        );
    }
    println!("{}", path.display());

    Ok(())
}

fn report_warnings(cli: &Cli, output: &ConversionOutput) {
    if cli.quiet {
        return;
    }
    for warning in &output.warnings {
        eprintln!("{} {}", yellow("⚠"), warning);
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .mode(cli.mode.into())
        .whitespace(cli.whitespace.into())
        .remove_repeated(!cli.no_boilerplate)
        .back_to_top(!cli.no_back_links)
        .section_dividers(!cli.no_dividers)
        .pages(pages);

    if !cli.rules.is_empty() {
        builder = builder.rules(cli.rules.iter().map(|&r| r.into()).collect());
    }
    for pattern in &cli.heading_patterns {
        builder = builder.rule(HeadingRule::Custom(pattern.clone()));
    }
    if let Some(rule) = cli.fallback_rule {
        builder = builder.fallback_rule(rule.into());
    }
    if let Some(n) = cli.min_signals {
        builder = builder.min_signals(n);
    }
    if let Some(r) = cli.max_heading_ratio {
        builder = builder.max_heading_ratio(r);
    }
    if let Some(r) = cli.font_size_ratio {
        builder = builder.font_size_ratio(r);
    }
    if let Some(f) = cli.bold_fraction {
        builder = builder.bold_fraction(f);
    }

    let mut strip = Vec::new();
    if cli.strip_headers {
        strip.extend(CleanerConfig::header_preset());
    }
    strip.extend(cli.strip_patterns.iter().cloned());
    builder = builder.strip_patterns(strip);

    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--date` as `YYYY-MM-DD`.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{}': {}", s, e))
}
