//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline on a PDF file and returns the
//! Markdown in memory. [`convert_pages`] runs everything after extraction on
//! pages the caller already has, which is what the tests and any non-pdfium
//! text source use. [`convert_to_dir`] and [`convert_to_file`] add the write
//! step; nothing is written unless the conversion succeeded.

use crate::config::ConversionConfig;
use crate::error::{ConversionWarning, Pdf2TocError};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, Page};
use crate::pipeline::{assemble, clean, detect, extract, input};
use crate::progress::Stage;
use crate::writer::OutputTarget;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert a PDF file to structured Markdown.
///
/// # Errors
/// Returns `Err(Pdf2TocError)` for fatal errors only:
/// - File not found / permission denied / not a PDF
/// - Encrypted without (or with the wrong) password
/// - No text layer on any selected page
/// - Invalid patterns in the configuration
///
/// A low-confidence heading detection is not an error; it is reported in
/// `output.warnings`.
pub fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TocError> {
    let total_start = Instant::now();
    let resolved = input::resolve_input(input)?;
    info!("Starting conversion: {}", resolved.path().display());

    let extract_start = Instant::now();
    let extracted = extract::extract_document(resolved.path(), config)?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} pages in {}ms",
        extracted.pages.len(),
        extract_duration_ms
    );

    let mut output = convert_pages(extracted.pages, extracted.metadata, resolved.path(), config)?;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Clean, detect, assemble and render already-extracted pages.
///
/// `source` is only used for the title fallback and error messages; it is not
/// read.
pub fn convert_pages(
    pages: Vec<Page>,
    metadata: DocumentMetadata,
    source: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TocError> {
    let start = Instant::now();
    extract::ensure_text_layer(&pages, source)?;

    let processed_pages = pages.len();
    let lines_extracted: usize = pages.iter().map(|p| p.lines.len()).sum();
    let report_stage = |stage: Stage| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(stage);
        }
    };

    report_stage(Stage::Clean);
    let cleaned = clean::clean_pages(pages, &config.cleaner)?;
    debug!(
        "{} lines after cleaning ({} removed)",
        cleaned.lines.len(),
        cleaned.removed_lines
    );

    report_stage(Stage::Detect);
    let detector = detect::Detector::new(&config.detection)?;
    let detection = detector.classify(cleaned.lines, &cleaned.boilerplate);

    let mut warnings = Vec::new();
    if detection.report.low_confidence {
        warnings.push(ConversionWarning::LowConfidence {
            headings: detection.report.conjunction_headings,
            lines: detection.report.lines,
            percent: detection.report.heading_ratio * 100.0,
            limit_percent: config.detection.max_heading_ratio * 100.0,
        });
    }

    report_stage(Stage::Assemble);
    let title = resolve_title(config, &metadata, source);
    let document = assemble::assemble(detection.lines, title, detection.report);
    let markdown = assemble::render_markdown(&document, &config.layout, &warnings);

    let headings = document.toc.len();
    let low_confidence = document.detection.low_confidence;
    let stats = ConversionStats {
        total_pages: metadata.page_count.max(processed_pages),
        processed_pages,
        lines_extracted,
        lines_removed: cleaned.removed_lines,
        headings,
        extract_duration_ms: 0,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} headings from {} pages{}",
        headings,
        processed_pages,
        if low_confidence { " (low confidence)" } else { "" }
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(headings, low_confidence);
    }

    Ok(ConversionOutput {
        markdown,
        document,
        metadata,
        stats,
        warnings,
    })
}

/// Convert and write `<stem> (<letter>_<Mon>_<DD>).md` into `dir`.
///
/// Returns the path written together with the conversion output.
pub fn convert_to_dir(
    input: impl AsRef<Path>,
    dir: impl AsRef<Path>,
    date: NaiveDate,
    config: &ConversionConfig,
) -> Result<(PathBuf, ConversionOutput), Pdf2TocError> {
    let input = input.as_ref();
    let output = convert(input, config)?;
    let target = OutputTarget::Dated {
        dir: dir.as_ref().to_path_buf(),
        date,
    };
    let path = write_output(&target, input, &output, config)?;
    Ok((path, output))
}

/// Convert and write to an explicit path, refusing to replace an existing
/// file.
pub fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TocError> {
    let input = input.as_ref();
    let output = convert(input, config)?;
    let target = OutputTarget::File(output_path.as_ref().to_path_buf());
    write_output(&target, input, &output, config)?;
    Ok(output)
}

/// Extract PDF metadata without converting content.
pub fn inspect(
    input: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2TocError> {
    let resolved = input::resolve_input(input)?;
    extract::extract_metadata(resolved.path(), password)
}

/// The directory dated output goes to when none is given: the PDF's own.
pub fn default_output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn write_output(
    target: &OutputTarget,
    input: &Path,
    output: &ConversionOutput,
    config: &ConversionConfig,
) -> Result<PathBuf, Pdf2TocError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(Stage::Write);
    }
    target.write(&input::file_stem(input), &output.markdown)
}

/// Title override, then PDF metadata, then the file stem.
fn resolve_title(config: &ConversionConfig, metadata: &DocumentMetadata, source: &Path) -> String {
    let non_blank = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    non_blank(&config.title)
        .or_else(|| non_blank(&metadata.title))
        .or_else(|| Some(input::file_stem(source)).filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "Untitled".to_string())
}
