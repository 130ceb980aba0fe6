//! Error types for the pdf2toc library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`Pdf2TocError`] — **Fatal**: the conversion cannot proceed (unreadable
//!   input, no text layer, unwritable output directory). Returned as
//!   `Err(Pdf2TocError)` from the top-level `convert*` functions and never
//!   retried.
//!
//! * [`ConversionWarning`] — **Non-fatal**: the Markdown was produced, but a
//!   quality concern was detected (heading detection fell back to the
//!   pattern-only mode). Stored in [`crate::output::ConversionOutput`] and
//!   noted in the rendered table of contents.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse grouping of [`Pdf2TocError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// The PDF could not be read, parsed or has no text layer.
    Extraction,
    /// The Markdown could not be written to its destination.
    Write,
    /// The configuration was rejected before any work started.
    Config,
}

/// All fatal errors returned by the pdf2toc library.
#[derive(Debug, Error)]
pub enum Pdf2TocError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Every selected page came back without extractable text.
    #[error(
        "No text detected in '{path}' ({pages} pages checked). Is this a scanned PDF?\n\
Run it through an OCR tool first; this converter only reads the text layer."
    )]
    NoTextLayer { path: PathBuf, pages: usize },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The page selection names no pages at all.
    #[error("No pages selected (document has {total} pages)")]
    NoPagesSelected { total: usize },

    /// pdfium returned an error while reading a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    PageExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, place the library\n\
next to the executable's working directory, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Write errors ──────────────────────────────────────────────────────
    /// The output directory does not exist or is not a directory.
    #[error("Output directory '{path}' does not exist or is not a directory")]
    OutputDirMissing { path: PathBuf },

    /// All 26 letter suffixes for this basename and date are taken.
    #[error("Every output name from '{base} (a_{date}).md' to '{base} (z_{date}).md' already exists in '{dir}'")]
    SuffixSpaceExhausted {
        dir: PathBuf,
        base: String,
        date: String,
    },

    /// An explicitly requested output file already exists.
    #[error("Refusing to overwrite existing file '{path}'")]
    OutputExists { path: PathBuf },

    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A user-supplied regex did not compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Pdf2TocError {
    /// Which stage of the run this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Pdf2TocError::FileNotFound { .. }
            | Pdf2TocError::PermissionDenied { .. }
            | Pdf2TocError::NotAPdf { .. }
            | Pdf2TocError::CorruptPdf { .. }
            | Pdf2TocError::PasswordRequired { .. }
            | Pdf2TocError::WrongPassword { .. }
            | Pdf2TocError::NoTextLayer { .. }
            | Pdf2TocError::PageOutOfRange { .. }
            | Pdf2TocError::NoPagesSelected { .. }
            | Pdf2TocError::PageExtractionFailed { .. }
            | Pdf2TocError::PdfiumBindingFailed(_) => ErrorKind::Extraction,
            Pdf2TocError::OutputDirMissing { .. }
            | Pdf2TocError::SuffixSpaceExhausted { .. }
            | Pdf2TocError::OutputExists { .. }
            | Pdf2TocError::OutputWriteFailed { .. } => ErrorKind::Write,
            Pdf2TocError::InvalidConfig(_) | Pdf2TocError::InvalidPattern { .. } => {
                ErrorKind::Config
            }
        }
    }
}

/// A non-fatal quality warning attached to a successful conversion.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ConversionWarning {
    /// Too many lines looked like headings; detection fell back to a single
    /// pattern rule.
    #[error(
        "Low confidence: {headings}/{lines} lines ({percent:.0}%) matched as headings, \
above the {limit_percent:.0}% limit; fell back to pattern-only detection"
    )]
    LowConfidence {
        headings: usize,
        lines: usize,
        percent: f32,
        limit_percent: f32,
    },
}
