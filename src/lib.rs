//! # pdf2toc
//!
//! Convert text-based PDF documents into a single structured Markdown file
//! with a linked table of contents.
//!
//! ## Why heuristics need a conjunction
//!
//! PDFs carry no semantic structure, only positioned text. Any single cue
//! for "this line is a heading" (an ALL-CAPS line, a short line, a bold line)
//! misfires on real documents. This crate requires several independent
//! signals to agree, and if even that labels an implausible share of lines as
//! headings it falls back to a strict pattern and says so in the output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check the file exists and starts with %PDF
//!  ├─ 2. Extract   per-page text lines via pdfium
//!  ├─ 3. Clean     drop running headers/footers and page labels
//!  ├─ 4. Detect    Heading/Body per line (≥ 2 signals, 30% sanity check)
//!  ├─ 5. Assemble  sections, unique anchors, TOC, Markdown
//!  └─ 6. Write     `<name> (a_May_23).md`, never overwriting
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2toc::{convert, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("lecture.pdf", &config)?;
//!     println!("{}", output.markdown);
//!     for warning in &output.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2toc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2toc = { version = "0.1", default-features = false }
//! ```
//!
//! pdfium is loaded at runtime from `PDFIUM_LIB_PATH`, the working
//! directory, or the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod writer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CleanerConfig, ConversionConfig, ConversionConfigBuilder, DetectionConfig, DetectionMode,
    HeadingRule, LayoutConfig, PageSelection, WhitespaceSensitivity,
};
pub use convert::{convert, convert_pages, convert_to_dir, convert_to_file, default_output_dir, inspect};
pub use error::{ConversionWarning, ErrorKind, Pdf2TocError};
pub use output::{
    Classification, ConversionOutput, ConversionStats, Document, DocumentMetadata, Line, Page,
    Section, Signal, TocEntry,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use writer::{output_file_name, OutputTarget};
