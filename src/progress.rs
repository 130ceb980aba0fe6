//! Progress-callback trait for per-page and per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline reads each page and moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use pdf2toc::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_extracted(&self, page_num: usize, total_pages: usize, line_count: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} lines", page_num, total_pages, line_count);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Pipeline stages after extraction, reported through
/// [`ConversionProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Detect,
    Assemble,
    Write,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Clean => "Removing headers/footers",
            Stage::Detect => "Detecting headings",
            Stage::Assemble => "Building table of contents",
            Stage::Write => "Writing Markdown",
        }
    }
}

/// Called by the conversion pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The trait is `Send + Sync` so a callback can be
/// shared with a progress-bar thread.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the page count is known, before any text is read.
    ///
    /// # Arguments
    /// * `total_pages` — number of selected pages that will be read
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page's text has been split into lines.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — number of selected pages
    /// * `line_count`  — non-empty lines found on the page
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, line_count: usize) {
        let _ = (page_num, total_pages, line_count);
    }

    /// Called when a post-extraction stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once after the Markdown has been assembled.
    ///
    /// # Arguments
    /// * `heading_count`  — headings in the table of contents
    /// * `low_confidence` — detection fell back to the pattern-only mode
    fn on_conversion_complete(&self, heading_count: usize, low_confidence: bool) {
        let _ = (heading_count, low_confidence);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
