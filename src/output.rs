//! Data types flowing through and out of the conversion pipeline.
//!
//! Extraction produces [`Page`]s of [`Line`]s; the detector labels each line
//! with a [`Classification`]; the assembler groups them into [`Section`]s and
//! a table of contents inside a [`Document`]. Everything here derives
//! `Serialize` so `--json` can dump the full structure.

use crate::config::{DetectionMode, HeadingRule};
use crate::error::ConversionWarning;
use serde::{Deserialize, Serialize};

/// One line of text as read from a PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Whitespace-collapsed, trimmed text. Never empty.
    pub text: String,
    /// 1-indexed source page.
    pub page: usize,
    /// 0-indexed position among the non-empty lines of the page.
    pub index: usize,
    /// Leading whitespace in the raw text, in characters.
    pub indent: usize,
    /// A blank line (or the top of the page) precedes this line.
    pub blank_before: bool,
    /// A blank line (or the bottom of the page) follows this line.
    pub blank_after: bool,
    /// Font attributes; only populated in experimental mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<LineStyle>,
}

impl Line {
    /// A plain body-style line with no surrounding whitespace evidence.
    pub fn new(text: impl Into<String>, page: usize, index: usize) -> Self {
        Self {
            text: text.into(),
            page,
            index,
            indent: 0,
            blank_before: false,
            blank_after: false,
            style: None,
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_blank_around(mut self, before: bool, after: bool) -> Self {
        self.blank_before = before;
        self.blank_after = after;
        self
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Dominant font attributes of a line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    /// Scaled font size in points of the text covering most of the line.
    pub font_size: f32,
    /// Share of the line's characters set in a bold face, 0.0–1.0.
    pub bold_fraction: f32,
}

/// The lines of one PDF page, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: usize,
    pub lines: Vec<Line>,
}

impl Page {
    /// True when the page carries no extractable text at all.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }
}

/// Independent pieces of evidence that a line is a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// One of the enabled pattern rules matched.
    Pattern,
    /// Blank lines both before and after.
    BlankLines,
    /// Indented differently from the page's usual indentation.
    Indentation,
    /// Much shorter than the typical line and without terminal punctuation.
    ShortLine,
    /// Set in a noticeably larger font than the body text.
    LargeFont,
    /// Set mostly in bold.
    Bold,
}

/// Heading/Body label for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Markdown heading level, 2–4 (`#` is reserved for the document title).
    Heading { level: u8 },
    Body,
}

impl Classification {
    pub fn is_heading(&self) -> bool {
        matches!(self, Classification::Heading { .. })
    }
}

/// A line together with its label and the signals that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    pub line: Line,
    pub class: Classification,
    pub signals: Vec<Signal>,
}

/// Which policy produced the final classifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetectionOutcome {
    /// The multi-signal conjunction in the configured mode.
    Conjunction { mode: DetectionMode, min_signals: usize },
    /// Too many headings; a single pattern rule was used instead.
    PatternFallback { rule: HeadingRule },
}

/// Summary of a detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub outcome: DetectionOutcome,
    /// Lines classified.
    pub lines: usize,
    /// Lines classified as headings by the final policy.
    pub headings: usize,
    /// Headings the conjunction produced before any fallback.
    pub conjunction_headings: usize,
    /// `conjunction_headings / lines`, 0.0 for an empty document.
    pub heading_ratio: f32,
    /// The conjunction tripped the heading-ratio sanity check.
    pub low_confidence: bool,
}

/// A detected heading with its resolved anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub title: String,
    /// Unique slug; the target of the matching TOC link.
    pub anchor: String,
    pub level: u8,
    /// 1-indexed source page.
    pub page: usize,
}

/// A heading and the body lines up to the next heading.
///
/// The first section of a document may have no heading (the preamble).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: Option<Heading>,
    pub body: Vec<Line>,
}

/// One row of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub anchor: String,
    pub level: u8,
}

/// The assembled document, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub toc: Vec<TocEntry>,
    pub sections: Vec<Section>,
    pub detection: DetectionReport,
}

impl Document {
    /// Every line of the document in output order, headings included.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().flat_map(|s| {
            s.heading
                .iter()
                .map(|h| h.title.as_str())
                .chain(s.body.iter().map(|l| l.text.as_str()))
        })
    }
}

/// PDF document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Counters collected during a conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the PDF.
    pub total_pages: usize,
    /// Pages read after applying the page selection.
    pub processed_pages: usize,
    /// Non-empty lines read from the processed pages.
    pub lines_extracted: usize,
    /// Lines dropped as boilerplate or by strip patterns.
    pub lines_removed: usize,
    /// Headings in the table of contents.
    pub headings: usize,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Rendered Markdown, ending with a single newline.
    pub markdown: String,
    pub document: Document,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
    /// Non-fatal quality warnings.
    pub warnings: Vec<ConversionWarning>,
}
