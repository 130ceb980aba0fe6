//! Configuration types for PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The heading heuristics live in the
//! nested [`DetectionConfig`] and the header/footer cleanup in
//! [`CleanerConfig`]; every option is an enumerated, named knob with a
//! documented default rather than a free-form flag.

use crate::error::Pdf2TocError;
use crate::progress::ProgressCallback;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a PDF-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2toc::{ConversionConfig, DetectionMode};
///
/// let config = ConversionConfig::builder()
///     .mode(DetectionMode::Experimental)
///     .max_heading_ratio(0.25)
///     .back_to_top(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.detection.min_signals, 2);
/// ```
#[derive(Clone, Default)]
pub struct ConversionConfig {
    /// Heading detection heuristics.
    pub detection: DetectionConfig,

    /// Header/footer cleanup.
    pub cleaner: CleanerConfig,

    /// Markdown layout toggles.
    pub layout: LayoutConfig,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Document title override. If None, uses the PDF metadata title, then
    /// the file stem.
    pub title: Option<String>,

    /// Optional progress callback fired per page and per stage.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("detection", &self.detection)
            .field("cleaner", &self.cleaner)
            .field("layout", &self.layout)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("title", &self.title)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

// ── Detection ────────────────────────────────────────────────────────────

/// Heading detection heuristics.
///
/// A line becomes a heading only when at least [`min_signals`] independent
/// signals agree. All pattern rules together count as a single signal, so a
/// document full of ALL-CAPS lines does not turn into a document full of
/// headings.
///
/// [`min_signals`]: DetectionConfig::min_signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Standard (text + layout) or experimental (adds font size and weight).
    /// Default: [`DetectionMode::Standard`].
    pub mode: DetectionMode,

    /// Pattern rules contributing the `Pattern` signal.
    /// Default: `Numbered`, `Keyword`, `AllCaps`, `TitleCase`.
    pub rules: Vec<HeadingRule>,

    /// The single rule used when the sanity check trips. Default: `Numbered`.
    pub fallback_rule: HeadingRule,

    /// How much blank-line and indentation evidence counts. Default: `Full`.
    pub whitespace: WhitespaceSensitivity,

    /// Distinct signals required for a heading. Default: 2, minimum 2.
    pub min_signals: usize,

    /// Heading share above which detection falls back to `fallback_rule`.
    /// Default: 0.30.
    pub max_heading_ratio: f32,

    /// The ratio check only runs on documents with at least this many lines.
    /// Default: 10.
    pub ratio_check_min_lines: usize,

    /// Lines longer than this are never headings. Default: 80.
    pub max_heading_chars: usize,

    /// `ShortLine` fires at or below this fraction of the median line length.
    /// Default: 0.6.
    pub short_line_ratio: f32,

    /// Experimental: `LargeFont` fires at or above this multiple of the median
    /// font size. Default: 1.15.
    pub font_size_ratio: f32,

    /// Experimental: `Bold` fires when at least this fraction of the line's
    /// characters use a bold face. Default: 0.7.
    pub bold_fraction: f32,

    /// Lines recurring on three or more pages are never headings.
    /// Default: true.
    pub demote_recurring: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mode: DetectionMode::default(),
            rules: vec![
                HeadingRule::Numbered,
                HeadingRule::Keyword,
                HeadingRule::AllCaps,
                HeadingRule::TitleCase,
            ],
            fallback_rule: HeadingRule::Numbered,
            whitespace: WhitespaceSensitivity::default(),
            min_signals: 2,
            max_heading_ratio: 0.30,
            ratio_check_min_lines: 10,
            max_heading_chars: 80,
            short_line_ratio: 0.6,
            font_size_ratio: 1.15,
            bold_fraction: 0.7,
            demote_recurring: true,
        }
    }
}

/// Which signal families the detector may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionMode {
    /// Pattern rules plus whitespace/layout signals (default).
    #[default]
    Standard,
    /// Standard plus font-size and bold signals read from the PDF text objects.
    Experimental,
}

/// A named pattern rule. Each maps to one regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingRule {
    /// `1 Intro`, `2.3 Scope`, `4.1.2. Limits`.
    Numbered,
    /// `Chapter 3`, `Section IV`, `Appendix B`, `Part 2`.
    Keyword,
    /// Short ALL-CAPS lines: `RESULTS AND DISCUSSION`.
    AllCaps,
    /// Capitalised lines made only of letters, spaces and dashes.
    TitleCase,
    /// A caller-supplied regular expression.
    Custom(String),
}

impl HeadingRule {
    /// The regex source for this rule.
    pub fn pattern(&self) -> &str {
        match self {
            HeadingRule::Numbered => r"^\d{1,3}(?:\.\d{1,3}){0,4}\.?\s+\S",
            HeadingRule::Keyword => {
                r"^(?i:chapter|section|part|appendix)\s+(?:\d+|[IVXLC]+|[A-Z])\b"
            }
            HeadingRule::AllCaps => r"^[A-Z][A-Z0-9 &,:'/()\-–—]{2,59}$",
            HeadingRule::TitleCase => {
                r"^[A-Z][a-zA-Z\s-]{1,50}(?:\s*[-–—]\s*[A-Z][a-zA-Z\s-]{1,50})*$"
            }
            HeadingRule::Custom(p) => p.as_str(),
        }
    }

    /// Compile the rule, mapping failures to [`Pdf2TocError::InvalidPattern`].
    pub fn compile(&self) -> Result<Regex, Pdf2TocError> {
        Regex::new(self.pattern()).map_err(|source| Pdf2TocError::InvalidPattern {
            pattern: self.pattern().to_string(),
            source,
        })
    }
}

/// How whitespace around a line is used as heading evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhitespaceSensitivity {
    /// Ignore whitespace entirely.
    Off,
    /// Only blank lines before and after count.
    BlankLines,
    /// Blank lines and indentation both count (default).
    #[default]
    Full,
}

// ── Cleaner ──────────────────────────────────────────────────────────────

/// Header/footer cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerConfig {
    /// Remove lines recurring on a majority of pages. Default: true.
    pub remove_repeated: bool,

    /// Documents with fewer pages skip frequency removal. Default: 3, minimum 3.
    pub min_pages: usize,

    /// Lines fully matching any of these regexes are dropped. Default: empty.
    pub strip_patterns: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            remove_repeated: true,
            min_pages: 3,
            strip_patterns: Vec::new(),
        }
    }
}

impl CleanerConfig {
    /// Strip patterns for the common running headers and footers: chapter
    /// banners, `Page N` labels and instructor notes.
    pub fn header_preset() -> Vec<String> {
        vec![
            r"^Chapter \d+ -.*$".to_string(),
            r"^Page \d+(?: of \d+)?$".to_string(),
            r"^.*\[Instructor\].*$".to_string(),
        ]
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Markdown layout toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Append `[Back to top](#contents)` after each section. Default: true.
    pub back_to_top: bool,

    /// Separate sections with `---`. Default: true.
    pub section_dividers: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            back_to_top: true,
            section_dividers: true,
        }
    }
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn mode(mut self, mode: DetectionMode) -> Self {
        self.config.detection.mode = mode;
        self
    }

    pub fn rules(mut self, rules: Vec<HeadingRule>) -> Self {
        self.config.detection.rules = rules;
        self
    }

    /// Add one rule to the enabled set.
    pub fn rule(mut self, rule: HeadingRule) -> Self {
        if !self.config.detection.rules.contains(&rule) {
            self.config.detection.rules.push(rule);
        }
        self
    }

    pub fn fallback_rule(mut self, rule: HeadingRule) -> Self {
        self.config.detection.fallback_rule = rule;
        self
    }

    pub fn whitespace(mut self, w: WhitespaceSensitivity) -> Self {
        self.config.detection.whitespace = w;
        self
    }

    pub fn min_signals(mut self, n: usize) -> Self {
        self.config.detection.min_signals = n;
        self
    }

    pub fn max_heading_ratio(mut self, r: f32) -> Self {
        self.config.detection.max_heading_ratio = r.clamp(0.01, 1.0);
        self
    }

    pub fn ratio_check_min_lines(mut self, n: usize) -> Self {
        self.config.detection.ratio_check_min_lines = n;
        self
    }

    pub fn max_heading_chars(mut self, n: usize) -> Self {
        self.config.detection.max_heading_chars = n.max(1);
        self
    }

    pub fn short_line_ratio(mut self, r: f32) -> Self {
        self.config.detection.short_line_ratio = r.clamp(0.05, 1.0);
        self
    }

    pub fn font_size_ratio(mut self, r: f32) -> Self {
        self.config.detection.font_size_ratio = r.max(1.0);
        self
    }

    pub fn bold_fraction(mut self, f: f32) -> Self {
        self.config.detection.bold_fraction = f.clamp(0.0, 1.0);
        self
    }

    pub fn demote_recurring(mut self, v: bool) -> Self {
        self.config.detection.demote_recurring = v;
        self
    }

    pub fn remove_repeated(mut self, v: bool) -> Self {
        self.config.cleaner.remove_repeated = v;
        self
    }

    pub fn min_pages(mut self, n: usize) -> Self {
        self.config.cleaner.min_pages = n;
        self
    }

    pub fn strip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.cleaner.strip_patterns.push(pattern.into());
        self
    }

    pub fn strip_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.cleaner.strip_patterns = patterns;
        self
    }

    pub fn back_to_top(mut self, v: bool) -> Self {
        self.config.layout.back_to_top = v;
        self
    }

    pub fn section_dividers(mut self, v: bool) -> Self {
        self.config.layout.section_dividers = v;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints and compiling every
    /// user-supplied pattern once so bad regexes fail before extraction.
    pub fn build(self) -> Result<ConversionConfig, Pdf2TocError> {
        let d = &self.config.detection;
        if d.min_signals < 2 {
            return Err(Pdf2TocError::InvalidConfig(format!(
                "min_signals must be ≥ 2 (a single signal over-detects), got {}",
                d.min_signals
            )));
        }
        if d.rules.is_empty() {
            return Err(Pdf2TocError::InvalidConfig(
                "At least one heading rule must be enabled".into(),
            ));
        }
        if self.config.cleaner.min_pages < 3 {
            return Err(Pdf2TocError::InvalidConfig(format!(
                "min_pages must be ≥ 3, got {}",
                self.config.cleaner.min_pages
            )));
        }
        for rule in d.rules.iter().chain(std::iter::once(&d.fallback_rule)) {
            rule.compile()?;
        }
        for pattern in &self.config.cleaner.strip_patterns {
            Regex::new(pattern).map_err(|source| Pdf2TocError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) if (1..=total_pages).contains(p) => vec![p - 1],
            PageSelection::Single(_) => vec![],
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The lowest page number the selection asks for, 1-indexed.
    ///
    /// `None` for an empty explicit set. `All` asks for page 1.
    pub fn first_page(&self) -> Option<usize> {
        match self {
            PageSelection::All => Some(1),
            PageSelection::Single(p) => Some(*p),
            PageSelection::Range(start, end) => Some((*start).min(*end)),
            PageSelection::Set(pages) => pages.iter().copied().min(),
        }
    }
}
