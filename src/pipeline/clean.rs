//! Header/footer removal.
//!
//! Running headers, footers and page labels recur on most pages. Every line
//! is reduced to a key (lower-cased, digit runs replaced by `#`) so `Page 3`
//! and `Page 4` compare equal; a key present on a strict majority of pages is
//! boilerplate and every line carrying it is dropped.
//!
//! The frequency table is returned as an explicit [`Boilerplate`] value for
//! the detector, which uses it to keep running titles out of the TOC.

use crate::config::CleanerConfig;
use crate::error::Pdf2TocError;
use crate::output::{Line, Page};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Comparison key ignoring case, spacing and page-number-like tokens.
pub fn boilerplate_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    RE_DIGITS.replace_all(&collapsed, "#").into_owned()
}

/// Per-key page frequencies observed by the cleaner.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Boilerplate {
    /// Pages considered.
    pub page_count: usize,
    /// Key → number of distinct pages it appears on.
    pub frequencies: HashMap<String, usize>,
    /// Keys removed as boilerplate.
    pub removed: HashSet<String>,
}

impl Boilerplate {
    /// Build the frequency table for a set of pages.
    pub fn observe(pages: &[Page]) -> Self {
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for page in pages {
            let keys: HashSet<String> = page.lines.iter().map(|l| boilerplate_key(&l.text)).collect();
            for key in keys {
                *frequencies.entry(key).or_default() += 1;
            }
        }
        Self {
            page_count: pages.len(),
            frequencies,
            removed: HashSet::new(),
        }
    }

    /// Distinct pages the line's key appears on.
    pub fn pages_containing(&self, text: &str) -> usize {
        self.frequencies
            .get(&boilerplate_key(text))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_removed(&self, text: &str) -> bool {
        self.removed.contains(&boilerplate_key(text))
    }
}

/// Cleaned lines in source order, plus what the cleaner learned.
#[derive(Debug, Clone)]
pub struct CleanedText {
    pub lines: Vec<Line>,
    pub boilerplate: Boilerplate,
    /// Lines dropped by frequency or strip patterns.
    pub removed_lines: usize,
}

/// Remove boilerplate and strip-pattern lines, flattening pages into one
/// ordered sequence.
pub fn clean_pages(pages: Vec<Page>, config: &CleanerConfig) -> Result<CleanedText, Pdf2TocError> {
    let strip = compile_strip_patterns(&config.strip_patterns)?;
    let mut boilerplate = Boilerplate::observe(&pages);

    let frequency_removal = config.remove_repeated && pages.len() >= config.min_pages;
    if frequency_removal {
        let total = pages.len();
        boilerplate.removed = boilerplate
            .frequencies
            .iter()
            .filter(|(_, &count)| count * 2 > total)
            .map(|(key, _)| key.clone())
            .collect();
        info!(
            "Boilerplate: {} recurring line keys across {} pages",
            boilerplate.removed.len(),
            total
        );
    } else {
        debug!(
            "Skipping frequency-based removal ({} pages, minimum {})",
            pages.len(),
            config.min_pages
        );
    }

    let mut lines = Vec::new();
    let mut removed_lines = 0usize;
    for page in pages {
        for line in page.lines {
            let drop_line = (frequency_removal && boilerplate.is_removed(&line.text))
                || strip.iter().any(|re| re.is_match(&line.text));
            if drop_line {
                debug!("Dropping line from page {}: {:?}", line.page, line.text);
                removed_lines += 1;
            } else {
                lines.push(line);
            }
        }
    }

    Ok(CleanedText {
        lines,
        boilerplate,
        removed_lines,
    })
}

/// Strip patterns must match the whole line.
fn compile_strip_patterns(patterns: &[String]) -> Result<Vec<Regex>, Pdf2TocError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p)).map_err(|source| Pdf2TocError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}
