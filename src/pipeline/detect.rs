//! Heading detection.
//!
//! Each line is scored against independent [`Signal`]s. A line is a heading
//! only when at least `min_signals` distinct signals fire; all pattern rules
//! together contribute a single `Pattern` signal, so a regex match alone is
//! never enough.
//!
//! When the conjunction still labels more than `max_heading_ratio` of the
//! lines as headings, the document does not look like it has recognisable
//! structure. Detection then falls back to the single `fallback_rule` regex
//! and the result is flagged low confidence.

use crate::config::{DetectionConfig, DetectionMode, HeadingRule, WhitespaceSensitivity};
use crate::error::Pdf2TocError;
use crate::output::{
    Classification, ClassifiedLine, DetectionOutcome, DetectionReport, Line, Signal,
};
use crate::pipeline::clean::Boilerplate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Captures the numeric prefix of `1`, `2.3`, `4.1.2.` headings.
static RE_NUMBERING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){0,4})\.?\s").unwrap());

/// A line recurring on this many pages is a running title, not a heading.
const RECURRING_PAGES: usize = 3;

/// Indentation must differ by at least this many columns to count.
const INDENT_TOLERANCE: usize = 2;

/// Classified lines and a summary of how they were classified.
#[derive(Debug, Clone)]
pub struct Detection {
    pub lines: Vec<ClassifiedLine>,
    pub report: DetectionReport,
}

/// Document-wide statistics the relative signals compare against.
struct LayoutStats {
    median_len: f32,
    median_font: Option<f32>,
    page_indent: HashMap<usize, usize>,
}

impl LayoutStats {
    fn gather(lines: &[Line]) -> Self {
        let mut lens: Vec<f32> = lines.iter().map(|l| l.text.chars().count() as f32).collect();
        let mut fonts: Vec<f32> = lines
            .iter()
            .filter_map(|l| l.style.map(|s| s.font_size))
            .filter(|s| *s > 0.0)
            .collect();

        let mut indents: HashMap<usize, HashMap<usize, usize>> = HashMap::new();
        for line in lines {
            *indents
                .entry(line.page)
                .or_default()
                .entry(line.indent)
                .or_default() += 1;
        }
        let page_indent = indents
            .into_iter()
            .map(|(page, counts)| {
                let dominant = counts
                    .into_iter()
                    .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                    .map(|(indent, _)| indent)
                    .unwrap_or(0);
                (page, dominant)
            })
            .collect();

        Self {
            median_len: median(&mut lens).unwrap_or(0.0),
            median_font: median(&mut fonts),
            page_indent,
        }
    }
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Compiled heading detector.
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectionConfig,
    rules: Vec<Regex>,
    fallback: Regex,
}

impl Detector {
    /// Compile every enabled rule and the fallback rule.
    pub fn new(config: &DetectionConfig) -> Result<Self, Pdf2TocError> {
        let rules = config
            .rules
            .iter()
            .map(HeadingRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            config: config.clone(),
            rules,
            fallback: config.fallback_rule.compile()?,
        })
    }

    /// Label every line Heading or Body, preserving order.
    pub fn classify(&self, lines: Vec<Line>, boilerplate: &Boilerplate) -> Detection {
        let stats = LayoutStats::gather(&lines);
        let total = lines.len();

        let scored: Vec<(Line, Vec<Signal>, bool)> = lines
            .into_iter()
            .map(|line| {
                let eligible = self.is_eligible(&line, boilerplate);
                let signals = if eligible {
                    self.signals(&line, &stats)
                } else {
                    Vec::new()
                };
                (line, signals, eligible)
            })
            .collect();

        let conjunction_headings = scored
            .iter()
            .filter(|(_, signals, _)| signals.len() >= self.config.min_signals)
            .count();

        let ratio = if total == 0 {
            0.0
        } else {
            conjunction_headings as f32 / total as f32
        };
        let low_confidence =
            total >= self.config.ratio_check_min_lines && ratio > self.config.max_heading_ratio;

        let classified: Vec<ClassifiedLine> = if low_confidence {
            warn!(
                "{}/{} lines ({:.0}%) look like headings, above the {:.0}% limit; \
                 falling back to {:?} pattern only",
                conjunction_headings,
                total,
                ratio * 100.0,
                self.config.max_heading_ratio * 100.0,
                self.config.fallback_rule
            );
            scored
                .into_iter()
                .map(|(line, _, eligible)| self.classify_fallback(line, eligible))
                .collect()
        } else {
            scored
                .into_iter()
                .map(|(line, signals, _)| {
                    let class = if signals.len() >= self.config.min_signals {
                        debug!("Heading p{} {:?} via {:?}", line.page, line.text, signals);
                        Classification::Heading {
                            level: self.heading_level(&line.text, &signals),
                        }
                    } else {
                        Classification::Body
                    };
                    ClassifiedLine {
                        line,
                        class,
                        signals,
                    }
                })
                .collect()
        };

        let headings = classified.iter().filter(|c| c.class.is_heading()).count();
        let outcome = if low_confidence {
            DetectionOutcome::PatternFallback {
                rule: self.config.fallback_rule.clone(),
            }
        } else {
            DetectionOutcome::Conjunction {
                mode: self.config.mode,
                min_signals: self.config.min_signals,
            }
        };
        info!("Detected {} headings in {} lines", headings, total);

        Detection {
            lines: classified,
            report: DetectionReport {
                outcome,
                lines: total,
                headings,
                conjunction_headings,
                heading_ratio: ratio,
                low_confidence,
            },
        }
    }

    /// Hard filters applied before any signal is considered.
    fn is_eligible(&self, line: &Line, boilerplate: &Boilerplate) -> bool {
        if line.text.chars().count() > self.config.max_heading_chars {
            return false;
        }
        if !line.text.chars().any(char::is_alphabetic) {
            return false;
        }
        !(self.config.demote_recurring && boilerplate.pages_containing(&line.text) >= RECURRING_PAGES)
    }

    fn signals(&self, line: &Line, stats: &LayoutStats) -> Vec<Signal> {
        let mut signals = Vec::new();
        let text = line.text.as_str();

        if self.rules.iter().any(|re| re.is_match(text)) {
            signals.push(Signal::Pattern);
        }

        if self.config.whitespace != WhitespaceSensitivity::Off
            && line.blank_before
            && line.blank_after
        {
            signals.push(Signal::BlankLines);
        }

        if self.config.whitespace == WhitespaceSensitivity::Full {
            let dominant = stats.page_indent.get(&line.page).copied().unwrap_or(0);
            if line.indent.abs_diff(dominant) >= INDENT_TOLERANCE {
                signals.push(Signal::Indentation);
            }
        }

        let len = text.chars().count() as f32;
        let terminal = text.ends_with(['.', ',', ';']);
        if !terminal && len <= stats.median_len * self.config.short_line_ratio {
            signals.push(Signal::ShortLine);
        }

        if self.config.mode == DetectionMode::Experimental {
            if let Some(style) = line.style {
                if let Some(median_font) = stats.median_font {
                    if style.font_size >= median_font * self.config.font_size_ratio {
                        signals.push(Signal::LargeFont);
                    }
                }
                if style.bold_fraction >= self.config.bold_fraction {
                    signals.push(Signal::Bold);
                }
            }
        }

        signals
    }

    fn classify_fallback(&self, line: Line, eligible: bool) -> ClassifiedLine {
        let matched = eligible && self.fallback.is_match(&line.text);
        let (class, signals) = if matched {
            (
                Classification::Heading {
                    level: numbering_level(&line.text).unwrap_or(2),
                },
                vec![Signal::Pattern],
            )
        } else {
            (Classification::Body, Vec::new())
        };
        ClassifiedLine {
            line,
            class,
            signals,
        }
    }

    fn heading_level(&self, text: &str, signals: &[Signal]) -> u8 {
        if let Some(level) = numbering_level(text) {
            return level;
        }
        if self.config.mode == DetectionMode::Experimental
            && signals.contains(&Signal::Bold)
            && !signals.contains(&Signal::LargeFont)
        {
            return 3;
        }
        2
    }
}

/// `1 Intro` → 2, `1.2 Scope` → 3, `1.2.3 Detail` and deeper → 4.
pub fn numbering_level(text: &str) -> Option<u8> {
    let caps = RE_NUMBERING.captures(text)?;
    let depth = caps[1].split('.').count();
    Some((1 + depth).clamp(2, 4) as u8)
}
