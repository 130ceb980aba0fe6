//! Document assembly and Markdown rendering.
//!
//! Classified lines are grouped into sections: each heading owns the body
//! lines up to the next heading, and body lines before the first heading form
//! an unlabeled preamble. Every heading gets a unique anchor slug, and the
//! table of contents links to those anchors in encounter order. Slugs the
//! rendered page already uses (the title and `contents`) are never handed
//! to a section.

use crate::config::LayoutConfig;
use crate::error::ConversionWarning;
use crate::output::{
    Classification, ClassifiedLine, DetectionReport, Document, Heading, Line, Section, TocEntry,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Anchor of the table of contents; back links point here.
pub const CONTENTS_ANCHOR: &str = "contents";

/// Lower-case, drop punctuation, join words with `-`.
///
/// Letters, digits, `_` and `-` survive; anything else is removed. A title
/// with nothing left becomes `section`.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Hands out anchors that are unique within one document.
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    used: HashSet<String>,
}

impl Default for AnchorRegistry {
    fn default() -> Self {
        Self::with_reserved([CONTENTS_ANCHOR.to_string()])
    }
}

impl AnchorRegistry {
    /// A registry where `reserved` slugs are already taken.
    pub fn with_reserved(reserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            used: reserved.into_iter().collect(),
        }
    }

    /// Slug for `title`, suffixed `-1`, `-2`, … if already taken.
    pub fn claim(&mut self, title: &str) -> String {
        let base = slugify(title);
        let mut anchor = base.clone();
        let mut n = 1;
        while self.used.contains(&anchor) {
            anchor = format!("{}-{}", base, n);
            n += 1;
        }
        self.used.insert(anchor.clone());
        anchor
    }
}

/// Group classified lines into sections and build the table of contents.
pub fn assemble(
    classified: Vec<ClassifiedLine>,
    title: impl Into<String>,
    detection: DetectionReport,
) -> Document {
    let title = title.into();
    let mut anchors =
        AnchorRegistry::with_reserved([CONTENTS_ANCHOR.to_string(), slugify(&title)]);
    let mut toc = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut current = Section {
        heading: None,
        body: Vec::new(),
    };

    for ClassifiedLine { line, class, .. } in classified {
        match class {
            Classification::Heading { level } => {
                if current.heading.is_some() || !current.body.is_empty() {
                    sections.push(current);
                }
                let anchor = anchors.claim(&line.text);
                toc.push(TocEntry {
                    title: line.text.clone(),
                    anchor: anchor.clone(),
                    level,
                });
                current = Section {
                    heading: Some(Heading {
                        title: line.text,
                        anchor,
                        level,
                        page: line.page,
                    }),
                    body: Vec::new(),
                };
            }
            Classification::Body => current.body.push(line),
        }
    }
    if current.heading.is_some() || !current.body.is_empty() {
        sections.push(current);
    }

    debug!("Assembled {} sections, {} TOC entries", sections.len(), toc.len());
    Document {
        title,
        toc,
        sections,
        detection,
    }
}

/// Serialise a document to Markdown.
///
/// Blocks are separated by exactly one blank line and the result ends with a
/// single newline.
pub fn render_markdown(
    document: &Document,
    layout: &LayoutConfig,
    warnings: &[ConversionWarning],
) -> String {
    let mut blocks: Vec<String> = Vec::new();

    blocks.push(format!("# {}", single_line(&document.title)));
    blocks.push("## Contents".to_string());
    if document.toc.is_empty() {
        blocks.push("_No headings detected._".to_string());
    } else {
        blocks.push(render_toc(&document.toc));
    }
    for warning in warnings {
        blocks.push(format!("> **Note:** {}", warning));
    }
    blocks.push("---".to_string());

    for section in &document.sections {
        match &section.heading {
            Some(heading) => {
                let hashes = "#".repeat(heading.level.clamp(2, 4) as usize);
                blocks.push(format!("{} {}", hashes, heading.title));
                blocks.push(render_body(&section.body));
                if layout.back_to_top {
                    blocks.push(format!("[Back to top](#{})", CONTENTS_ANCHOR));
                }
                if layout.section_dividers {
                    blocks.push("---".to_string());
                }
            }
            None => blocks.push(render_body(&section.body)),
        }
    }

    // Sections without body text leave empty blocks behind.
    let mut markdown = blocks
        .iter()
        .filter(|b| !b.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n");
    markdown.push('\n');
    markdown
}

fn render_toc(toc: &[TocEntry]) -> String {
    toc.iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.level.saturating_sub(2) as usize);
            format!(
                "{}- [{}](#{})",
                indent,
                escape_link_text(&entry.title),
                entry.anchor
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Body lines, one per row; a blank line in the source starts a new
/// paragraph.
fn render_body(lines: &[Line]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push_str(if line.blank_before { "\n\n" } else { "\n" });
        }
        out.push_str(&escape_line_start(&line.text));
    }
    out
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

static RE_ORDERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,9})[.)](?:\s|$)").unwrap());

/// Body text must not open a block of its own: no headings, rules or
/// setext underlines, lists, quotes or code fences.
fn escape_line_start(text: &str) -> String {
    if let Some(caps) = RE_ORDERED_MARKER.captures(text) {
        let digits = caps[1].len();
        return format!("{}\\{}", &text[..digits], &text[digits..]);
    }
    let bullet = text.starts_with(['-', '+', '*'])
        && text[1..].chars().next().map_or(true, char::is_whitespace);
    if bullet
        || is_rule_or_underline(text)
        || text.starts_with(['#', '>'])
        || text.starts_with("```")
        || text.starts_with("~~~")
    {
        format!("\\{}", text)
    } else {
        text.to_string()
    }
}

/// A line made only of one of `-`, `=`, `_`, `*` (spaces allowed), which
/// Markdown reads as a thematic break or a setext heading underline.
fn is_rule_or_underline(text: &str) -> bool {
    let mut marks = text.chars().filter(|c| !c.is_whitespace());
    match marks.next() {
        Some(first) if matches!(first, '-' | '=' | '_' | '*') => marks.all(|c| c == first),
        _ => false,
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionMode;
    use crate::output::{DetectionOutcome, Signal};

    fn report() -> DetectionReport {
        DetectionReport {
            outcome: DetectionOutcome::Conjunction {
                mode: DetectionMode::Standard,
                min_signals: 2,
            },
            lines: 0,
            headings: 0,
            conjunction_headings: 0,
            heading_ratio: 0.0,
            low_confidence: false,
        }
    }

    fn heading(text: &str, level: u8) -> ClassifiedLine {
        ClassifiedLine {
            line: Line::new(text, 1, 0),
            class: Classification::Heading { level },
            signals: vec![Signal::Pattern, Signal::BlankLines],
        }
    }

    fn body(text: &str) -> ClassifiedLine {
        ClassifiedLine {
            line: Line::new(text, 1, 0),
            class: Classification::Body,
            signals: vec![],
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("1.2 Scope & Limits"), "12-scope-limits");
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("snake_case-name"), "snake_case-name");
        assert_eq!(slugify("Über Größe"), "über-größe");
        assert_eq!(slugify("???"), "section");
    }

    #[test]
    fn test_anchor_registry_suffixes_duplicates() {
        let mut anchors = AnchorRegistry::default();
        assert_eq!(anchors.claim("Summary"), "summary");
        assert_eq!(anchors.claim("Summary"), "summary-1");
        assert_eq!(anchors.claim("summary!"), "summary-2");
        assert_eq!(anchors.claim("Summary 1"), "summary-1-1");
        assert_eq!(anchors.claim("Contents"), "contents-1");
        assert_eq!(anchors.claim("!!"), "section");
        assert_eq!(anchors.claim("--"), "--");
    }

    #[test]
    fn test_preamble_and_sections() {
        let doc = assemble(
            vec![
                body("Intro text"),
                heading("First", 2),
                body("a"),
                heading("Second", 3),
                body("b"),
                body("c"),
            ],
            "Doc",
            report(),
        );
        assert_eq!(doc.sections.len(), 3);
        assert!(doc.sections[0].heading.is_none());
        assert_eq!(doc.sections[0].body[0].text, "Intro text");
        assert_eq!(doc.sections[2].body.len(), 2);
        let titles: Vec<&str> = doc.toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(doc.lines().collect::<Vec<_>>(), vec!["Intro text", "First", "a", "Second", "b", "c"]);
    }

    #[test]
    fn test_every_toc_anchor_resolves_once() {
        let titles = ["Overview", "Overview", "Details", "Overview", "Contents", "?"];
        let classified: Vec<ClassifiedLine> = titles
            .iter()
            .flat_map(|t| [heading(t, 2), body("text")])
            .collect();
        let doc = assemble(classified, "Doc", report());
        let md = render_markdown(&doc, &LayoutConfig::default(), &[]);

        assert_eq!(doc.toc.len(), titles.len());
        let anchors: HashSet<&str> = doc.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors.len(), titles.len());
        assert!(!anchors.contains(CONTENTS_ANCHOR));

        for (entry, section) in doc.toc.iter().zip(doc.sections.iter()) {
            let h = section.heading.as_ref().unwrap();
            assert_eq!(h.anchor, entry.anchor);
            assert!(md.contains(&format!("](#{})", entry.anchor)));
        }
    }

    #[test]
    fn test_render_layout() {
        let doc = assemble(
            vec![
                body("Preface"),
                heading("1 Introduction", 2),
                body("First line"),
                ClassifiedLine {
                    line: Line::new("New paragraph", 1, 3).with_blank_around(true, false),
                    class: Classification::Body,
                    signals: vec![],
                },
                heading("1.1 Background", 3),
                body("# not a heading"),
            ],
            "Lecture Notes",
            report(),
        );
        let md = render_markdown(&doc, &LayoutConfig::default(), &[]);
        let expected = "\
# Lecture Notes

## Contents

- [1 Introduction](#1-introduction)
  - [1.1 Background](#11-background)

---

Preface

## 1 Introduction

First line

New paragraph

[Back to top](#contents)

---

### 1.1 Background

\\# not a heading

[Back to top](#contents)

---
";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_render_toggles_and_note() {
        let doc = assemble(vec![heading("Only", 2), body("x")], "T", report());
        let layout = LayoutConfig {
            back_to_top: false,
            section_dividers: false,
        };
        let warning = ConversionWarning::LowConfidence {
            headings: 40,
            lines: 100,
            percent: 40.0,
            limit_percent: 30.0,
        };
        let md = render_markdown(&doc, &layout, &[warning]);
        assert!(!md.contains("Back to top"));
        assert_eq!(md.matches("---").count(), 1);
        assert!(md.contains("> **Note:** Low confidence"));
        assert!(md.ends_with("x\n"));
    }

    #[test]
    fn test_no_headings() {
        let doc = assemble(vec![body("just text")], "T", report());
        let md = render_markdown(&doc, &LayoutConfig::default(), &[]);
        assert!(md.contains("_No headings detected._"));
        assert!(md.ends_with("just text\n"));
        assert!(!md.contains("\n\n\n"));
    }

    #[test]
    fn test_title_slug_is_reserved() {
        let doc = assemble(
            vec![heading("Overview", 2), body("x"), heading("Contents", 2)],
            "Overview",
            report(),
        );
        let anchors: Vec<&str> = doc.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["overview-1", "contents-1"]);

        let md = render_markdown(&doc, &LayoutConfig::default(), &[]);
        assert!(md.starts_with("# Overview\n"));
        assert!(md.contains("- [Overview](#overview-1)"));
    }

    #[test]
    fn test_body_lines_cannot_open_blocks() {
        let cases = [
            ("--------", "\\--------"),
            ("===", "\\==="),
            ("-", "\\-"),
            ("___", "\\___"),
            ("***", "\\***"),
            ("* * *", "\\* * *"),
            ("- first item", "\\- first item"),
            ("+ second item", "\\+ second item"),
            ("* third item", "\\* third item"),
            ("> quoted", "\\> quoted"),
            ("# hash", "\\# hash"),
            ("1. Preheat the oven", "1\\. Preheat the oven"),
            ("12) Stir", "12\\) Stir"),
            ("3.", "3\\."),
            ("```rust", "\\```rust"),
            ("~~~", "\\~~~"),
        ];
        for (line, escaped) in cases {
            assert_eq!(escape_line_start(line), escaped, "{line:?}");
        }

        for plain in ["-5 degrees", "*emphasis* here", "1.5 metres", "2023 was long", "a = b"] {
            assert_eq!(escape_line_start(plain), plain);
        }
    }

    #[test]
    fn test_underline_in_body_stays_text() {
        let doc = assemble(
            vec![
                heading("1 Intro", 2),
                body("This course covers the fundamentals in depth."),
                body("--------"),
                body("We will start next week."),
            ],
            "T",
            report(),
        );
        let md = render_markdown(&doc, &LayoutConfig::default(), &[]);
        assert!(md.contains("in depth.\n\\--------\nWe will"));
    }

    #[test]
    fn test_link_text_is_escaped() {
        let doc = assemble(vec![heading("Array [i] access", 2)], "T", report());
        let md = render_markdown(&doc, &LayoutConfig::default(), &[]);
        assert!(md.contains("- [Array \\[i\\] access](#array-i-access)"));
    }
}
