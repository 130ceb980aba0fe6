//! Text extraction: read per-page text lines through pdfium.
//!
//! pdfium is dynamically linked. [`create_pdfium`] looks for the library in
//! `PDFIUM_LIB_PATH`, the working directory, then the system library path.
//!
//! pdfium's plain-text dump carries no vertical gaps or left offsets, so lines
//! are rebuilt from the page's text segments instead: segments sharing a
//! baseline form a [`TextRow`], and [`lines_from_rows`] turns the rows'
//! spacing and left edges into the blank-line context and indentation the
//! detector needs. [`split_page_text`] does the same for plain text that
//! already has blank lines and leading spaces. In experimental mode the
//! page's text objects are also read so every line can carry its dominant
//! font size and bold share.

use crate::config::{ConversionConfig, DetectionMode, PageSelection};
use crate::error::Pdf2TocError;
use crate::output::{DocumentMetadata, Line, LineStyle, Page};
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Pages and metadata read from one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub pages: Vec<Page>,
    pub metadata: DocumentMetadata,
}

/// A run of text sharing one font, as reported by a pdfium text object.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font_size: f32,
    pub bold: bool,
}

/// Text on one visual line of a page, positioned in PDF points.
///
/// `y` grows upwards, as in PDF user space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRow {
    pub text: String,
    /// Left edge of the first segment.
    pub left: f32,
    /// Right edge of the last segment.
    pub right: f32,
    /// Lowest bottom edge on the row.
    pub bottom: f32,
    /// Tallest segment on the row.
    pub height: f32,
}

/// Bind to a pdfium library.
pub fn create_pdfium() -> Result<Pdfium, Pdf2TocError> {
    let from_env = std::env::var("PDFIUM_LIB_PATH").ok().filter(|p| !p.is_empty());

    let bindings = match from_env {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2TocError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Read the selected pages of a PDF into lines, plus its metadata.
///
/// Fails with [`Pdf2TocError::NoTextLayer`] when every selected page is
/// empty, which is what a scanned document without OCR looks like.
pub fn extract_document(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<ExtractedDocument, Pdf2TocError> {
    let pdfium = create_pdfium()?;
    let password = config.password.as_deref();
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password.is_some(), e))?;

    let metadata = read_metadata(&document);
    let total_pages = metadata.page_count;
    info!("PDF loaded: {} pages", total_pages);

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(empty_selection_error(&config.pages, total_pages));
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(page_indices.len());
    }

    let experimental = config.detection.mode == DetectionMode::Experimental;
    let pages = document.pages();
    let mut extracted = Vec::with_capacity(page_indices.len());

    for &idx in &page_indices {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| Pdf2TocError::PageExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let text = page
            .text()
            .map_err(|e| Pdf2TocError::PageExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let rows = collect_rows(&text);
        let mut lines = if rows.is_empty() {
            split_page_text(&text.all(), page_num)
        } else {
            lines_from_rows(&rows, page_num)
        };
        if experimental {
            let runs = collect_text_runs(&page);
            attach_styles(&mut lines, &runs);
        }

        debug!("Page {}: {} lines", page_num, lines.len());
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_extracted(page_num, page_indices.len(), lines.len());
        }

        extracted.push(Page {
            number: page_num,
            lines,
        });
    }

    ensure_text_layer(&extracted, pdf_path)?;

    Ok(ExtractedDocument {
        pages: extracted,
        metadata,
    })
}

/// Read the PDF info dictionary without touching page content.
pub fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2TocError> {
    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password.is_some(), e))?;
    Ok(read_metadata(&document))
}

fn empty_selection_error(selection: &PageSelection, total_pages: usize) -> Pdf2TocError {
    match selection.first_page() {
        Some(page) => Pdf2TocError::PageOutOfRange {
            page,
            total: total_pages,
        },
        None => Pdf2TocError::NoPagesSelected { total: total_pages },
    }
}

fn load_error(pdf_path: &Path, had_password: bool, e: PdfiumError) -> Pdf2TocError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            Pdf2TocError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Pdf2TocError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        Pdf2TocError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail,
        }
    }
}

fn read_metadata(document: &PdfDocument) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

fn collect_text_runs(page: &PdfPage) -> Vec<TextRun> {
    page.objects()
        .iter()
        .filter_map(|object| {
            let text_object = object.as_text_object()?;
            let text = normalise_text(&text_object.text());
            if text.is_empty() {
                return None;
            }
            Some(TextRun {
                text,
                font_size: text_object.scaled_font_size().value,
                bold: is_bold_font(&text_object.font().name()),
            })
        })
        .collect()
}

fn is_bold_font(name: &str) -> bool {
    name.to_lowercase().contains("bold")
}

// ── Page geometry ────────────────────────────────────────────────────────

/// Rows closer than this share of the row height sit on one baseline.
const BASELINE_TOLERANCE: f32 = 0.3;

/// A vertical step this many line pitches wide holds a blank line.
const PARAGRAPH_GAP: f32 = 1.5;

/// Assumed average glyph width as a share of the row height.
const CHAR_WIDTH_RATIO: f32 = 0.5;

fn collect_rows(text: &PdfPageText) -> Vec<TextRow> {
    let mut rows = Vec::new();
    for segment in text.segments().iter() {
        let bounds = segment.bounds();
        push_segment(
            &mut rows,
            &segment.text(),
            bounds.left().value,
            bounds.right().value,
            bounds.bottom().value,
            bounds.top().value,
        );
    }
    rows
}

/// Add a segment in reading order, extending the last row when the
/// segment sits on the same baseline.
pub fn push_segment(
    rows: &mut Vec<TextRow>,
    text: &str,
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
) {
    if text.trim().is_empty() {
        return;
    }
    let height = (top - bottom).abs();

    if let Some(row) = rows.last_mut() {
        let tolerance = BASELINE_TOLERANCE * row.height.max(height);
        if (row.bottom - bottom).abs() <= tolerance && left >= row.left {
            // Glyph boxes of one word touch; a visible gap is a space.
            if left - row.right > 0.2 * row.height.max(height) {
                row.text.push(' ');
            }
            row.text.push_str(text);
            row.right = row.right.max(right);
            row.bottom = row.bottom.min(bottom);
            row.height = row.height.max(height);
            return;
        }
    }

    rows.push(TextRow {
        text: text.to_string(),
        left,
        right,
        bottom,
        height,
    });
}

/// Turn positioned rows into [`Line`]s.
///
/// A step down of more than one and a half line pitches counts as a blank
/// line, as does a jump back up the page (a new column). The pitch is the
/// smallest step at least half a row high, which is the spacing inside a
/// paragraph. Indentation is the distance from the page's leftmost row,
/// in estimated character widths. The top and bottom of the page count as
/// blank neighbours.
pub fn lines_from_rows(rows: &[TextRow], page_num: usize) -> Vec<Line> {
    let rows: Vec<(String, &TextRow)> = rows
        .iter()
        .map(|row| (normalise_text(&row.text), row))
        .filter(|(text, _)| !text.is_empty())
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut heights: Vec<f32> = rows.iter().map(|(_, r)| r.height).collect();
    heights.sort_by(f32::total_cmp);
    let row_height = heights[heights.len() / 2].max(1.0);

    let steps: Vec<f32> = rows
        .windows(2)
        .map(|pair| pair[0].1.bottom - pair[1].1.bottom)
        .collect();
    let pitch = steps
        .iter()
        .copied()
        .filter(|step| *step >= 0.5 * row_height)
        .min_by(f32::total_cmp)
        .unwrap_or(row_height * 1.2);
    let gap_after: Vec<bool> = steps
        .iter()
        .map(|step| *step <= 0.0 || *step > PARAGRAPH_GAP * pitch)
        .collect();

    let margin = rows
        .iter()
        .map(|(_, r)| r.left)
        .min_by(f32::total_cmp)
        .unwrap_or_default();
    let char_width = row_height * CHAR_WIDTH_RATIO;

    rows.into_iter()
        .enumerate()
        .map(|(index, (text, row))| {
            let before = index == 0 || gap_after[index - 1];
            let after = gap_after.get(index).copied().unwrap_or(true);
            let indent = ((row.left - margin) / char_width).round().max(0.0) as usize;
            Line::new(text, page_num, index)
                .with_indent(indent)
                .with_blank_around(before, after)
        })
        .collect()
}

// ── Line splitting ───────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

/// Strip invisible characters, collapse whitespace runs, trim.
pub fn normalise_text(raw: &str) -> String {
    let visible = raw.replace(INVISIBLE, "");
    RE_WHITESPACE.replace_all(visible.trim(), " ").into_owned()
}

/// Leading whitespace width; a tab counts as four columns.
fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Split one page's raw text into non-empty [`Line`]s.
///
/// The top and bottom of the page count as blank neighbours.
pub fn split_page_text(text: &str, page_num: usize) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut blank_pending = true;

    for raw in text.lines() {
        let normalised = normalise_text(raw);
        if normalised.is_empty() {
            blank_pending = true;
            if let Some(last) = lines.last_mut() {
                last.blank_after = true;
            }
            continue;
        }

        let index = lines.len();
        lines.push(
            Line::new(normalised, page_num, index)
                .with_indent(indent_width(raw))
                .with_blank_around(blank_pending, false),
        );
        blank_pending = false;
    }

    if let Some(last) = lines.last_mut() {
        last.blank_after = true;
    }
    lines
}

/// Attribute each line the font size covering most of its characters and
/// the share of its characters set in bold.
///
/// A run belongs to a line when its text occurs inside the line. Single
/// characters are ignored unless they are the whole line; they match
/// everywhere.
pub fn attach_styles(lines: &mut [Line], runs: &[TextRun]) {
    for line in lines.iter_mut() {
        let line_chars = line.text.chars().count();
        let mut size_weights: HashMap<u32, (f32, usize)> = HashMap::new();
        let mut bold_chars = 0usize;
        let mut covered = 0usize;

        for run in runs {
            let run_chars = run.text.chars().count();
            if run_chars < 2 && run.text != line.text {
                continue;
            }
            if !line.text.contains(run.text.as_str()) {
                continue;
            }
            covered += run_chars;
            if run.bold {
                bold_chars += run_chars;
            }
            // Bucket sizes to a tenth of a point.
            let key = (run.font_size * 10.0).round() as u32;
            let entry = size_weights.entry(key).or_insert((run.font_size, 0));
            entry.1 += run_chars;
        }

        if covered == 0 {
            continue;
        }

        let font_size = size_weights
            .values()
            .max_by(|a, b| a.1.cmp(&b.1).then(a.0.total_cmp(&b.0)))
            .map(|(size, _)| *size)
            .unwrap_or_default();
        let bold_fraction = (bold_chars as f32 / line_chars.max(1) as f32).min(1.0);

        line.style = Some(LineStyle {
            font_size,
            bold_fraction,
        });
    }
}

/// Reject documents where no selected page carries any text.
pub fn ensure_text_layer(pages: &[Page], pdf_path: &Path) -> Result<(), Pdf2TocError> {
    if pages.iter().all(Page::is_blank) {
        return Err(Pdf2TocError::NoTextLayer {
            path: pdf_path.to_path_buf(),
            pages: pages.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_text() {
        assert_eq!(normalise_text("  Hello \t  world  "), "Hello world");
        assert_eq!(normalise_text("zero\u{200B}width\u{00AD}"), "zerowidth");
        assert_eq!(normalise_text("   "), "");
    }

    #[test]
    fn test_split_records_blank_context() {
        let text = "Title line\n\n1 Introduction\n\nBody one\nBody two\n";
        let lines = split_page_text(text, 3);

        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Title line", "1 Introduction", "Body one", "Body two"]);

        assert!(lines[0].blank_before, "top of page counts as blank");
        assert!(lines[0].blank_after);
        assert!(lines[1].blank_before && lines[1].blank_after);
        assert!(lines[2].blank_before && !lines[2].blank_after);
        assert!(!lines[3].blank_before && lines[3].blank_after);

        assert!(lines.iter().all(|l| l.page == 3));
        assert_eq!(
            lines.iter().map(|l| l.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn test_split_measures_indent() {
        let lines = split_page_text("body\n    indented\n\ttabbed\r\n", 1);
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[1].indent, 4);
        assert_eq!(lines[2].indent, 4);
        assert_eq!(lines[2].text, "tabbed");
    }

    #[test]
    fn test_split_empty_page() {
        assert!(split_page_text("", 1).is_empty());
        assert!(split_page_text("\n \n\t\n", 1).is_empty());
    }

    #[test]
    fn test_attach_styles_picks_dominant_size() {
        let mut lines = vec![
            Line::new("2 Methods", 1, 0),
            Line::new("We measured the thing carefully", 1, 1),
        ];
        let runs = vec![
            TextRun {
                text: "2 Methods".into(),
                font_size: 16.0,
                bold: true,
            },
            TextRun {
                text: "We measured the thing".into(),
                font_size: 10.0,
                bold: false,
            },
            TextRun {
                text: "carefully".into(),
                font_size: 10.0,
                bold: true,
            },
        ];
        attach_styles(&mut lines, &runs);

        let heading = lines[0].style.unwrap();
        assert_eq!(heading.font_size, 16.0);
        assert!((heading.bold_fraction - 1.0).abs() < 1e-6);

        let body = lines[1].style.unwrap();
        assert_eq!(body.font_size, 10.0);
        assert!(body.bold_fraction < 0.5);
    }

    #[test]
    fn test_attach_styles_leaves_unmatched_lines() {
        let mut lines = vec![Line::new("nothing matches", 1, 0)];
        attach_styles(
            &mut lines,
            &[TextRun {
                text: "x".into(),
                font_size: 30.0,
                bold: true,
            }],
        );
        assert!(lines[0].style.is_none());
    }

    /// Rows laid out like a 14pt-leading page of 11pt text, where every
    /// `None` is a skipped line.
    fn rows(layout: &[(Option<&str>, f32)]) -> Vec<TextRow> {
        let mut rows = Vec::new();
        let mut bottom = 740.0;
        for (text, left) in layout {
            if let Some(text) = text {
                push_segment(&mut rows, text, *left, *left + 200.0, bottom, bottom + 11.0);
            }
            bottom -= 14.0;
        }
        rows
    }

    #[test]
    fn test_rows_gap_becomes_blank_context() {
        let rows = rows(&[
            (Some("Chemistry Lab Manual"), 72.0),
            (None, 0.0),
            (Some("1 Safety"), 72.0),
            (None, 0.0),
            (Some("Wear goggles at all times."), 72.0),
            (Some("Ask the demonstrator first."), 72.0),
            (None, 0.0),
            (Some("Page 1"), 72.0),
        ]);
        let lines = lines_from_rows(&rows, 2);

        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Chemistry Lab Manual",
                "1 Safety",
                "Wear goggles at all times.",
                "Ask the demonstrator first.",
                "Page 1"
            ]
        );
        assert!(lines[1].blank_before && lines[1].blank_after);
        assert!(lines[2].blank_before && !lines[2].blank_after);
        assert!(!lines[3].blank_before && lines[3].blank_after);
        assert!(lines[4].blank_before && lines[4].blank_after);
        assert!(lines.iter().all(|l| l.indent == 0 && l.page == 2));
    }

    #[test]
    fn test_rows_offset_becomes_indent() {
        let rows = rows(&[
            (Some("Body text at the margin"), 72.0),
            (Some("Centred Title"), 200.0),
            (Some("More body text"), 72.5),
        ]);
        let lines = lines_from_rows(&rows, 1);
        assert_eq!(lines[0].indent, 0);
        assert!(lines[1].indent > 20, "indent {}", lines[1].indent);
        assert_eq!(lines[2].indent, 0);
        assert!(!lines[1].blank_before && !lines[1].blank_after);
    }

    #[test]
    fn test_segments_on_one_baseline_join() {
        let mut rows = Vec::new();
        push_segment(&mut rows, "2.1", 72.0, 88.0, 700.0, 711.0);
        push_segment(&mut rows, "Loops", 92.0, 120.0, 699.0, 712.0);
        push_segment(&mut rows, "ing", 120.0, 135.0, 700.0, 711.0);
        push_segment(&mut rows, "   ", 140.0, 150.0, 700.0, 711.0);
        push_segment(&mut rows, "Next line", 72.0, 120.0, 686.0, 697.0);

        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["2.1 Loopsing", "Next line"]);
        assert_eq!(rows[0].bottom, 699.0);
    }

    #[test]
    fn test_column_jump_is_a_break() {
        let mut rows = Vec::new();
        push_segment(&mut rows, "end of left column", 72.0, 250.0, 100.0, 111.0);
        push_segment(&mut rows, "top of right column", 320.0, 500.0, 700.0, 711.0);
        let lines = lines_from_rows(&rows, 1);
        assert!(lines[0].blank_after && lines[1].blank_before);
    }

    #[test]
    fn test_bold_font_names() {
        assert!(is_bold_font("Helvetica-Bold"));
        assert!(is_bold_font("ABCDEF+SourceSansPro-bold"));
        assert!(is_bold_font("TIMES-BOLDITALIC"));
        assert!(!is_bold_font("Helvetica-Oblique"));
    }

    #[test]
    fn test_empty_selection_names_requested_page() {
        let err = empty_selection_error(&PageSelection::Single(9), 4);
        assert!(matches!(err, Pdf2TocError::PageOutOfRange { page: 9, total: 4 }));
        assert_eq!(err.to_string(), "Page 9 is out of range (document has 4 pages)");

        let err = empty_selection_error(&PageSelection::Range(5, 8), 4);
        assert!(matches!(err, Pdf2TocError::PageOutOfRange { page: 5, .. }));

        let err = empty_selection_error(&PageSelection::Set(vec![]), 4);
        assert!(matches!(err, Pdf2TocError::NoPagesSelected { total: 4 }));
    }

    #[test]
    fn test_ensure_text_layer_rejects_scans() {
        let pages = vec![
            Page {
                number: 1,
                lines: vec![],
            },
            Page {
                number: 2,
                lines: vec![],
            },
        ];
        let err = ensure_text_layer(&pages, Path::new("scan.pdf")).unwrap_err();
        assert!(matches!(err, Pdf2TocError::NoTextLayer { pages: 2, .. }));
    }

    #[test]
    fn test_ensure_text_layer_accepts_one_text_page() {
        let pages = vec![
            Page {
                number: 1,
                lines: vec![],
            },
            Page {
                number: 2,
                lines: vec![Line::new("text", 2, 0)],
            },
        ];
        assert!(ensure_text_layer(&pages, Path::new("mixed.pdf")).is_ok());
    }
}
