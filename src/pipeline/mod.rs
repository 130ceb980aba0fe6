//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step, and every
//! stage after extraction works on plain values so it can be tested without
//! a PDF.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ clean ──▶ detect ──▶ assemble
//! (path)    (pdfium)    (boiler-  (heading   (TOC +
//!                        plate)    signals)   Markdown)
//! ```
//!
//! 1. [`input`]    — check the path exists and is a PDF
//! 2. [`extract`]  — per-page text lines with indentation, blank-line context
//!    and, in experimental mode, font attributes
//! 3. [`clean`]    — drop lines recurring on most pages and strip-pattern lines
//! 4. [`detect`]   — label each line Heading or Body from independent signals
//! 5. [`assemble`] — group sections, assign unique anchors, render Markdown

pub mod assemble;
pub mod clean;
pub mod detect;
pub mod extract;
pub mod input;
