//! Input validation: turn a user-supplied path into a checked local PDF.
//!
//! pdfium reports unreadable or non-PDF files with opaque load errors, so the
//! path is checked first: it must exist, be readable, and start with the
//! `%PDF` magic bytes.

use crate::error::Pdf2TocError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A local PDF that passed the pre-flight checks.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    path: PathBuf,
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem used for the document title fallback and output naming.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

/// The file name without directory or extension, or `document` when the path
/// has none.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Validate a local file path: existence, read permission and PDF magic bytes.
pub fn resolve_input(input: impl AsRef<Path>) -> Result<ResolvedInput, Pdf2TocError> {
    let path = input.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(Pdf2TocError::FileNotFound { path });
    }

    let mut file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(Pdf2TocError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2TocError::FileNotFound { path }),
    };

    let mut magic = [0u8; 4];
    let read = read_prefix(&mut file, &mut magic);
    if read < magic.len() || &magic != b"%PDF" {
        return Err(Pdf2TocError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput { path })
}

/// Read up to `buf.len()` bytes, tolerating short files.
fn read_prefix(file: &mut File, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    filled
}
