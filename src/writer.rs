//! Output file naming and no-clobber writes.
//!
//! Dated output is named `<base> (<letter>_<Mon>_<DD>).md`. The letter starts
//! at `a` and advances past every name that already exists. Content is
//! written to a temporary file in the target directory and then persisted
//! with no-clobber semantics, so a file that appears between the existence
//! check and the rename is never overwritten.

use crate::error::Pdf2TocError;
use chrono::NaiveDate;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Where the rendered Markdown goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A dated, letter-suffixed file inside `dir`.
    Dated { dir: PathBuf, date: NaiveDate },
    /// An explicit path, refused if it already exists.
    File(PathBuf),
}

impl OutputTarget {
    /// Write `markdown` and return the path actually written.
    pub fn write(&self, base: &str, markdown: &str) -> Result<PathBuf, Pdf2TocError> {
        match self {
            OutputTarget::Dated { dir, date } => write_dated(dir, base, *date, markdown),
            OutputTarget::File(path) => write_new_file(path, markdown),
        }
    }
}

/// `%b_%d`, e.g. `May_23`.
pub fn date_tag(date: NaiveDate) -> String {
    date.format("%b_%d").to_string()
}

/// `report (a_May_23).md`
pub fn output_file_name(base: &str, letter: char, date: NaiveDate) -> String {
    format!("{} ({}_{}).md", base, letter, date_tag(date))
}

/// Write to the first free `<base> (<letter>_<date>).md` in `dir`.
pub fn write_dated(
    dir: &Path,
    base: &str,
    date: NaiveDate,
    markdown: &str,
) -> Result<PathBuf, Pdf2TocError> {
    if !dir.is_dir() {
        return Err(Pdf2TocError::OutputDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let mut tmp = staged(dir, markdown)?;
    for letter in 'a'..='z' {
        let target = dir.join(output_file_name(base, letter, date));
        match tmp.persist_noclobber(&target) {
            Ok(_) => {
                info!("Wrote {}", target.display());
                return Ok(target);
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next letter", target.display());
                tmp = e.file;
            }
            Err(e) => {
                return Err(Pdf2TocError::OutputWriteFailed {
                    path: target,
                    source: e.error,
                })
            }
        }
    }

    Err(Pdf2TocError::SuffixSpaceExhausted {
        dir: dir.to_path_buf(),
        base: base.to_string(),
        date: date_tag(date),
    })
}

/// Write to `path`, failing with [`Pdf2TocError::OutputExists`] rather than
/// replacing an existing file.
pub fn write_new_file(path: &Path, markdown: &str) -> Result<PathBuf, Pdf2TocError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(Pdf2TocError::OutputDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let tmp = staged(dir, markdown)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => {
            info!("Wrote {}", path.display());
            Ok(path.to_path_buf())
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Err(Pdf2TocError::OutputExists {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(Pdf2TocError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e.error,
        }),
    }
}

/// Markdown written and flushed to a temp file beside the destination.
fn staged(dir: &Path, markdown: &str) -> Result<NamedTempFile, Pdf2TocError> {
    let failed = |source| Pdf2TocError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(failed)?;
    tmp.write_all(markdown.as_bytes()).map_err(failed)?;
    tmp.flush().map_err(failed)?;
    Ok(tmp)
}
