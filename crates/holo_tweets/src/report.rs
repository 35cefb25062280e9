//! Line-oriented report files.
//!
//! A report is truncated on open and written one entry per line in the order
//! given. A failure mid-write leaves a partial file behind.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::error::ReportError;

/// One line of a report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportLine {
    /// Rendered as `key: value`.
    Pair(String, String),
    Plain(String),
}

impl ReportLine {
    pub fn pair(key: impl Into<String>, value: impl fmt::Display) -> Self {
        ReportLine::Pair(key.into(), value.to_string())
    }

    pub fn plain(line: impl Into<String>) -> Self {
        ReportLine::Plain(line.into())
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportLine::Pair(key, value) => write!(f, "{key}: {value}"),
            ReportLine::Plain(line) => f.write_str(line),
        }
    }
}

/// Writes reports into one directory.
#[derive(Clone, Debug)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create or truncate `<dir>/<name>` and write `lines` in order. Returns
    /// the path and the number of lines written.
    pub fn write<I>(&self, name: &str, lines: I) -> Result<(PathBuf, usize), ReportError>
    where
        I: IntoIterator<Item = ReportLine>,
    {
        let path = self.dir.join(name);
        let fail = |source| ReportError {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(fail)?;
        let mut out = BufWriter::new(File::create(&path).map_err(fail)?);
        let mut written = 0;
        for line in lines {
            writeln!(out, "{line}").map_err(fail)?;
            written += 1;
        }
        out.flush().map_err(fail)?;
        tracing::debug!(path = %path.display(), lines = written, "report written");
        Ok((path, written))
    }
}
