//! Writing discovered font names to disk
//!
//! Two formats are supported: plain text with one name per line, and a JSON
//! array of `{"name": ...}` rows for tools that want structured input.

use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use crate::error::{Error, Result};

/// Default destination when none is given
pub const DEFAULT_OUTPUT_FILE: &str = "found_fonts.txt";

/// Output file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One font name per line
    #[default]
    Text,
    /// JSON array of `{"name": ...}` rows
    Json,
}

impl OutputFormat {
    /// Pick the format from the destination extension (`.json` means JSON)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected text or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// One row of the JSON output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRecord {
    pub name: String,
}

/// Write font names to `path`, replacing any existing file
///
/// Content is written to a temporary file next to the destination and moved
/// into place only once complete, so a failed write never leaves a partial
/// file behind and never touches an existing destination.
pub fn write_fonts(path: &Path, fonts: &[String], format: OutputFormat) -> Result<()> {
    let write_error = |source: io::Error| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        match format {
            OutputFormat::Text => {
                for name in fonts {
                    writeln!(writer, "{}", name).map_err(write_error)?;
                }
            }
            OutputFormat::Json => {
                let rows: Vec<FontRecord> = fonts
                    .iter()
                    .map(|name| FontRecord { name: name.clone() })
                    .collect();
                serde_json::to_writer_pretty(&mut writer, &rows)
                    .map_err(|e| write_error(e.into()))?;
                writeln!(writer).map_err(write_error)?;
            }
        }
        writer.flush().map_err(write_error)?;
    }

    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Read names written by an earlier run
///
/// A missing file yields an empty list. Blank lines in text files are ignored.
pub fn read_existing_fonts(path: &Path, format: OutputFormat) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let read_error = |reason: String| Error::OutputRead {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;

    match format {
        OutputFormat::Text => Ok(content
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        OutputFormat::Json => {
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            let rows: Vec<FontRecord> =
                serde_json::from_str(&content).map_err(|e| read_error(e.to_string()))?;
            Ok(rows.into_iter().map(|row| row.name).collect())
        }
    }
}
