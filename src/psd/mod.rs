//! PSD/PSB document access
//!
//! Callers go through the [`DocumentParser`] trait, which turns a path into a
//! [`PsdDocument`] or an error. [`PsdReader`] is the implementation used by
//! the command-line tool; tests substitute their own.

pub mod document;
pub mod engine;
pub mod reader;

use std::path::Path;
use crate::error::Result;

// Re-export commonly used items
pub use document::{Descendants, Layer, LayerKind, PsdDocument, PsdVersion, StyleRun, TextLayer};
pub use reader::{read_document, read_psd};

/// Turns a file path into a layer document
pub trait DocumentParser {
    /// Parse the document at `path`
    ///
    /// Any failure (I/O, unsupported version, malformed data) is returned as an
    /// error; callers decide whether it is fatal.
    fn parse(&self, path: &Path) -> Result<PsdDocument>;
}

/// Reads PSD and PSB files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct PsdReader;

impl DocumentParser for PsdReader {
    fn parse(&self, path: &Path) -> Result<PsdDocument> {
        read_psd(path)
    }
}

impl<P: DocumentParser + ?Sized> DocumentParser for &P {
    fn parse(&self, path: &Path) -> Result<PsdDocument> {
        (**self).parse(path)
    }
}
