//! Font collection across many documents

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use crate::psd::DocumentParser;

/// Ordered collection of discovered font names
///
/// With duplicates disabled a name is stored at most once, in order of first
/// discovery. With duplicates allowed every discovery is stored. Names are
/// compared exactly (case-sensitive, no trimming).
#[derive(Debug, Clone, Default)]
pub struct FoundFonts {
    names: Vec<String>,
    seen: HashSet<String>,
    allow_duplicates: bool,
}

impl FoundFonts {
    pub fn new(allow_duplicates: bool) -> Self {
        Self {
            names: Vec::new(),
            seen: HashSet::new(),
            allow_duplicates,
        }
    }

    /// Start from names that were already written by an earlier run
    ///
    /// Existing entries are kept as they are, including any repeats; only new
    /// names are deduplicated against them.
    pub fn with_existing(allow_duplicates: bool, existing: impl IntoIterator<Item = String>) -> Self {
        let mut fonts = Self::new(allow_duplicates);
        for name in existing {
            fonts.seen.insert(name.clone());
            fonts.names.push(name);
        }
        fonts
    }

    /// Record one discovery of `name`; returns true if it was appended
    pub fn push(&mut self, name: &str) -> bool {
        if !self.allow_duplicates && self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }
}

/// A document that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a collection pass
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    /// Documents attempted, including failures
    pub files_processed: usize,
    /// Documents skipped because they could not be parsed
    pub failures: Vec<FileFailure>,
    /// Font names seen in this pass, sorted and unique
    pub discovered: BTreeSet<String>,
}

/// Parse every path in order and add the fonts of its text layers to `fonts`
///
/// A document that fails to parse is logged and recorded in the report and
/// contributes no fonts; the remaining paths are still processed. Fonts are
/// added in path order, then layer order, then style-run order.
pub fn collect_fonts<P>(paths: &[PathBuf], parser: &P, fonts: &mut FoundFonts) -> CollectReport
where
    P: DocumentParser + ?Sized,
{
    let mut report = CollectReport::default();
    let total = paths.len();

    for path in paths {
        report.files_processed += 1;
        info!("Processing PSD {} of {}: {}", report.files_processed, total, path.display());

        let document = match parser.parse(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Error processing PSD {}: {}", path.display(), e);
                report.failures.push(FileFailure { path: path.clone(), message: e.to_string() });
                continue;
            }
        };

        let mut count = 0;
        for font in document.fonts() {
            count += 1;
            fonts.push(font);
            if !report.discovered.contains(font) {
                report.discovered.insert(font.to_string());
            }
        }
        debug!("{} font reference(s) in {}", count, path.display());
    }

    report
}
