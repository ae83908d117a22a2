//! One complete font-finding run: scan, collect, write

use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;
use crate::collect::{collect_fonts, FileFailure, FoundFonts};
use crate::error::Result;
use crate::output::{read_existing_fonts, write_fonts, OutputFormat, DEFAULT_OUTPUT_FILE};
use crate::psd::{DocumentParser, PsdReader};
use crate::scan::{find_psd_files, sort_paths};

/// Options for a font-finding run
#[derive(Debug, Clone)]
pub struct FinderOptions {
    /// Directory to scan
    pub root_dir: PathBuf,
    /// Destination for the discovered font names
    pub output_file: PathBuf,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Process files in ascending path order
    pub sort_paths: bool,
    /// Record every discovery instead of unique names
    pub allow_duplicates: bool,
    /// Keep the names already in `output_file` and add new ones after them
    pub append: bool,
    /// Output layout; inferred from the `output_file` extension when `None`
    pub format: Option<OutputFormat>,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            recursive: false,
            sort_paths: false,
            allow_duplicates: false,
            append: false,
            format: None,
        }
    }
}

impl FinderOptions {
    /// Format actually used for reading and writing the output file
    pub fn output_format(&self) -> OutputFormat {
        self.format
            .unwrap_or_else(|| OutputFormat::from_path(&self.output_file))
    }
}

/// What a run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Documents attempted, including failures
    pub files_processed: usize,
    /// Documents skipped because they could not be parsed
    pub failures: Vec<FileFailure>,
    /// Unique font names found in this run, sorted
    pub discovered: BTreeSet<String>,
    /// Entries in the written output file
    pub fonts_written: usize,
    pub output_file: PathBuf,
}

/// Scan `options.root_dir`, collect fonts through `parser`, write the output
///
/// # Errors
///
/// Fatal conditions only: a missing root directory (checked before the output
/// file is touched), an unreadable existing output in append mode, or an
/// output file that cannot be written. Documents that fail to parse are
/// reported in [`RunSummary::failures`] instead.
///
/// # Example
///
/// ```no_run
/// use psd_font_finder::finder::{find_fonts, FinderOptions};
/// use psd_font_finder::psd::PsdReader;
/// use std::path::PathBuf;
///
/// let options = FinderOptions {
///     root_dir: PathBuf::from("artwork"),
///     recursive: true,
///     ..FinderOptions::default()
/// };
///
/// let summary = find_fonts(&options, &PsdReader).expect("Failed to scan");
/// println!("{} fonts written", summary.fonts_written);
/// ```
pub fn find_fonts<P: DocumentParser + ?Sized>(options: &FinderOptions, parser: &P) -> Result<RunSummary> {
    let files = find_psd_files(&options.root_dir, options.recursive)?;
    let format = options.output_format();

    let mut fonts = if options.append {
        let existing = read_existing_fonts(&options.output_file, format)?;
        info!("Loaded {} existing font(s) from {}", existing.len(), options.output_file.display());
        FoundFonts::with_existing(options.allow_duplicates, existing)
    } else {
        FoundFonts::new(options.allow_duplicates)
    };

    let mut paths: Vec<PathBuf> = files.collect();
    if options.sort_paths {
        sort_paths(&mut paths);
    }
    let report = collect_fonts(&paths, parser, &mut fonts);

    write_fonts(&options.output_file, fonts.as_slice(), format)?;

    info!(
        "Scan complete: {} file(s) processed, {} failed, {} font(s) written to {}",
        report.files_processed,
        report.failures.len(),
        fonts.len(),
        options.output_file.display()
    );

    Ok(RunSummary {
        files_processed: report.files_processed,
        failures: report.failures,
        discovered: report.discovered,
        fonts_written: fonts.len(),
        output_file: options.output_file.clone(),
    })
}

/// [`find_fonts`] with the on-disk PSD/PSB reader
pub fn find_fonts_in_files(options: &FinderOptions) -> Result<RunSummary> {
    find_fonts(options, &PsdReader)
}
