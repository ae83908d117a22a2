//! PSD Font Finder Library
//!
//! Finds the fonts used by text layers in Photoshop documents.
//! This library provides functionality to:
//! - Enumerate PSD/PSB files under a directory (optionally recursive)
//! - Read the layer tree of PSD and PSB files, including nested groups
//! - Resolve the font of every style run in a text layer
//! - Collect font names with or without deduplication
//! - Write the result as plain text or JSON
//!
//! # Example
//!
//! ```no_run
//! use psd_font_finder::finder::{find_fonts_in_files, FinderOptions};
//! use std::path::PathBuf;
//!
//! let options = FinderOptions {
//!     root_dir: PathBuf::from("designs"),
//!     output_file: PathBuf::from("found_fonts.txt"),
//!     recursive: true,
//!     sort_paths: true,
//!     ..FinderOptions::default()
//! };
//!
//! find_fonts_in_files(&options).expect("Failed to find fonts");
//! ```

pub mod error;
pub mod psd;
pub mod scan;
pub mod collect;
pub mod output;
pub mod finder;

// Re-export commonly used items
pub use error::{Error, Result};
pub use finder::{find_fonts, find_fonts_in_files, FinderOptions, RunSummary};
