//! PSD Font Finder CLI tool
//!
//! A command-line tool for listing the fonts used in PSD/PSB files under a directory.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use psd_font_finder::finder::{find_fonts_in_files, FinderOptions};
use psd_font_finder::output::{OutputFormat, DEFAULT_OUTPUT_FILE};

/// PSD Font Finder - Find fonts used in PSD files under a directory
#[derive(Parser)]
#[command(name = "psd-font-finder")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # List fonts used directly in a folder
    psd-font-finder --root-dir ./artwork

    # Walk all subfolders in a stable order and write JSON
    psd-font-finder --root-dir ./artwork --recursive --sort-paths --output-file fonts.json

    # Add newly found fonts to an existing list
    psd-font-finder --root-dir ./new-batch --output-file found_fonts.txt --append")]
struct Cli {
    /// Root directory containing PSD files
    #[arg(long)]
    root_dir: PathBuf,

    /// File to save found fonts (.json writes a JSON array)
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    output_file: PathBuf,

    /// Search subdirectories recursively
    #[arg(long)]
    recursive: bool,

    /// Process files in sorted path order
    #[arg(long)]
    sort_paths: bool,

    /// Allow the same font to be saved multiple times
    #[arg(long)]
    allow_duplicates: bool,

    /// Keep fonts already listed in the output file and only add new ones
    #[arg(long)]
    append: bool,

    /// Output format (text or json); inferred from the output file extension by default
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Show per-file details
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    init_logging(&cli);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber; RUST_LOG takes precedence over the flags
fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let options = FinderOptions {
        root_dir: cli.root_dir,
        output_file: cli.output_file,
        recursive: cli.recursive,
        sort_paths: cli.sort_paths,
        allow_duplicates: cli.allow_duplicates,
        append: cli.append,
        format: cli.format,
    };

    let summary = find_fonts_in_files(&options)
        .with_context(|| format!("Failed to find fonts under {}", options.root_dir.display()))?;

    if !summary.failures.is_empty() {
        eprintln!(
            "Skipped {} of {} file(s) that could not be read",
            summary.failures.len(),
            summary.files_processed
        );
    }

    eprintln!(
        "Wrote {} font(s) to {}",
        summary.fonts_written,
        summary.output_file.display()
    );

    if summary.discovered.is_empty() {
        println!("\nNo fonts found.");
        return Ok(());
    }

    println!("\nFonts found:");
    for font in &summary.discovered {
        println!("{}", font);
    }

    Ok(())
}
