//! tiff-tags - Inspect the directories of TIFF and BigTIFF files.
//!
//! This binary lists directories and tags (`dump`) and reports entries that
//! fail to decode (`check`).

use std::fs::File;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiff_tag_codec::{
    config::{CheckConfig, Cli, Command, DumpConfig, OutputFormat},
    dump_stream, read_directories, TagInfo, TagStream, TiffStream,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Dump(config) => run_dump(config),
        Command::Check(config) => run_check(config),
    }
}

/// Initialize the tracing subscriber.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiff_tag_codec=debug,tiff_tags=debug"
    } else {
        "tiff_tag_codec=warn,tiff_tags=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Open a file as a stream.
fn open_stream(path: &std::path::Path) -> Result<TiffStream<File>, String> {
    let file = File::open(path).map_err(|e| format!("Cannot open {}: {}", path.display(), e))?;
    TiffStream::new(file, path.display().to_string())
        .map_err(|e| format!("Cannot read {}: {}", path.display(), e))
}

// =============================================================================
// Dump Command
// =============================================================================

fn run_dump(config: DumpConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mut stream = match open_stream(&config.path) {
        Ok(stream) => stream,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match dump_stream(&mut stream, &TagInfo::baseline(), config.max_values) {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to read {}: {}", config.path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    debug!(directories = report.directories.len(), "Dump complete");

    match config.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Text => {
            println!("{}", report);
            if config.free_blocks {
                println!();
                println!("Free blocks:");
                if report.free_blocks.is_empty() {
                    println!("  (none)");
                }
                for block in &report.free_blocks {
                    println!("  offset {:>10}  size {:>10}", block.offset, block.size);
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("TIFF Directory Check");
    println!("════════════════════");
    println!();

    let mut stream = match open_stream(&config.path) {
        Ok(stream) => {
            println!("✓ File: {} ({} bytes)", stream.identifier(), stream.size());
            stream
        }
        Err(e) => {
            println!("✗ File: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (header, mut directories) = match read_directories(&mut stream, &TagInfo::baseline()) {
        Ok(result) => result,
        Err(e) => {
            println!("✗ Structure: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "✓ Header: {:?}, {}",
        header.byte_order,
        if header.is_bigtiff { "BigTIFF" } else { "TIFF" }
    );

    let free_blocks = directories
        .first_mut()
        .map(|directory| directory.free_blocks())
        .unwrap_or_default();
    let stream = stream.with_free_blocks(free_blocks);

    let mut problems = 0;
    for (index, directory) in directories.iter().enumerate() {
        let skipped = directory.skipped_entries();
        if skipped == 0 {
            println!(
                "✓ Directory {} at offset {}: {} entries",
                index,
                directory.offset(),
                directory.len()
            );
        } else {
            println!(
                "✗ Directory {} at offset {}: {} entries, {} unreadable",
                index,
                directory.offset(),
                directory.len(),
                skipped
            );
            problems += skipped;
        }

        for codec in directory.iter() {
            let Some(store) = codec.store() else {
                continue;
            };
            if !store.is_stored_inline()
                && stream.overlaps_free_blocks(store.offset(), store.size_on_disk())
            {
                println!(
                    "  ✗ {} data at offset {} lies in a free block",
                    codec.name(),
                    store.offset()
                );
                problems += 1;
            }
        }
    }

    println!();
    println!("BytesTotal in Freeblocks: {}", stream.free_bytes());
    println!("════════════════════");
    if problems == 0 {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ {} problem(s) found", problems);
        ExitCode::FAILURE
    }
}
