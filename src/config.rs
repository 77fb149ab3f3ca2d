//! Configuration for the `tiff-tags` command-line tool.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `TIFF_TAGS_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use tiff_tag_codec::config::{Cli, Command};
//!
//! // Parse from command line and environment
//! let cli = Cli::parse();
//!
//! match cli.into_command() {
//!     Command::Dump(config) => println!("Dumping {}", config.path.display()),
//!     Command::Check(config) => println!("Checking {}", config.path.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `TIFF_TAGS_FORMAT` - Dump output format, `text` or `json` (default: text)
//! - `TIFF_TAGS_MAX_VALUES` - Values listed per tag (default: 8)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// =============================================================================
// Default Values
// =============================================================================

/// Default number of values listed per tag.
pub const DEFAULT_MAX_VALUES: usize = 8;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tiff-tags - Inspect and check the directories of TIFF and BigTIFF files.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiff-tags")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the parsed arguments and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every directory and tag of a file.
    Dump(DumpConfig),

    /// Read every directory and report entries that fail to decode.
    Check(CheckConfig),
}

/// Output format of the dump command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable listing
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Arguments of the dump command.
#[derive(Args, Debug, Clone)]
pub struct DumpConfig {
    /// TIFF or BigTIFF file to read.
    pub path: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "TIFF_TAGS_FORMAT")]
    pub format: OutputFormat,

    /// Maximum number of values listed per tag.
    #[arg(long, default_value_t = DEFAULT_MAX_VALUES, env = "TIFF_TAGS_MAX_VALUES")]
    pub max_values: usize,

    /// Also list the free blocks of the file.
    #[arg(long, default_value_t = false)]
    pub free_blocks: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl DumpConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_values == 0 {
            return Err("max_values must be greater than 0".to_string());
        }
        if self.path.as_os_str().is_empty() {
            return Err("A file path is required".to_string());
        }
        Ok(())
    }
}

/// Arguments of the check command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// TIFF or BigTIFF file to check.
    pub path: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
