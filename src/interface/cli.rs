use clap::{ArgAction, Parser};

use crate::application::{RowFilter, SnapshotOptions};
use crate::domain::{parse_size, ColumnSet, SizeFormat, UnitBase};

/// Block device inventory: identity, usage, health and live throughput.
#[derive(Parser, Debug)]
#[command(name = "statblk", about = "Block device inventory", version)]
pub struct Args {
    /// Regular expressions selecting rows (any one may match)
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Produce JSON output
    #[arg(short, long)]
    pub json: bool,

    /// Print sizes and rates in bytes rather than human-readable units
    #[arg(short, long)]
    pub bytes: bool,

    /// Use powers of 1000 instead of 1024
    #[arg(short = 'H', long)]
    pub si: bool,

    /// Show only formatted filesystems
    #[arg(short = 'F', long)]
    pub formatted_only: bool,

    /// Show only mounted filesystems
    #[arg(short = 'M', long)]
    pub mounted_only: bool,

    /// Show only the best mount for each device
    #[arg(short = 'B', long)]
    pub best_only: bool,

    /// Show only devices with read or write activity
    #[arg(short = 'A', long)]
    pub active_only: bool,

    /// Also list mounts not backed by a block device (tmpfs, overlay, ...)
    #[arg(long)]
    pub pseudo: bool,

    /// Columns to show, comma separated (default: all)
    #[arg(short, long, value_name = "COLUMNS", value_delimiter = ',')]
    pub output: Vec<String>,

    /// Columns to hide, comma separated
    #[arg(short = 'x', long, value_name = "COLUMNS", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Run smartctl through `sudo -n`
    #[arg(long)]
    pub sudo: bool,

    /// Timeout for external commands in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Invert the pattern match
    #[arg(short = 'v', long)]
    pub invert: bool,

    /// Match patterns against device names only
    #[arg(short = 'N', long)]
    pub name_only: bool,

    /// Repeat every N seconds; after the first pass only active devices are shown
    #[arg(short, long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Show devices with zero size
    #[arg(long)]
    pub show_zero_size_devices: bool,

    /// Hide devices smaller than SIZE (e.g. "1G", "500 MB", "1.5GiB")
    #[arg(long, value_name = "SIZE", value_parser = parse_min_size)]
    pub min_size: Option<u64>,

    /// Increase logging verbosity (repeat for info, debug, trace)
    #[arg(long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Excluded columns: the command line replaces the configured default
    pub fn excluded<'a>(&'a self, configured: &'a [String]) -> &'a [String] {
        if self.exclude.is_empty() {
            configured
        } else {
            &self.exclude
        }
    }

    pub fn size_format(&self) -> SizeFormat {
        let base = if self.si { UnitBase::Decimal } else { UnitBase::Binary };
        SizeFormat::new(base, self.bytes)
    }

    pub fn snapshot_options(&self, columns: ColumnSet) -> Result<SnapshotOptions, regex::Error> {
        Ok(SnapshotOptions {
            columns,
            sizes: self.size_format(),
            filter: RowFilter::new(&self.patterns, self.invert, self.name_only)?,
            best_only: self.best_only,
            mounted_only: self.mounted_only,
            formatted_only: self.formatted_only,
            active_only: self.active_only,
            include_pseudo: self.pseudo,
            show_zero_size: self.show_zero_size_devices,
            min_size: self.min_size,
            sample_throughput: false,
        })
    }

    /// Log level raised by `--verbose`, else the configured one
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_min_size(s: &str) -> Result<u64, String> {
    parse_size(s, UnitBase::Binary).map_err(|e| e.to_string())
}
