//! Command line interface definitions

use crate::output::OutputConfig;
use crate::services::metadata::DEFAULT_SITEINFO;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// `flowkeeper` - retention and freshness for flow data repositories.
#[derive(Parser, Debug)]
#[command(name = "flowkeeper")]
#[command(version)]
#[command(about = "Retention and freshness reporting for flow data repositories.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete flow files older than the retention cutoff
    Purge(PurgeArgs),

    /// Report how far each sensor's repository lags behind
    Check(CheckArgs),

    /// Serve the last published status document over HTTP
    Serve,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PurgeArgs {
    /// Repository root (skips automatic discovery)
    #[arg(short, long = "root-dir")]
    pub root_dir: Option<PathBuf>,

    /// Keep this many days of data
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Delete files modified before this local time (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS")
    #[arg(short, long)]
    pub before: Option<String>,

    /// Report what would be deleted without deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print every file considered
    #[arg(short, long)]
    pub verbose: bool,

    /// Print nothing on the console
    #[arg(short, long)]
    pub silent: bool,

    /// Disable colors
    #[arg(short, long)]
    pub monochrome: bool,
}

impl PurgeArgs {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            verbose: self.verbose,
            silent: self.silent,
            color: !self.monochrome,
            headers: true,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Print the report as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Omit the table header
    #[arg(long)]
    pub no_header: bool,

    /// Disable colors
    #[arg(short, long)]
    pub monochrome: bool,

    /// Metadata command to query
    #[arg(long, default_value = DEFAULT_SITEINFO)]
    pub siteinfo: String,

    /// Read sensor records from a delimited file instead of running the metadata command
    #[arg(long)]
    pub from_file: Option<PathBuf>,

    /// Also write the JSON report to this file for the status service
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CheckArgs {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            verbose: false,
            silent: false,
            color: !self.monochrome,
            headers: !self.no_header,
        }
    }
}
