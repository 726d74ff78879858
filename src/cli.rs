//! Command-line interface definitions.
//!
//! Two subcommands: `harvest` scrapes the corpus, `export` converts a saved
//! snapshot to CSV. Harvest settings can also come from a YAML file; flags
//! override the file.

use crate::config::{HarvestConfig, MalformedPolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Default range (2012-2024) into ./corpus
/// fomc_speeches harvest -o ./corpus
///
/// # Legacy years, gentler on the server
/// fomc_speeches harvest -o ./corpus --start-year 1996 --end-year 2010 --concurrency 2
///
/// # Pick up where an interrupted run stopped
/// fomc_speeches harvest -o ./corpus --resume
///
/// # CSV with a cleaned text column for the scoring tools
/// fomc_speeches export -i ./corpus/speeches.json -o speeches_clean.csv --clean
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape listing pages and speech texts into a corpus snapshot
    Harvest(HarvestArgs),
    /// Convert a corpus snapshot to CSV
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Output directory for the snapshot, report and checkpoint
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Source host name
    #[arg(long, env = "HARVEST_HOST")]
    pub host: Option<String>,

    /// Listing path prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Listing page suffix for years after 2010
    #[arg(long)]
    pub suffix: Option<String>,

    #[arg(long)]
    pub start_year: Option<i32>,

    #[arg(long)]
    pub end_year: Option<i32>,

    /// Maximum requests in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries per request for transient failures
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Minimum milliseconds between request starts
    #[arg(long)]
    pub request_interval_ms: Option<u64>,

    #[arg(long, env = "HARVEST_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Abort on the first listing row with an unparseable date
    #[arg(long)]
    pub strict: bool,

    /// Log per-page list lengths while indexing
    #[arg(long)]
    pub diagnostics: bool,

    /// Reuse documents saved in the output directory's checkpoint
    #[arg(long)]
    pub resume: bool,
}

impl HarvestArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(suffix) = &self.suffix {
            config.suffix = suffix.clone();
        }
        if let Some(year) = self.start_year {
            config.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.end_year = year;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(n) = self.max_retries {
            config.max_retries = n;
        }
        if let Some(ms) = self.request_interval_ms {
            config.request_interval_ms = ms;
        }
        if let Some(ua) = &self.user_agent {
            config.user_agent = ua.clone();
        }
        if self.strict {
            config.malformed = MalformedPolicy::Abort;
        }
        if self.diagnostics {
            config.diagnostics = true;
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Snapshot written by `harvest` (speeches.json)
    #[arg(short, long)]
    pub input: PathBuf,

    /// CSV file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Add a `clean_text` column normalized for sentiment scoring
    #[arg(long)]
    pub clean: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_parsing() {
        let cli = Cli::parse_from([
            "fomc_speeches",
            "harvest",
            "--output-dir",
            "./corpus",
            "--start-year",
            "2009",
            "--end-year",
            "2012",
            "--strict",
        ]);

        let Command::Harvest(args) = cli.command else {
            panic!("expected harvest");
        };
        assert_eq!(args.output_dir, PathBuf::from("./corpus"));

        let mut config = HarvestConfig::default();
        args.apply(&mut config);
        assert_eq!(config.start_year, 2009);
        assert_eq!(config.end_year, 2012);
        assert_eq!(config.malformed, MalformedPolicy::Abort);
        assert_eq!(config.concurrency, HarvestConfig::default().concurrency);
    }

    #[test]
    fn test_harvest_short_flags() {
        let cli = Cli::parse_from(["fomc_speeches", "harvest", "-o", "/tmp/out", "-c", "/tmp/h.yaml"]);
        let Command::Harvest(args) = cli.command else {
            panic!("expected harvest");
        };
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/h.yaml")));
        assert!(!args.resume);
    }

    #[test]
    fn test_export_parsing() {
        let cli = Cli::parse_from([
            "fomc_speeches",
            "export",
            "-i",
            "corpus/speeches.json",
            "-o",
            "out.csv",
            "--clean",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.input, PathBuf::from("corpus/speeches.json"));
        assert_eq!(args.output, PathBuf::from("out.csv"));
        assert!(args.clean);
    }
}
