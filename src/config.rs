use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::{Error, Result, DEFAULT_BASE_URL};

/// Scrape subreddit submissions and their comments from the Pushshift archive into CSV files.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Subreddits to scrape
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Read submission ids from a previously written `<target>_submissions.csv`
    #[arg(long)]
    pub load_submissions: bool,

    /// Skip targets whose comments were already scraped
    #[arg(long)]
    pub skip_scraped: bool,

    /// Retrieve comments for this many submissions at a time
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Resume after this batch index; negative resumes nothing
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub resume_batch: i64,

    /// Cap the number of items retrieved, for test runs
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Directory the CSV files are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Base URL of the search API
    #[arg(long, env = "PUSHSHIFT_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// Everything a run needs, built once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub targets: Vec<String>,
    pub load_submissions: bool,
    pub skip_scraped: bool,
    pub batch_size: Option<usize>,
    /// Highest batch index already completed by an earlier run.
    pub skip_through: Option<usize>,
    pub limit: Option<usize>,
    pub output_dir: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
}

impl Config {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            targets,
            load_submissions: false,
            skip_scraped: false,
            batch_size: None,
            skip_through: None,
            limit: None,
            output_dir: PathBuf::from("."),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::InvalidArgument("no targets given".into()));
        }
        if self.batch_size == Some(0) {
            return Err(Error::InvalidArgument("batch size must be positive".into()));
        }
        Ok(())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            targets: args.targets,
            load_submissions: args.load_submissions,
            skip_scraped: args.skip_scraped,
            batch_size: args.batch_size,
            skip_through: usize::try_from(args.resume_batch).ok(),
            limit: args.limit,
            output_dir: args.output_dir,
            base_url: args.base_url,
            timeout: Duration::from_secs(args.timeout_secs),
        }
    }
}
