//! Subreddit scraper over the Pushshift archive.
//!
//! Submissions of each target are fetched (or read back from an earlier run), then their comments
//! are retrieved either in one go or in numbered batches that are written to disk as they arrive.
//! A run interrupted mid-way is resumed by skipping the batches already written.

mod error;
mod macros;

pub mod batch;
pub mod config;
pub mod process;
pub mod request;
pub mod store;

pub use error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.pushshift.io";
/// Pushshift caps a search page at 100 results.
const SUBMISSIONS_PER_PAGE: usize = 100;
const COMMENT_IDS_PER_REQUEST: usize = 500;
