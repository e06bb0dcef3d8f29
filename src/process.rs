use chrono::Local;
use futures::TryStreamExt;
use tracing::{info, warn};

use crate::batch::{batch_count, retrieve_batches, BatchPlan};
use crate::config::Config;
use crate::request::{record_id, SearchClient};
use crate::store::CsvStore;
use crate::{info_time, Result};

/// How a target ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Comments were already on disk and `skip_scraped` was set.
    SkippedComments,
    /// Comments were retrieved; `batches` lists the batch indices written, empty when unbatched.
    Comments { batches: Vec<usize> },
}

/// Scrapes every configured target in turn, stopping at the first error.
pub async fn process_targets<C>(config: &Config, client: &C) -> Result<Vec<(String, TargetOutcome)>>
where
    C: SearchClient + ?Sized,
{
    config.validate()?;
    let start_time = Local::now();
    let store = CsvStore::new(&config.output_dir);

    info_time!("Started scraping {} target(s)", config.targets.len());
    let mut outcomes = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let outcome = process_target(config, client, &store, target).await?;
        outcomes.push((target.clone(), outcome));
    }
    info_time!(start_time, "Finished scraping all targets.");

    Ok(outcomes)
}

/// Resolves the submissions of `target`, then retrieves and persists their comments.
pub async fn process_target<C>(
    config: &Config,
    client: &C,
    store: &CsvStore,
    target: &str,
) -> Result<TargetOutcome>
where
    C: SearchClient + ?Sized,
{
    let start_time = Local::now();
    let mut submission_ids = resolve_submissions(config, client, store, target).await?;
    if let Some(limit) = config.limit {
        submission_ids.truncate(limit);
    }
    info_time!(start_time, "Resolved {} submissions for {target}", submission_ids.len());

    if config.skip_scraped && already_scraped(config, store, target, submission_ids.len()) {
        info!(subreddit = target, "comments already scraped, skipping");
        return Ok(TargetOutcome::SkippedComments);
    }

    let outcome = match config.batch_size {
        Some(size) => {
            let plan = BatchPlan {
                size,
                skip_through: config.skip_through,
                limit: config.limit,
            };
            let total = batch_count(submission_ids.len(), size);
            let mut batches = std::pin::pin!(retrieve_batches(client, &submission_ids, plan)?);
            let mut written = Vec::new();
            while let Some(batch) = batches.try_next().await? {
                store.write_records(&store.batch_path(target, batch.index), &batch.records)?;
                info_time!(
                    start_time,
                    "Wrote batch {}/{total} of {target}: {} comments",
                    batch.index,
                    batch.records.len()
                );
                written.push(batch.index);
            }
            TargetOutcome::Comments { batches: written }
        }
        None => {
            let comment_ids = client.search_submission_comment_ids(&submission_ids).await?;
            let comments = client.search_comments(&comment_ids, config.limit).await?;
            store.write_records(&store.comments_path(target), &comments)?;
            info_time!(start_time, "Wrote {} comments of {target}", comments.len());
            TargetOutcome::Comments { batches: Vec::new() }
        }
    };
    Ok(outcome)
}

/// Submission ids of `target`, read back from disk when asked to, otherwise freshly fetched and
/// persisted.
async fn resolve_submissions<C>(
    config: &Config,
    client: &C,
    store: &CsvStore,
    target: &str,
) -> Result<Vec<String>>
where
    C: SearchClient + ?Sized,
{
    let path = store.submissions_path(target);
    if config.load_submissions {
        if path.exists() {
            info!(subreddit = target, path = %path.display(), "loading submissions");
            return store.read_ids(&path);
        }
        warn!(subreddit = target, path = %path.display(), "no saved submissions, fetching instead");
    }

    let submissions = client.search_submissions(target, config.limit).await?;
    store.write_records(&path, &submissions)?;
    Ok(submissions.iter().filter_map(record_id).collect())
}

/// A batched run counts as finished once its last batch is on disk.
fn already_scraped(config: &Config, store: &CsvStore, target: &str, num_submissions: usize) -> bool {
    if store.comments_path(target).exists() {
        return true;
    }
    match config.batch_size {
        Some(size) if num_submissions > 0 => {
            let last = batch_count(num_submissions, size);
            store.batch_path(target, last).exists()
        }
        _ => false,
    }
}
