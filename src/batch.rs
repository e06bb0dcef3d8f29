//! Splitting identifier lists into numbered batches and retrieving comments batch by batch.
//!
//! Batch numbers start at 1 and depend only on the identifier list and the batch size, so an
//! interrupted run can be resumed by skipping every batch up to the last one persisted.

use futures::stream::{self, Stream};
use tracing::info;

use crate::request::{Record, SearchClient};
use crate::{Error, Result};

/// Splits `items` into contiguous slices of `size`, the last one possibly shorter.
pub fn split<T>(items: &[T], size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if size == 0 {
        return Err(Error::InvalidArgument("batch size must be positive".into()));
    }
    Ok(items.chunks(size))
}

/// Number of batches `split` produces for `len` items.
pub fn batch_count(len: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        len.div_ceil(size)
    }
}

/// How a batched retrieval is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub size: usize,
    /// Batches with an index `<=` this are skipped without any requests.
    pub skip_through: Option<usize>,
    /// Cap on comments fetched per batch.
    pub limit: Option<usize>,
}

impl BatchPlan {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            skip_through: None,
            limit: None,
        }
    }

    pub fn skips(&self, idx: usize) -> bool {
        self.skip_through.is_some_and(|cursor| idx <= cursor)
    }
}

/// Comments retrieved for one batch of submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub index: usize,
    pub records: Vec<Record>,
}

/// Lazily retrieves the comments of `submission_ids`, one batch at a time.
///
/// Each batch that is not skipped costs two calls on `client`: one resolving the batch's
/// submissions to comment ids, one fetching those comments. Nothing is requested until the
/// stream is polled, and the first error ends the stream.
pub fn retrieve_batches<'a, C>(
    client: &'a C,
    submission_ids: &'a [String],
    plan: BatchPlan,
) -> Result<impl Stream<Item = Result<BatchOutput>> + 'a>
where
    C: SearchClient + ?Sized,
{
    let batches = split(submission_ids, plan.size)?.enumerate();
    let total = batch_count(submission_ids.len(), plan.size);

    Ok(stream::try_unfold(batches, move |batches| {
        next_batch(client, batches, plan, total)
    }))
}

/// Advances `batches` past skipped indices and retrieves the next remaining batch.
async fn next_batch<'a, C, I>(
    client: &C,
    mut batches: I,
    plan: BatchPlan,
    total: usize,
) -> Result<Option<(BatchOutput, I)>>
where
    C: SearchClient + ?Sized,
    I: Iterator<Item = (usize, &'a [String])>,
{
    for (i, batch) in batches.by_ref() {
        let idx = i + 1;
        if plan.skips(idx) {
            info!(batch = idx, total, "skipping batch");
            continue;
        }
        info!(batch = idx, total, size = batch.len(), "retrieving batch");
        let comment_ids = client.search_submission_comment_ids(batch).await?;
        let records = client.search_comments(&comment_ids, plan.limit).await?;
        return Ok(Some((BatchOutput { index: idx, records }, batches)));
    }
    Ok(None)
}
