//! Chunked lookups with structured partial results.
//!
//! A failed sub-batch does not abort the others; its identifiers are
//! reported as failures and the caller decides whether the partial data
//! is usable.

use std::future::Future;

use helix_client::{HelixError, chunk_batches};
use tracing::debug;

/// A failed sub-batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Identifiers that were part of the failed request.
    pub ids: Vec<String>,
    pub error: HelixError,
}

/// Records from the successful sub-batches plus the failed ones.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub records: Vec<T>,
    pub failures: Vec<BatchFailure>,
    /// Number of requests issued.
    pub requests: usize,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            requests: 0,
        }
    }

    pub fn add_records(&mut self, records: impl IntoIterator<Item = T>) {
        self.records.extend(records);
    }

    pub fn add_failure(&mut self, ids: &[String], error: HelixError) {
        self.failures.push(BatchFailure {
            ids: ids.to_vec(),
            error,
        });
    }

    /// Check if all sub-batches succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn any_unauthorized(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_unauthorized())
    }

    pub fn failed_ids(&self) -> usize {
        self.failures.iter().map(|f| f.ids.len()).sum()
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `fetch` for every ≤100 chunk of `ids` sequentially.
///
/// `permit` is consulted before each request; returning false stops
/// issuing further requests (the remaining ids are neither records nor
/// failures). An unauthorized failure also stops the run, and every chunk
/// not yet requested is recorded as failed with the same rejection.
pub async fn fetch_chunked<T, F, Fut, P>(
    ids: &[String],
    mut permit: P,
    mut fetch: F,
) -> BatchOutcome<T>
where
    F: FnMut(&[String]) -> Fut,
    Fut: Future<Output = Result<Vec<T>, HelixError>>,
    P: FnMut(usize) -> bool,
{
    let mut outcome = BatchOutcome::new();

    let mut chunks = chunk_batches(ids).enumerate();
    while let Some((index, chunk)) = chunks.next() {
        if !permit(index) {
            debug!(chunk = index, "Stopping chunked lookup, no permit");
            break;
        }

        outcome.requests += 1;
        match fetch(chunk).await {
            Ok(records) => outcome.add_records(records),
            Err(HelixError::Unauthorized(message)) => {
                outcome.add_failure(chunk, HelixError::Unauthorized(message.clone()));
                for (_, rest) in chunks.by_ref() {
                    outcome.add_failure(rest, HelixError::Unauthorized(message.clone()));
                }
                break;
            }
            Err(error) => outcome.add_failure(chunk, error),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_concatenates_all_chunks() {
        let ids = ids(250);
        let outcome = fetch_chunked(&ids, |_| true, |chunk: &[String]| {
            let out = chunk.to_vec();
            async move { Ok::<_, HelixError>(out) }
        })
        .await;

        assert_eq!(outcome.requests, 3);
        assert_eq!(outcome.records, ids);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_stop_others() {
        let ids = ids(250);
        let outcome = fetch_chunked(&ids, |_| true, |chunk: &[String]| {
            let fail = chunk[0] == "100";
            let out = chunk.to_vec();
            async move {
                if fail {
                    Err(HelixError::Status {
                        status: 500,
                        body: String::new(),
                    })
                } else {
                    Ok(out)
                }
            }
        })
        .await;

        assert_eq!(outcome.requests, 3);
        assert_eq!(outcome.records.len(), 150);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failed_ids(), 100);
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_unauthorized_stops_run() {
        let ids = ids(250);
        let outcome: BatchOutcome<String> = fetch_chunked(&ids, |_| true, |_: &[String]| async {
            Err(HelixError::Unauthorized("expired".to_string()))
        })
        .await;

        assert_eq!(outcome.requests, 1);
        assert!(outcome.any_unauthorized());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.failures.len(), 3);
        assert_eq!(outcome.failed_ids(), 250);
    }

    #[tokio::test]
    async fn test_permit_limits_requests() {
        let ids = ids(250);
        let outcome = fetch_chunked(&ids, |index| index < 2, |chunk: &[String]| {
            let out = chunk.to_vec();
            async move { Ok::<_, HelixError>(out) }
        })
        .await;

        assert_eq!(outcome.requests, 2);
        assert_eq!(outcome.records.len(), 200);
    }
}
