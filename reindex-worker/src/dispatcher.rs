use std::sync::Arc;

use futures::future::join_all;
use reindex_common::retry::RetryPolicy;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::events::{percentage, EventSender, PipelineEvent};
use crate::sender::{send_with_retry, NotificationSender, RequestOutcome};

/// How many failures a `FinalReport` presents before truncating.
pub const FAILURE_PREVIEW_LIMIT: usize = 10;

/// Aggregate over one dispatched batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// 1-based position of the batch in the run.
    pub batch_number: usize,
    pub error_count: usize,
    pub summary: String,
}

impl BatchReport {
    fn new(batch_number: usize, error_count: usize) -> Self {
        let summary = match error_count {
            0 => format!("Batch {batch_number}: all requests succeeded"),
            1 => format!("Batch {batch_number}: 1 error"),
            n => format!("Batch {batch_number}: {n} errors"),
        };
        Self {
            batch_number,
            error_count,
            summary,
        }
    }
}

/// Aggregate over a whole dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalReport {
    pub total_count: usize,
    pub success_count: usize,
    /// One `<identifier> - Error: <reason>` line per failed identifier, in dispatch order.
    pub failed_requests: Vec<String>,
}

impl FinalReport {
    pub fn failure_preview(&self) -> &[String] {
        let end = self.failed_requests.len().min(FAILURE_PREVIEW_LIMIT);
        &self.failed_requests[..end]
    }

    /// Human readable summary of the run, showing at most `FAILURE_PREVIEW_LIMIT` failures.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Processing complete.".to_owned(),
            format!("Successful requests: {}", self.success_count),
        ];

        if self.failed_requests.is_empty() {
            lines.push("All requests succeeded".to_owned());
        } else {
            lines.push(format!("Errors ({}):", self.failed_requests.len()));
            lines.extend(self.failure_preview().iter().cloned());
        }

        lines
    }
}

/// Sends notifications for a sequence of identifiers in batches, never allowing more than
/// `max_concurrent_requests` identifiers to be in flight at once across the whole run.
pub struct Dispatcher<S> {
    sender: S,
    /// Shared by every request of every batch. A permit is held from the first attempt of an
    /// identifier until its last retry settles.
    limiter: Arc<Semaphore>,
    max_concurrent_requests: usize,
    batch_size: usize,
    retry_policy: RetryPolicy,
}

impl<S: NotificationSender> Dispatcher<S> {
    pub fn new(
        sender: S,
        max_concurrent_requests: usize,
        batch_size: usize,
        retry_policy: RetryPolicy,
    ) -> Self {
        let max_concurrent_requests = max_concurrent_requests.max(1);

        Self {
            sender,
            limiter: Arc::new(Semaphore::new(max_concurrent_requests)),
            max_concurrent_requests,
            batch_size: batch_size.max(1),
            retry_policy,
        }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    fn report_limiter_utilization(&self) {
        metrics::gauge!("reindex_dispatcher_saturation_percent").set(
            1f64 - self.limiter.available_permits() as f64 / self.max_concurrent_requests as f64,
        );
    }

    /// Send one notification per identifier in `batch`, concurrently within the limiter's bound.
    /// Yields exactly one outcome per identifier, in `batch` order.
    pub async fn dispatch_batch(&self, batch: &[&str]) -> Vec<RequestOutcome> {
        let requests = batch.iter().map(|identifier| async move {
            let permit = self
                .limiter
                .acquire()
                .await
                .expect("semaphore has been closed");

            metrics::counter!("reindex_requests_total").increment(1);
            let outcome = send_with_retry(&self.sender, identifier, &self.retry_policy).await;
            drop(permit);

            if outcome.is_success() {
                metrics::counter!("reindex_requests_completed").increment(1);
            } else {
                metrics::counter!("reindex_requests_failed").increment(1);
            }
            outcome
        });

        join_all(requests).await
    }

    /// Notify the indexer about every identifier, reporting progress after each batch.
    ///
    /// Empty entries are filtered out of each batch. A batch left with nothing to send is skipped
    /// with a warning but still counts towards batch numbering and progress.
    pub async fn dispatch(&self, identifiers: &[String], events: &EventSender) -> FinalReport {
        let total = identifiers.len();
        let mut processed = 0;
        let mut dispatched = 0;
        let mut failed_requests = Vec::new();

        for (index, chunk) in identifiers.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            let batch: Vec<&str> = chunk
                .iter()
                .map(String::as_str)
                .filter(|identifier| !identifier.is_empty())
                .collect();

            if batch.is_empty() {
                warn!(batch_number, "skipping empty batch");
                events.log(format!("Batch {batch_number}: empty batch skipped"));
            } else {
                self.report_limiter_utilization();
                let outcomes = self.dispatch_batch(&batch).await;

                let descriptions: Vec<String> = outcomes
                    .iter()
                    .filter_map(RequestOutcome::failure_description)
                    .collect();

                let report = BatchReport::new(batch_number, descriptions.len());
                info!(
                    batch_number,
                    size = batch.len(),
                    errors = report.error_count,
                    "batch dispatched"
                );
                events.log(report.summary);

                dispatched += batch.len();
                failed_requests.extend(descriptions);
            }

            processed += chunk.len();
            events.send(PipelineEvent::Progress {
                progress: percentage(processed, total),
                current_file: None,
                processed_count: Some(processed),
                total_count: Some(total),
            });
        }

        self.report_limiter_utilization();

        FinalReport {
            total_count: dispatched,
            success_count: dispatched - failed_requests.len(),
            failed_requests,
        }
    }
}
