use std::time;

use async_trait::async_trait;
use reindex_common::retry::RetryPolicy;
use reindex_common::webhook::{Country, ItemNotification};
use reqwest::header;
use tracing::{debug, warn};
use url::Url;

use crate::error::RequestError;

/// The result of notifying the indexer about a single identifier, retries included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure { identifier: String, reason: String },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success)
    }

    /// The line a failure is reported with: `<identifier> - Error: <reason>`.
    pub fn failure_description(&self) -> Option<String> {
        match self {
            RequestOutcome::Success => None,
            RequestOutcome::Failure { identifier, reason } => {
                Some(format!("{identifier} - Error: {reason}"))
            }
        }
    }
}

/// Something able to make one delivery attempt of a notification for an identifier.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, identifier: &str) -> Result<(), RequestError>;
}

/// Build the HTTP client used for every notification.
pub fn build_http_client(request_timeout: time::Duration) -> reqwest::Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent("Product Reindex Worker")
        .timeout(request_timeout)
        .build()
}

/// Posts an `ItemNotification` to a fixed endpoint for a fixed country.
#[derive(Debug, Clone)]
pub struct HttpNotificationSender {
    client: reqwest::Client,
    endpoint: Url,
    country: Country,
}

impl HttpNotificationSender {
    pub fn new(client: reqwest::Client, endpoint: Url, country: Country) -> Self {
        Self {
            client,
            endpoint,
            country,
        }
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send(&self, identifier: &str) -> Result<(), RequestError> {
        let notification = ItemNotification::new(identifier, self.country);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&notification)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RequestError::StatusError(status))
        }
    }
}

/// Send a notification for `identifier`, retrying failed attempts as `retry_policy` allows.
///
/// Every failure is retryable. After a failed attempt the sender waits
/// `retry_policy.retry_interval(attempt)` before trying again; once attempts are exhausted the
/// outcome carries the last failure's reason.
pub async fn send_with_retry<S: NotificationSender + ?Sized>(
    sender: &S,
    identifier: &str,
    retry_policy: &RetryPolicy,
) -> RequestOutcome {
    let mut attempt = 0;

    loop {
        metrics::counter!("reindex_request_attempts_total").increment(1);
        let now = tokio::time::Instant::now();

        let error = match sender.send(identifier).await {
            Ok(()) => {
                metrics::histogram!("reindex_request_duration_seconds")
                    .record(now.elapsed().as_secs_f64());
                return RequestOutcome::Success;
            }
            Err(error) => error,
        };

        if !retry_policy.should_retry(attempt) {
            warn!(
                identifier,
                attempts = attempt + 1,
                "giving up on notification: {}",
                error
            );
            return RequestOutcome::Failure {
                identifier: identifier.to_owned(),
                reason: error.to_string(),
            };
        }

        let retry_interval = retry_policy.retry_interval(attempt);
        debug!(
            identifier,
            attempt,
            retry_in_ms = retry_interval.as_millis() as u64,
            "notification failed, retrying: {}",
            error
        );
        metrics::counter!("reindex_requests_retried").increment(1);

        tokio::time::sleep(retry_interval).await;
        attempt += 1;
    }
}
