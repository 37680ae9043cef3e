//! Progress notifications sent from a running pipeline to whoever started it.
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Every notification a pipeline run can produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    #[serde(rename_all = "camelCase")]
    Progress {
        progress: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_file: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        processed_count: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_count: Option<usize>,
    },
    Log {
        message: String,
    },
    Error {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    DeduplicateComplete {
        unique_ids: Vec<String>,
        unique_ids_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ProcessComplete {
        success_count: usize,
        failed_requests: Vec<String>,
    },
    Complete {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Download {
        file_name: String,
        file_url: String,
    },
}

/// Map `done` out of `total` onto a whole percentage in `0..=100`.
pub fn percentage(done: usize, total: usize) -> u8 {
    scaled_percentage(done, total, 100)
}

/// Map `done` out of `total` onto `0..=span`, for phases that only own part of the progress bar.
pub fn scaled_percentage(done: usize, total: usize, span: u8) -> u8 {
    if total == 0 {
        return span;
    }
    let ratio = done.min(total) as f64 / total as f64;
    (ratio * f64::from(span)).round() as u8
}

/// Sending half of a pipeline's event channel.
///
/// Sending never fails a run: once the receiving side is gone, events are dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// An `EventSender` that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            // The receiver hanging up only means nobody is watching anymore.
            tx.send(event).ok();
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(PipelineEvent::Log {
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(PipelineEvent::Error {
            message: message.into(),
        });
    }

    pub fn progress(&self, progress: u8) {
        self.send(PipelineEvent::Progress {
            progress,
            current_file: None,
            processed_count: None,
            total_count: None,
        });
    }
}

/// Drain `rx`, rendering each event through `tracing`, until every sender is dropped.
pub async fn log_events(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::Progress {
                progress,
                current_file,
                processed_count,
                total_count,
            } => match (current_file, processed_count, total_count) {
                (Some(file), _, _) => info!(progress, file = %file, "progress"),
                (None, Some(processed), Some(total)) => {
                    info!(progress, processed, total, "progress")
                }
                _ => info!(progress, "progress"),
            },
            PipelineEvent::Log { message } => info!("{}", message),
            PipelineEvent::Error { message } => error!("{}", message),
            PipelineEvent::DeduplicateComplete {
                unique_ids_count, ..
            } => info!("found {} unique identifiers", unique_ids_count),
            PipelineEvent::ProcessComplete {
                success_count,
                failed_requests,
            } => info!(
                success_count,
                failure_count = failed_requests.len(),
                "requests processed"
            ),
            PipelineEvent::Complete { message } => info!("{}", message),
            PipelineEvent::Download {
                file_name,
                file_url,
            } => info!(file = %file_name, url = %file_url, "output file ready"),
        }
    }
}
