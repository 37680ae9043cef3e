use reindex_common::webhook::{Country, Endpoints, Environment, TargetError};
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::dispatcher::{Dispatcher, FinalReport};
use crate::error::PipelineError;
use crate::events::{EventSender, PipelineEvent};
use crate::sender::{build_http_client, HttpNotificationSender, NotificationSender};
use crate::spreadsheet::InputFile;

/// Target selection captured when a run starts. A run owns its copy, so changing the selection
/// afterwards only affects later runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub environment: Environment,
    pub country: Country,
    pub endpoint: Url,
}

impl RunSettings {
    pub fn resolve(
        endpoints: &Endpoints,
        environment: Environment,
        country: Country,
    ) -> Result<Self, TargetError> {
        Ok(Self {
            environment,
            country,
            endpoint: endpoints.resolve(environment)?.clone(),
        })
    }
}

/// Runs identifier deduplication and then notifies the indexer about every identifier found.
pub struct BatchOrchestrator<S> {
    deduplicator: Deduplicator,
    dispatcher: Dispatcher<S>,
    events: EventSender,
}

impl BatchOrchestrator<HttpNotificationSender> {
    /// Build an orchestrator sending over HTTP to the target in `settings`.
    pub fn from_config(
        config: &Config,
        settings: RunSettings,
        events: EventSender,
    ) -> Result<Self, PipelineError> {
        let client = build_http_client(config.request_timeout.0)?;

        info!(
            environment = %settings.environment,
            country = %settings.country,
            endpoint = %settings.endpoint,
            "configured run target"
        );

        let sender = HttpNotificationSender::new(client, settings.endpoint, settings.country);
        let dispatcher = Dispatcher::new(
            sender,
            config.max_concurrent_requests,
            config.batch_size,
            config.retry_policy.provide(),
        );

        Ok(Self::new(Deduplicator::default(), dispatcher, events))
    }
}

impl<S: NotificationSender> BatchOrchestrator<S> {
    pub fn new(deduplicator: Deduplicator, dispatcher: Dispatcher<S>, events: EventSender) -> Self {
        Self {
            deduplicator,
            dispatcher,
            events,
        }
    }

    /// Deduplicate the identifiers in `files`, then dispatch a notification for each of them.
    /// Fails without doing any work when `files` is empty.
    pub async fn run(&self, files: &[InputFile]) -> Result<FinalReport, PipelineError> {
        if files.is_empty() {
            let pipeline_error = PipelineError::NoInputError;
            self.events.error(pipeline_error.to_string());
            return Err(pipeline_error);
        }

        self.events.log("Starting deduplication...");
        self.events.progress(0);

        let identifiers = self.deduplicator.deduplicate(files, &self.events).await;

        info!(count = identifiers.len(), "deduplication complete");
        self.events.send(PipelineEvent::DeduplicateComplete {
            unique_ids: identifiers.as_slice().to_vec(),
            unique_ids_count: identifiers.len(),
        });
        self.events.log(format!(
            "Found {} unique identifiers after deduplication.",
            identifiers.len()
        ));

        self.events.log("Sending requests...");
        self.events.progress(0);

        let report = self
            .dispatcher
            .dispatch(identifiers.as_slice(), &self.events)
            .await;

        info!(
            total = report.total_count,
            succeeded = report.success_count,
            failed = report.failed_requests.len(),
            "dispatch complete"
        );
        self.events.send(PipelineEvent::ProcessComplete {
            success_count: report.success_count,
            failed_requests: report.failed_requests.clone(),
        });
        for line in report.summary_lines() {
            self.events.log(line);
        }
        self.events.send(PipelineEvent::Complete {
            message: "Process completed".to_owned(),
        });

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reindex_common::webhook::PRODUCTION_ENDPOINT;

    #[test]
    fn test_resolve_settings() {
        let endpoints = Endpoints {
            qa: Some(Url::parse("http://qa.local/items").unwrap()),
            production: Url::parse(PRODUCTION_ENDPOINT).unwrap(),
        };

        let settings = RunSettings::resolve(&endpoints, Environment::Qa, Country::NI).unwrap();

        assert_eq!(settings.endpoint.as_str(), "http://qa.local/items");
        assert_eq!(settings.country, Country::NI);
    }

    #[tokio::test]
    async fn test_run_rejects_no_input() {
        let (events, mut rx) = EventSender::channel();
        let orchestrator =
            BatchOrchestrator::from_config(&Config::default(), default_settings(), events)
                .unwrap();

        let result = orchestrator.run(&[]).await;

        assert!(matches!(result, Err(PipelineError::NoInputError)));
        assert_eq!(
            rx.recv().await,
            Some(PipelineEvent::Error {
                message: "at least one input file is required".to_owned()
            })
        );
    }

    fn default_settings() -> RunSettings {
        RunSettings {
            environment: Environment::Production,
            country: Country::default(),
            endpoint: Url::parse(PRODUCTION_ENDPOINT).unwrap(),
        }
    }
}
