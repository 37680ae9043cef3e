use std::str::FromStr;
use std::time;

use envconfig::Envconfig;
use reindex_common::retry::RetryPolicy;
use reindex_common::webhook::{Endpoints, PRODUCTION_ENDPOINT};
use url::Url;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3302")]
    pub port: u16,

    #[envconfig(default = "false")]
    pub export_prometheus: bool,

    #[envconfig(default = "30000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(default = "20")]
    pub max_concurrent_requests: usize,

    #[envconfig(default = "50")]
    pub batch_size: usize,

    #[envconfig(default = "10000")]
    pub chunk_size: usize,

    pub qa_endpoint: Option<EnvUrl>,

    #[envconfig(default = "https://omnicanal.simanscs.com/omnicanal/ecommerce/v1/webhook/items")]
    pub production_endpoint: EnvUrl,

    #[envconfig(nested = true)]
    pub retry_policy: RetryPolicyConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            qa: self.qa_endpoint.as_ref().map(|url| url.0.clone()),
            production: self.production_endpoint.0.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3302,
            export_prometheus: false,
            request_timeout: EnvMsDuration(time::Duration::from_secs(30)),
            max_concurrent_requests: 20,
            batch_size: 50,
            chunk_size: 10_000,
            qa_endpoint: None,
            production_endpoint: EnvUrl(
                Url::parse(PRODUCTION_ENDPOINT).expect("production endpoint is a valid URL"),
            ),
            retry_policy: RetryPolicyConfig {
                initial_interval: EnvMsDuration(time::Duration::from_millis(1000)),
                max_attempts: 3,
                maximum_interval: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[derive(Debug, Clone)]
pub struct EnvUrl(pub Url);

impl FromStr for EnvUrl {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EnvUrl(Url::parse(s)?))
    }
}

#[derive(Envconfig, Clone)]
pub struct RetryPolicyConfig {
    #[envconfig(default = "1000")]
    pub initial_interval: EnvMsDuration,

    #[envconfig(default = "3")]
    pub max_attempts: u32,

    pub maximum_interval: Option<EnvMsDuration>,
}

impl RetryPolicyConfig {
    pub fn provide(&self) -> RetryPolicy {
        let builder = RetryPolicy::build(self.initial_interval.0, self.max_attempts);

        match self.maximum_interval {
            Some(interval) => builder.maximum_interval(interval.0).provide(),
            None => builder.provide(),
        }
    }
}
