use http::StatusCode;
use reindex_common::webhook::TargetError;
use thiserror::Error;

/// Enumeration of errors that can occur while reading or writing a spreadsheet.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("could not read {file}: {error}")]
    ParseError {
        file: String,
        error: calamine::Error,
    },
    #[error("{0} contains no worksheets")]
    EmptyWorkbookError(String),
    #[error("failed to write spreadsheet: {0}")]
    WriteError(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to open {file}: {error}")]
    IoError {
        file: String,
        error: std::io::Error,
    },
}

/// Enumeration of reasons a single notification attempt failed. All of them are retryable.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP {}", .0.as_u16())]
    StatusError(StatusCode),
    #[error("{0}")]
    TransportError(String),
}

impl From<reqwest::Error> for RequestError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => RequestError::StatusError(status),
            None => RequestError::TransportError(error.to_string()),
        }
    }
}

/// Enumeration of errors related to storing generated output files.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write {file}: {error}")]
    WriteError {
        file: String,
        error: std::io::Error,
    },
    #[error("{0} cannot be expressed as a file URL")]
    UrlError(String),
}

/// Enumeration of errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("at least one input file is required")]
    NoInputError,
    #[error(transparent)]
    ParseError(#[from] SpreadsheetError),
    #[error(transparent)]
    TargetError(#[from] TargetError),
    #[error(transparent)]
    SinkError(#[from] SinkError),
    #[error("failed to build HTTP client: {0}")]
    ClientError(#[from] reqwest::Error),
    #[error("a background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}
