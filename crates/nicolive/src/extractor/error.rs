use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("no valid cookies found")]
    NoValidCookies,
    #[error("no audio or video variants found in manifest")]
    NoVariants,
    #[error("no available variant matches a known quality")]
    NoAvailableVariant,
    #[error("manifest url is empty")]
    EmptyManifest,
    #[error("timed out after {timeout:?} waiting for the manifest url")]
    LocatorTimeout {
        timeout: Duration,
        #[source]
        source: tokio::time::error::Elapsed,
    },
    #[error("browser automation error: {0}")]
    Automation(String),
    #[error("http error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("{program} exited with {status}")]
    DownloadFailed { program: String, status: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http client error: {0}")]
    Client(String),
}

/// Coarse classification of an [`ExtractorError`], logged as a structured field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Parse,
    NotFound,
    Timeout,
    Automation,
    Fetch,
    Download,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Parse => "parse",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Automation => "automation",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Download => "download",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExtractorError {
    pub fn automation(msg: impl fmt::Display) -> Self {
        Self::Automation(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::NoValidCookies
            | ExtractorError::NoVariants
            | ExtractorError::NoAvailableVariant => ErrorKind::NotFound,
            ExtractorError::EmptyManifest | ExtractorError::Automation(_) => {
                ErrorKind::Automation
            }
            ExtractorError::LocatorTimeout { .. } => ErrorKind::Timeout,
            ExtractorError::Fetch(_) | ExtractorError::Client(_) => ErrorKind::Fetch,
            ExtractorError::DownloadFailed { .. } => ErrorKind::Download,
            ExtractorError::Io(_) => ErrorKind::Io,
        }
    }
}
