use nicolive_extractor::{ErrorKind, ExtractorError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Extractor(#[from] ExtractorError),
}

impl CliError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Category reported alongside the message when the process exits.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::Validation(_) => ErrorKind::Validation,
            CliError::Config(_) => ErrorKind::Parse,
            CliError::Io(_) => ErrorKind::Io,
            CliError::Extractor(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_extractor() {
        let err = CliError::from(ExtractorError::NoAvailableVariant);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(CliError::validation("x").kind(), ErrorKind::Validation);
    }
}
