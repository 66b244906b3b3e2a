//! Error types for the scrape-and-export pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupplyError {
    /// Missing or malformed construction input (target date, limit, fiat)
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Upstream answered with a non-zero `status.error_code`
    #[error("provider error: {0}")]
    Provider(String),

    /// Connection failure, timeout or a payload that could not be decoded
    #[error("transport error: {0}")]
    Transport(String),

    /// An optional capability was compiled out
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to encode {format}: {message}")]
    Encode { format: String, message: String },

    #[error("failed to write {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for SupplyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type SupplyResult<T> = Result<T, SupplyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_preserved() {
        let err = SupplyError::Provider("Invalid date".to_string());
        assert_eq!(err.to_string(), "provider error: Invalid date");
    }

    #[test]
    fn test_export_error_names_path() {
        let err = SupplyError::Export {
            path: PathBuf::from("/nowhere/out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nowhere/out.csv"));
    }
}
