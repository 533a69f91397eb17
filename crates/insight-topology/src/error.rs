//! Error types for insight-topology

use thiserror::Error;

/// Errors raised while extracting a descriptor from a single frame
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The captured URI is not syntactically valid
    #[error("Failed to parse {value}: {source}")]
    InvalidUri {
        value: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    /// The URI parsed but is not absolute (no scheme or no host)
    #[error("Failed to parse {0}: missing host")]
    MissingHost(String),
}

impl TopologyError {
    /// The offending URI string
    pub fn value(&self) -> &str {
        match self {
            TopologyError::InvalidUri { value, .. } => value,
            TopologyError::MissingHost(value) => value,
        }
    }
}

pub type TopologyResult<T> = Result<T, TopologyError>;
