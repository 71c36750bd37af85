//! Error types for point-in-time graph reconstruction

use thiserror::Error;

/// Result type alias for twingraph operations
pub type Result<T> = std::result::Result<T, TwinError>;

/// Which part of a log row failed to become an RDF node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
    /// Subject position
    Subject,
    /// Predicate position
    Predicate,
    /// Object of a type assertion
    Object,
}

impl std::fmt::Display for NodeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeField::Subject => write!(f, "subject"),
            NodeField::Predicate => write!(f, "predicate"),
            NodeField::Object => write!(f, "object"),
        }
    }
}

/// Main error type for twingraph
#[derive(Error, Debug)]
pub enum TwinError {
    /// Caller supplied a missing or unparsable argument (usually the cutoff)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The backing triple log could not be queried
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// A log row could not be turned into a valid node, even after sanitization
    #[error("Malformed {field} identifier '{value}': {reason}")]
    MalformedIdentifier {
        /// Offending position
        field: NodeField,
        /// Raw value from the log
        value: String,
        /// Parser message
        reason: String,
    },

    /// Graph serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TwinError {
    /// True when the failure was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TwinError::InvalidArgument(_))
    }

    pub(crate) fn malformed(field: NodeField, value: &str, reason: impl ToString) -> Self {
        TwinError::MalformedIdentifier {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for TwinError {
    fn from(err: rusqlite::Error) -> Self {
        TwinError::DataSourceUnavailable(format!("sqlite: {}", err))
    }
}

impl From<reqwest::Error> for TwinError {
    fn from(err: reqwest::Error) -> Self {
        TwinError::DataSourceUnavailable(format!("warehouse request failed: {}", err))
    }
}

impl From<bincode::Error> for TwinError {
    fn from(err: bincode::Error) -> Self {
        TwinError::DataSourceUnavailable(format!("corrupt log dictionary: {}", err))
    }
}

impl From<oxigraph::model::IriParseError> for TwinError {
    fn from(err: oxigraph::model::IriParseError) -> Self {
        TwinError::Config(format!("invalid namespace IRI: {}", err))
    }
}
