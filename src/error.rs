//! Custom error types for loopline.
//!
//! Only operations that cannot reasonably proceed surface an error: a missing
//! collaborator, a failing history source, or a plan with no starting point.
//! Empty tables are not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sequencing operations
#[derive(Error, Debug)]
pub enum SequencingError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A required collaborator was not wired in
    #[error("Required collaborator not configured: {name}")]
    MissingCollaborator { name: String },

    // =========================================================================
    // Analysis Errors
    // =========================================================================
    /// The history source failed to produce runs
    #[error("History source error: {message}")]
    History { message: String },

    // =========================================================================
    // Planning Errors
    // =========================================================================
    /// No seed move could be determined for a line
    #[error("Cannot determine starting loop: {reason}")]
    NoStartingLoop { reason: String },

    /// A line id that is not in the store
    #[error("Unknown line: {id}")]
    UnknownLine { id: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SequencingError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing collaborator error
    pub fn missing_collaborator(name: impl Into<String>) -> Self {
        Self::MissingCollaborator { name: name.into() }
    }

    /// Create a history source error
    pub fn history(message: impl Into<String>) -> Self {
        Self::History {
            message: message.into(),
        }
    }

    /// Create a planning dead-end error
    pub fn no_starting_loop(reason: impl Into<String>) -> Self {
        Self::NoStartingLoop {
            reason: reason.into(),
        }
    }

    /// Check if retrying with more data could change the outcome
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoStartingLoop { .. } | Self::History { .. })
    }

    /// Check if this error stems from how the sequencer was set up
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::MissingCollaborator { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoStartingLoop { .. } => 3,
            Self::History { .. } => 4,
            Self::UnknownLine { .. } => 5,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::MissingCollaborator { .. } => {
                7
            }
            _ => 1,
        }
    }
}

/// Type alias for sequencing results
pub type Result<T> = std::result::Result<T, SequencingError>;

/// Extension trait for converting collaborator errors to [`SequencingError`]
pub trait IntoSequencingError<T> {
    fn into_sequencing_config(self) -> Result<T>;
    fn into_sequencing_history(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoSequencingError<T> for std::result::Result<T, E> {
    fn into_sequencing_config(self) -> Result<T> {
        self.map_err(|e| SequencingError::config(e.into().to_string()))
    }

    fn into_sequencing_history(self) -> Result<T> {
        self.map_err(|e| SequencingError::history(format!("{:#}", e.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SequencingError::no_starting_loop("no transition data");
        assert_eq!(
            err.to_string(),
            "Cannot determine starting loop: no transition data"
        );

        let err = SequencingError::missing_collaborator("history source");
        assert!(err.to_string().contains("history source"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(SequencingError::no_starting_loop("empty").is_recoverable());
        assert!(SequencingError::history("disk gone").is_recoverable());
        assert!(!SequencingError::missing_collaborator("history source").is_recoverable());
    }

    #[test]
    fn test_is_configuration() {
        assert!(SequencingError::config("bad").is_configuration());
        assert!(SequencingError::invalid_config("decayFactor", "must be > 0").is_configuration());
        assert!(SequencingError::missing_collaborator("history source").is_configuration());
        assert!(!SequencingError::history("x").is_configuration());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SequencingError::no_starting_loop("x").exit_code(), 3);
        assert_eq!(SequencingError::history("x").exit_code(), 4);
        assert_eq!(
            SequencingError::UnknownLine { id: "x".into() }.exit_code(),
            5
        );
        assert_eq!(SequencingError::config("x").exit_code(), 7);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/project/.loopline/settings.json");
        let err = SequencingError::config_with_path("failed to parse", path.clone());
        if let SequencingError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_into_sequencing_history() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "runs.jsonl missing",
        ));
        let err = result.into_sequencing_history().unwrap_err();
        if let SequencingError::History { message } = err {
            assert!(message.contains("runs.jsonl missing"));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_into_sequencing_config() {
        let result: std::result::Result<(), anyhow::Error> = Err(anyhow::anyhow!("bad json"));
        let err = result.into_sequencing_config().unwrap_err();
        assert!(matches!(err, SequencingError::Config { .. }));
    }
}
