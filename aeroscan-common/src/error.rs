//! Common error types for AeroScan

use thiserror::Error;

/// Common result type for AeroScan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across AeroScan services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed user input rejected at the boundary
    /// (bad metadata field, disallowed upload extension, unknown filter value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Defect generation produced a degenerate (empty) data set
    #[error("Generation failure: {0}")]
    GenerationFailure(String),

    /// Workflow action requested from a step that does not offer it
    #[error("Action '{action}' is not available at step {from}")]
    InvalidTransition {
        /// Step number the session was in
        from: u8,
        /// Name of the rejected action
        action: String,
    },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_names_step_and_action() {
        let err = Error::InvalidTransition {
            from: 1,
            action: "confirm_results".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Action 'confirm_results' is not available at step 1"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
