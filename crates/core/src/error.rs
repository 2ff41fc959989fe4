//! Query-side error model.

use thiserror::Error;

/// Boxed cause carried by persistence failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used across the projection layer.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error raised while projecting an event into the read model.
///
/// Every variant renders exactly the operator-facing message it was built with,
/// so callers that only log the error see the same text regardless of the kind.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A parent document could not be found by id.
    #[error("{0}")]
    NotFound(String),

    /// The variables bucket for a type is absent or empty on the parent document.
    #[error("{0}")]
    MissingVariables(String),

    /// A bucket exists but holds no variable with the requested name.
    #[error("{0}")]
    VariableNotFound(String),

    /// The document store rejected a read or a write.
    #[error("{message}")]
    Persistence {
        message: String,
        #[source]
        source: BoxError,
    },

    /// A handler was given an event it is not registered for.
    #[error("{handler} cannot handle event {found}")]
    UnexpectedEvent {
        handler: &'static str,
        found: String,
    },
}

impl QueryError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn missing_variables(msg: impl Into<String>) -> Self {
        Self::MissingVariables(msg.into())
    }

    pub fn variable_not_found(msg: impl Into<String>) -> Self {
        Self::VariableNotFound(msg.into())
    }

    pub fn persistence(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Persistence {
            message: msg.into(),
            source: source.into(),
        }
    }

    pub fn unexpected_event(handler: &'static str, found: impl Into<String>) -> Self {
        Self::UnexpectedEvent {
            handler,
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn message_variants_render_the_given_text() {
        let err = QueryError::not_found("Unable to find task with id: T1");
        assert_eq!(err.to_string(), "Unable to find task with id: T1");

        let err = QueryError::missing_variables("Unable to find variables for type: string");
        assert_eq!(err.to_string(), "Unable to find variables for type: string");
    }

    #[test]
    fn persistence_keeps_its_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = QueryError::persistence("Unable to update variable with name: var", cause);

        assert_eq!(err.to_string(), "Unable to update variable with name: var");
        let source = err.source().expect("cause should be kept");
        assert_eq!(source.to_string(), "connection reset");
    }
}
