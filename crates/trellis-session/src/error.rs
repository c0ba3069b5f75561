//! Error types for exploration sessions.

use trellis_core::{CoreError, NodeId};
use trellis_solver::SolverError;

/// Errors reported by session operations.
///
/// A failed operation never leaves the store, the path, or the choice-point
/// stack partially updated.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("compile error: {0}")]
    Compile(String),

    #[error("solver failure: {0}")]
    Solve(String),

    #[error("unsatisfiable: {0}")]
    Unsatisfiable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    ExhaustedAlternatives(String),

    #[error("internal decode error: {0}")]
    InternalDecode(String),

    #[error("no model or trace loaded")]
    NotInitialized,

    #[error("{0} is not available while replaying a trace")]
    TraceMode(&'static str),

    #[error("{0}")]
    TraceExhausted(String),

    #[error("{0} is not supported by this model")]
    Unsupported(&'static str),

    #[error("unknown transition {0}")]
    UnknownTransition(String),

    #[error("invalid bound: {0}")]
    InvalidBound(String),

    #[error("no breakpoints set")]
    NoBreakpoints,

    #[error("state S{0} has no recorded route")]
    NoRoute(NodeId),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<SolverError> for SessionError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Io(e) => SessionError::Io(e),
            SolverError::Compile(msg) => SessionError::Compile(msg),
            SolverError::Solve(msg) => SessionError::Solve(msg),
            SolverError::NoMoreAlternatives => {
                SessionError::ExhaustedAlternatives("no more alternative paths".into())
            }
            SolverError::InternalDecode(msg) | SolverError::Format(msg) => {
                SessionError::InternalDecode(msg)
            }
            e @ (SolverError::MissingPredicate(_) | SolverError::UnbalancedBlock(_)) => {
                SessionError::Compile(e.to_string())
            }
            SolverError::Config(msg) => SessionError::Config(msg),
        }
    }
}

impl From<CoreError> for SessionError {
    fn from(err: CoreError) -> Self {
        match err {
            e @ (CoreError::NodeNotFound(_) | CoreError::IndexOutOfRange { .. }) => {
                SessionError::NotFound(e.to_string())
            }
            e @ CoreError::TraceExhausted { .. } => SessionError::TraceExhausted(e.to_string()),
            e @ CoreError::EmptyChain => SessionError::InternalDecode(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_errors_map_into_taxonomy() {
        let err: SessionError = SolverError::MissingPredicate("init".into()).into();
        assert!(matches!(&err, SessionError::Compile(msg) if msg.contains("init")));

        let err: SessionError = SolverError::NoMoreAlternatives.into();
        assert!(matches!(err, SessionError::ExhaustedAlternatives(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SessionError = SolverError::Io(io).into();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[test]
    fn core_errors_map_into_taxonomy() {
        let err: SessionError = CoreError::NodeNotFound(9).into();
        assert_eq!(err.to_string(), "not found: state S9 not found");

        let err: SessionError = CoreError::TraceExhausted {
            position: 1,
            steps: 3,
            last: 2,
        }
        .into();
        assert!(matches!(err, SessionError::TraceExhausted(_)));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            SessionError::TraceMode("until").to_string(),
            "until is not available while replaying a trace"
        );
        assert_eq!(SessionError::NoRoute(4).to_string(), "state S4 has no recorded route");
    }
}
