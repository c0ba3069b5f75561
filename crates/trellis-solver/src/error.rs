//! Error types for the solver bridge.

/// Errors raised while composing, compiling, solving, or decoding.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("compile error: {0}")]
    Compile(String),

    #[error("solver failure: {0}")]
    Solve(String),

    #[error("no more alternative solutions")]
    NoMoreAlternatives,

    #[error("internal decode error: {0}")]
    InternalDecode(String),

    #[error("predicate {0} not found")]
    MissingPredicate(String),

    #[error("issue parsing predicate {0}: unbalanced block markers")]
    UnbalancedBlock(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid solution document: {0}")]
    Format(String),
}
