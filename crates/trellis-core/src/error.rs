//! Error types for the core data structures.

use crate::store::NodeId;

/// Errors from the state store and exploration path.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("state S{0} not found")]
    NodeNotFound(NodeId),

    #[error("index {index} out of range for a store of {size} states")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("cannot append an empty chain")]
    EmptyChain,

    #[error("end of trace reached: cannot advance {steps} from position {position} (last is {last})")]
    TraceExhausted {
        position: usize,
        steps: usize,
        last: usize,
    },
}
