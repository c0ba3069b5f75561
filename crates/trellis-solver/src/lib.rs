//! Solver side of Trellis.
//!
//! The exploration core never solves anything itself. It composes a model
//! text (base model + resumption state + goal + bound), hands it to a
//! [`SolverBridge`], and decodes the returned [`Solution`] into a chain of
//! state descriptions. This crate holds that protocol and two backends:
//!
//! - [`ExplicitSolver`]: a deterministic explicit-state engine over a finite,
//!   declared transition system. It reads back the composed text.
//! - [`ProcessSolver`]: runs an external solver program on a scratch copy of
//!   the composed model and reads a [`RecordedSolutions`] document from it.

pub mod bridge;
pub mod compose;
pub mod condition;
pub mod conf;
pub mod decode;
pub mod error;
pub mod explicit;
pub mod external;
pub mod model;
pub mod recorded;

pub use bridge::{Solution, SolutionHandle, SolverBridge};
pub use compose::{compose, Goal};
pub use condition::Condition;
pub use conf::ParsingConf;
pub use decode::{decode_chain, evaluate_scopes};
pub use error::SolverError;
pub use explicit::{ExplicitSolver, ExplicitSystem};
pub use external::ProcessSolver;
pub use model::ModelText;
pub use recorded::{RecordedInstance, RecordedSolution, RecordedSolutions};
