//! Interactive exploration of a transition system through a constraint solver.
//!
//! A [`Session`] owns the state store, the exploration path, and the stack of
//! solver solutions whose alternatives can still be browsed. Every operation
//! either succeeds completely or leaves all three untouched.
//!
//! ```ignore
//! let solver = ExplicitSolver::new(system, ParsingConf::default())?;
//! let mut session = Session::new(solver, SessionConfig::default())?;
//! session.initialize_model(MODEL)?;
//! session.step(2, &[])?;
//! session.select_alternate_path(false)?;
//! println!("{}", session.current_display()?);
//! ```

pub mod breakpoints;
pub mod capability;
pub mod choice;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod session;

pub use breakpoints::Breakpoints;
pub use capability::{Capabilities, ModelVariant, PlainModel, StatechartModel};
pub use choice::ChoiceStack;
pub use config::SessionConfig;
pub use error::SessionError;
pub use hierarchy::{ControlHierarchy, HierarchyTransition};
pub use session::Session;
