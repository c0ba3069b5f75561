//! Core exploration data structures for Trellis.
//!
//! A [`StateDescription`] is one point of a transition system, keyed by
//! field name. Discovered states live in the append-only [`StateStore`],
//! which hands out gapless numeric ids and remembers the first route used
//! to reach every node. The user's walk through the store is an
//! [`ExplorationPath`]: a committed prefix plus a provisional suffix that
//! can be rolled back exactly.

pub mod dot;
pub mod error;
pub mod fingerprint;
pub mod path;
pub mod render;
pub mod state;
pub mod store;

pub use dot::{dot_document, edge_list, DotStyle};
pub use error::CoreError;
pub use fingerprint::Fingerprint;
pub use path::{ExplorationPath, PathEntry};
pub use state::{FieldDecl, StateDescription, StateSchema};
pub use store::{GraphNode, NodeId, StateStore, Step};
