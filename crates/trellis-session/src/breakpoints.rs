//! Breakpoint registry used by `until`.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Constraints that stop an `until` run when any of them holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    constraints: Vec<String>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint and return its index.
    pub fn add(&mut self, constraint: impl Into<String>) -> usize {
        self.constraints.push(constraint.into());
        self.constraints.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Result<String, SessionError> {
        if index >= self.constraints.len() {
            return Err(SessionError::NotFound(format!("breakpoint {index}")));
        }
        Ok(self.constraints.remove(index))
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
    }

    pub fn list(&self) -> &[String] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}
