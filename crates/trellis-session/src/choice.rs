//! The choice-point stack.
//!
//! Holds the solutions whose alternatives the user is browsing. The bottom
//! entry is the solution that produced the current provisional tail; each
//! forward alternative is pushed on top of it. Every mutating call returns
//! the new top.

use trellis_solver::SolutionHandle;

use crate::error::SessionError;

#[derive(Debug, Clone, Default)]
pub struct ChoiceStack {
    entries: Vec<SolutionHandle>,
}

impl ChoiceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&SolutionHandle> {
        self.entries.last()
    }

    /// The entry a reverse selection would return to.
    pub fn previous(&self) -> Option<&SolutionHandle> {
        self.entries.len().checked_sub(2).map(|i| &self.entries[i])
    }

    /// Drop everything and keep only `solution`.
    pub fn reset(&mut self, solution: SolutionHandle) -> &SolutionHandle {
        self.entries.clear();
        self.push(solution)
    }

    pub fn push(&mut self, solution: SolutionHandle) -> &SolutionHandle {
        self.entries.push(solution);
        &self.entries[self.entries.len() - 1]
    }

    /// Pop the top entry. At least one entry is always kept.
    pub fn pop(&mut self) -> Result<&SolutionHandle, SessionError> {
        if self.entries.len() < 2 {
            return Err(SessionError::ExhaustedAlternatives(
                "no previous alternative".into(),
            ));
        }
        self.entries.pop();
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
