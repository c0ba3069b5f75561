//! The protocol between the explorer and a constraint-solving backend.

use std::fmt;
use std::rc::Rc;

use trellis_core::FieldDecl;

use crate::error::SolverError;

/// A solution shared between the session and its choice-point stack.
pub type SolutionHandle = Rc<dyn Solution>;

/// One answer from the solver, possibly unsatisfiable.
///
/// A satisfiable solution describes a chain of states `State$0 .. State$k`.
/// Field values come back as tuples of the form `State$i->A$0->B$0`.
pub trait Solution: fmt::Debug {
    fn satisfiable(&self) -> bool;

    /// The next distinct solution to the same problem.
    ///
    /// Fails with [`SolverError::NoMoreAlternatives`] once enumeration is done.
    fn next(&self) -> Result<SolutionHandle, SolverError>;

    /// Fields declared on the state signature `state_sig`.
    fn state_fields(&self, state_sig: &str) -> Result<Vec<FieldDecl>, SolverError>;

    /// Every tuple of `field` in this solution.
    fn evaluate_field(&self, field: &str) -> Result<Vec<String>, SolverError>;

    /// Number of `state_sig` atoms in this solution (the chain length).
    fn evaluate_distinguished_variable(&self, state_sig: &str) -> Result<usize, SolverError>;

    /// Labels of every signature with atoms in this solution, as the
    /// backend names them (possibly `this/`-qualified).
    fn reachable_sigs(&self) -> Result<Vec<String>, SolverError>;

    /// The atoms of signature `sig`.
    fn evaluate_sig(&self, sig: &str) -> Result<Vec<String>, SolverError>;
}

/// A backend that compiles composed model texts and solves them.
pub trait SolverBridge {
    /// Backend-specific compiled form of a model text.
    type Compiled;

    fn compile(&mut self, model_text: &str) -> Result<Self::Compiled, SolverError>;

    fn solve(&mut self, model: &Self::Compiled) -> Result<SolutionHandle, SolverError>;

    /// Compile and solve in one go.
    fn run(&mut self, model_text: &str) -> Result<SolutionHandle, SolverError> {
        let compiled = self.compile(model_text)?;
        self.solve(&compiled)
    }
}
