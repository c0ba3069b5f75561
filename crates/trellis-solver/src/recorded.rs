//! Solutions recorded as a JSON document.
//!
//! This is the interchange format between Trellis and anything that produces
//! solutions outside the process: external solver programs write it to
//! stdout, and a trace file is a document whose first instance is the trace.
//!
//! ```json
//! {
//!   "state_sig": "State",
//!   "fields": [{ "name": "light", "arity": 1 }],
//!   "instances": [
//!     { "state_count": 2, "tuples": { "light": ["State$0->Red$0", "State$1->Green$0"] } }
//!   ]
//! }
//! ```
//!
//! An empty `instances` list means unsatisfiable.
//! An instance may also carry `sigs`, the atoms of each signature by label.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use trellis_core::{FieldDecl, StateDescription};

use crate::bridge::{Solution, SolutionHandle};
use crate::decode::{encode_tuple, ATOM_SEPARATOR};
use crate::error::SolverError;

/// One satisfying instance: a chain of `state_count` states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedInstance {
    pub state_count: usize,
    #[serde(default)]
    pub tuples: BTreeMap<String, Vec<String>>,
    /// Atoms of each signature reachable in the instance, keyed by label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sigs: BTreeMap<String, Vec<String>>,
}

impl RecordedInstance {
    /// Encode a chain of states as field tuples.
    pub fn from_chain(state_sig: &str, fields: &[FieldDecl], chain: &[StateDescription]) -> Self {
        let mut tuples = BTreeMap::new();
        for field in fields {
            let mut column = Vec::new();
            for (index, state) in chain.iter().enumerate() {
                for value in state.values(&field.name).unwrap_or_default() {
                    column.push(encode_tuple(state_sig, index, value));
                }
            }
            tuples.insert(field.name.clone(), column);
        }
        let atoms = (0..chain.len())
            .map(|index| format!("{state_sig}{ATOM_SEPARATOR}{index}"))
            .collect();
        let mut sigs = BTreeMap::new();
        sigs.insert(state_sig.to_string(), atoms);
        Self {
            state_count: chain.len(),
            tuples,
            sigs,
        }
    }
}

/// Every solution to one problem, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSolutions {
    pub state_sig: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub instances: Vec<RecordedInstance>,
}

impl RecordedSolutions {
    /// A document with no instances.
    pub fn unsatisfiable(state_sig: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self {
            state_sig: state_sig.into(),
            fields,
            instances: Vec::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SolverError> {
        serde_json::from_str(text).map_err(|e| SolverError::Format(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SolverError> {
        serde_json::to_string_pretty(self).map_err(|e| SolverError::Format(e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Self, SolverError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn write(&self, path: &Path) -> Result<(), SolverError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// A solution positioned at the first instance.
    pub fn into_handle(self) -> SolutionHandle {
        Rc::new(RecordedSolution {
            doc: Rc::new(self),
            index: 0,
        })
    }
}

/// A cursor over a [`RecordedSolutions`] document.
#[derive(Debug, Clone)]
pub struct RecordedSolution {
    doc: Rc<RecordedSolutions>,
    index: usize,
}

impl RecordedSolution {
    fn instance(&self) -> Result<&RecordedInstance, SolverError> {
        self.doc.instances.get(self.index).ok_or_else(|| {
            SolverError::InternalDecode("unsatisfiable solution has no instance".into())
        })
    }

    fn check_sig(&self, state_sig: &str) -> Result<(), SolverError> {
        if self.doc.state_sig == state_sig {
            Ok(())
        } else {
            Err(SolverError::InternalDecode(format!(
                "signature {state_sig} not found"
            )))
        }
    }
}

impl Solution for RecordedSolution {
    fn satisfiable(&self) -> bool {
        self.index < self.doc.instances.len()
    }

    fn next(&self) -> Result<SolutionHandle, SolverError> {
        let index = self.index + 1;
        if index >= self.doc.instances.len() {
            return Err(SolverError::NoMoreAlternatives);
        }
        Ok(Rc::new(RecordedSolution {
            doc: Rc::clone(&self.doc),
            index,
        }))
    }

    fn state_fields(&self, state_sig: &str) -> Result<Vec<FieldDecl>, SolverError> {
        self.check_sig(state_sig)?;
        Ok(self.doc.fields.clone())
    }

    fn evaluate_field(&self, field: &str) -> Result<Vec<String>, SolverError> {
        if !self.doc.fields.iter().any(|f| f.name == field) {
            return Err(SolverError::InternalDecode(format!("field {field} not found")));
        }
        Ok(self
            .instance()?
            .tuples
            .get(field)
            .cloned()
            .unwrap_or_default())
    }

    fn evaluate_distinguished_variable(&self, state_sig: &str) -> Result<usize, SolverError> {
        self.check_sig(state_sig)?;
        Ok(self.instance()?.state_count)
    }

    fn reachable_sigs(&self) -> Result<Vec<String>, SolverError> {
        Ok(self.instance()?.sigs.keys().cloned().collect())
    }

    fn evaluate_sig(&self, sig: &str) -> Result<Vec<String>, SolverError> {
        self.instance()?
            .sigs
            .get(sig)
            .cloned()
            .ok_or_else(|| SolverError::InternalDecode(format!("signature {sig} not found")))
    }
}
