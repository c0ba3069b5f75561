//! Parsing configuration: the names of the model's distinguished pieces.
//!
//! A conf can come from a TOML file, or be embedded in the model text between
//! `BEGIN_TRELLIS_CONF` and `END_TRELLIS_CONF` (normally inside a block
//! comment), in which case it applies to that model only.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Opens an embedded configuration block.
pub const CONF_BEGIN: &str = "BEGIN_TRELLIS_CONF";
/// Closes an embedded configuration block.
pub const CONF_END: &str = "END_TRELLIS_CONF";

/// Names the state signature, the predicates, and special fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConf {
    /// Signature whose atoms are the states of a trace.
    pub state_sig: String,
    /// Initializer predicate, `pred <init>[s: State] { ... }`.
    pub init_predicate: String,
    /// Transition relation, `pred <next>[s, s': State] { ... }`.
    pub transition_relation: String,
    /// Field holding the name of the transition taken into a state.
    pub transition_field: String,
    /// Field holding the active control states (statechart models).
    pub control_state_field: String,
    /// Field marking a state as stable.
    pub stable_field: String,
    /// Value of `stable_field` that means stable.
    pub stable_true_value: String,
    /// Extra concrete atoms to generate per signature.
    pub additional_sig_scopes: BTreeMap<String, usize>,
}

impl Default for ParsingConf {
    fn default() -> Self {
        Self {
            state_sig: "State".to_string(),
            init_predicate: "init".to_string(),
            transition_relation: "next".to_string(),
            transition_field: "transTaken".to_string(),
            control_state_field: "conf".to_string(),
            stable_field: "stable".to_string(),
            stable_true_value: "true".to_string(),
            additional_sig_scopes: BTreeMap::new(),
        }
    }
}

impl ParsingConf {
    /// Parse a conf from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, SolverError> {
        toml::from_str(text).map_err(|e| SolverError::Config(e.to_string()))
    }

    /// Read and parse a TOML conf file.
    pub fn load(path: &Path) -> Result<Self, SolverError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The conf embedded in a model text, if any.
    pub fn embedded(model_text: &str) -> Result<Option<Self>, SolverError> {
        let Some(begin) = model_text.find(CONF_BEGIN) else {
            return Ok(None);
        };
        let body_start = begin + CONF_BEGIN.len();
        let Some(len) = model_text[body_start..].find(CONF_END) else {
            return Err(SolverError::Config(format!("{CONF_BEGIN} without {CONF_END}")));
        };
        let body = model_text[body_start..body_start + len].trim();
        if body.is_empty() {
            return Ok(None);
        }
        Self::from_toml_str(body).map(Some)
    }
}
