//! Session configuration, read from TOML.
//!
//! ```toml
//! history_length = 5
//! diff_mode = true
//! force_limit = 10
//!
//! [parsing]
//! state_sig = "State"
//! init_predicate = "init"
//!
//! [hierarchy]
//! root = "Root"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use trellis_solver::ParsingConf;

use crate::capability::{ModelVariant, PlainModel, StatechartModel};
use crate::error::SessionError;
use crate::hierarchy::ControlHierarchy;

/// Everything a session needs besides its solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Names of the model's distinguished pieces. A conf embedded in a model
    /// overrides this for that model only.
    pub parsing: ParsingConf,
    /// Predecessors shown by default in a history listing.
    pub history_length: usize,
    /// Show history and display entries as diffs.
    pub diff_mode: bool,
    /// Bound used when a transition is activated by label.
    pub force_limit: usize,
    /// Control-state hierarchy; present for statechart models.
    pub hierarchy: Option<ControlHierarchy>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            parsing: ParsingConf::default(),
            history_length: 5,
            diff_mode: true,
            force_limit: 10,
            hierarchy: None,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The model variant this configuration describes.
    pub fn variant(&self) -> Result<Box<dyn ModelVariant>, SessionError> {
        Ok(match &self.hierarchy {
            Some(h) => Box::new(StatechartModel::new(h.clone())?),
            None => Box::new(PlainModel),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.history_length, 5);
        assert!(config.diff_mode);
        assert_eq!(config.force_limit, 10);
        assert!(!config.variant().unwrap().capabilities().supports_force);
    }

    #[test]
    fn partial_file() {
        let config = SessionConfig::from_toml_str(
            r#"
            force_limit = 3

            [parsing]
            transition_field = "taken"
            "#,
        )
        .unwrap();
        assert_eq!(config.force_limit, 3);
        assert_eq!(config.history_length, 5);
        assert_eq!(config.parsing.transition_field, "taken");
        assert_eq!(config.parsing.state_sig, "State");
    }

    #[test]
    fn hierarchy_makes_a_statechart() {
        let config = SessionConfig::from_toml_str(
            r#"
            [hierarchy]
            root = "Root"
            children = { Root = ["Root/A", "Root/B"] }
            transitions = [{ name = "t", source = "Root/A", target = "Root/B" }]
            "#,
        )
        .unwrap();
        let caps = config.variant().unwrap().capabilities();
        assert!(caps.supports_force && caps.supports_hierarchy_rendering);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trellis.toml");
        std::fs::write(&path, "diff_mode = false\n").unwrap();
        assert!(!SessionConfig::load(&path).unwrap().diff_mode);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(SessionConfig::load(&missing), Err(SessionError::Io(_))));
    }

    #[test]
    fn bad_toml() {
        assert!(matches!(
            SessionConfig::from_toml_str("history_length = \"many\""),
            Err(SessionError::Config(_))
        ));
    }
}
