//! What a model variant can do beyond plain stepping.
//!
//! Plain models step, run to breakpoints, and browse alternatives.
//! Statechart models additionally know their transitions by name, so a
//! transition can be forced, and they can draw their control-state hierarchy.

use std::fmt;

use crate::error::SessionError;
use crate::hierarchy::{canonical_name, ControlHierarchy};

/// Optional features of a model variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_force: bool,
    pub supports_hierarchy_rendering: bool,
}

/// Variant-specific behaviour plugged into a session.
pub trait ModelVariant: fmt::Debug {
    fn capabilities(&self) -> Capabilities;

    /// The canonical name of transition `name`, if the model declares it.
    fn resolve_transition(&self, name: &str) -> Option<String>;

    /// A DOT rendering of the control states, with `active` highlighted.
    fn render_hierarchy(&self, active: &[String]) -> Option<String>;
}

/// A model with no control-state structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainModel;

impl ModelVariant for PlainModel {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn resolve_transition(&self, _name: &str) -> Option<String> {
        None
    }

    fn render_hierarchy(&self, _active: &[String]) -> Option<String> {
        None
    }
}

/// A statechart model described by its control-state hierarchy.
#[derive(Debug, Clone)]
pub struct StatechartModel {
    hierarchy: ControlHierarchy,
}

impl StatechartModel {
    pub fn new(hierarchy: ControlHierarchy) -> Result<Self, SessionError> {
        hierarchy.validate()?;
        Ok(Self { hierarchy })
    }

    pub fn hierarchy(&self) -> &ControlHierarchy {
        &self.hierarchy
    }
}

impl ModelVariant for StatechartModel {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_force: true,
            supports_hierarchy_rendering: true,
        }
    }

    fn resolve_transition(&self, name: &str) -> Option<String> {
        let wanted = canonical_name(name);
        self.hierarchy
            .transition_names()
            .map(canonical_name)
            .find(|t| *t == wanted)
    }

    fn render_hierarchy(&self, active: &[String]) -> Option<String> {
        Some(self.hierarchy.to_dot(active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyTransition;
    use std::collections::BTreeMap;

    fn statechart() -> StatechartModel {
        let mut children = BTreeMap::new();
        children.insert("Root".to_string(), vec!["Root/A".to_string(), "Root/B".to_string()]);
        StatechartModel::new(ControlHierarchy {
            root: "Root".into(),
            children,
            and_states: Default::default(),
            transitions: vec![HierarchyTransition {
                name: "Root/t1".into(),
                source: "Root/A".into(),
                target: "Root/B".into(),
            }],
        })
        .unwrap()
    }

    #[test]
    fn plain_model_has_no_extras() {
        let plain = PlainModel;
        assert_eq!(plain.capabilities(), Capabilities::default());
        assert_eq!(plain.resolve_transition("t1"), None);
        assert_eq!(plain.render_hierarchy(&[]), None);
    }

    #[test]
    fn statechart_resolves_either_spelling() {
        let model = statechart();
        assert!(model.capabilities().supports_force);
        assert_eq!(model.resolve_transition("Root/t1").as_deref(), Some("Root_t1"));
        assert_eq!(model.resolve_transition("Root_t1").as_deref(), Some("Root_t1"));
        assert_eq!(model.resolve_transition("Root_t2"), None);
    }

    #[test]
    fn statechart_renders_hierarchy() {
        let dot = statechart().render_hierarchy(&["Root_A".into()]).unwrap();
        assert!(dot.contains("Root_A [label=A, style=filled, fillcolor=yellow]"));
        assert!(dot.contains("Root_A->Root_B [label=Root_t1]"));
    }

    #[test]
    fn invalid_hierarchy_rejected() {
        let err = StatechartModel::new(ControlHierarchy {
            root: "Root".into(),
            children: BTreeMap::new(),
            and_states: Default::default(),
            transitions: vec![HierarchyTransition {
                name: "t".into(),
                source: "Root".into(),
                target: "Elsewhere".into(),
            }],
        })
        .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }
}
