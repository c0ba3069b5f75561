//! Control-state hierarchy of a statechart model and its DOT rendering.
//!
//! States are named by their full path (`Root/Traffic/Red`); in rendered
//! output `/` becomes `_` and a node's label is the last segment.
//! Composite states, and leaves above the deepest level, are drawn as
//! clusters so transitions can attach to them with `ltail`/`lhead`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// A transition between two control states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyTransition {
    pub name: String,
    pub source: String,
    pub target: String,
}

/// The tree of control states plus the transitions between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlHierarchy {
    pub root: String,
    /// Immediate children, in declaration order.
    #[serde(default)]
    pub children: BTreeMap<String, Vec<String>>,
    /// Concurrent ("and") states.
    #[serde(default)]
    pub and_states: BTreeSet<String>,
    #[serde(default)]
    pub transitions: Vec<HierarchyTransition>,
}

/// `/` replaced with `_`, the form used in rendered output and labels.
pub fn canonical_name(name: &str) -> String {
    name.replace('/', "_")
}

fn short_label(canonical: &str) -> &str {
    canonical.rsplit('_').next().unwrap_or(canonical)
}

impl ControlHierarchy {
    /// Check that the hierarchy is a tree rooted at `root` and that every
    /// transition connects known states.
    pub fn validate(&self) -> Result<(), SessionError> {
        let mut seen = BTreeSet::new();
        seen.insert(self.root.as_str());
        for (parent, kids) in &self.children {
            for kid in kids {
                if !seen.insert(kid.as_str()) {
                    return Err(SessionError::Config(format!(
                        "state {kid} appears twice in the hierarchy (under {parent})"
                    )));
                }
            }
        }
        let reachable: BTreeSet<&str> = self.states().into_iter().collect();
        if let Some(stray) = seen.iter().find(|s| !reachable.contains(*s)) {
            return Err(SessionError::Config(format!(
                "state {stray} is not reachable from {}",
                self.root
            )));
        }
        for t in &self.transitions {
            for end in [&t.source, &t.target] {
                if !reachable.contains(end.as_str()) {
                    return Err(SessionError::Config(format!(
                        "transition {} refers to unknown state {end}",
                        t.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn children_of(&self, state: &str) -> &[String] {
        self.children.get(state).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_leaf(&self, state: &str) -> bool {
        self.children_of(state).is_empty()
    }

    /// Every state, depth-first from the root.
    pub fn states(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self.root.as_str()];
        while let Some(state) = stack.pop() {
            if out.contains(&state) {
                continue;
            }
            out.push(state);
            for kid in self.children_of(state).iter().rev() {
                stack.push(kid);
            }
        }
        out
    }

    /// Depth of `state`, the root being at depth 1.
    pub fn depth_of(&self, state: &str) -> Option<usize> {
        fn walk(h: &ControlHierarchy, at: &str, target: &str, depth: usize) -> Option<usize> {
            if at == target {
                return Some(depth);
            }
            h.children_of(at)
                .iter()
                .find_map(|kid| walk(h, kid, target, depth + 1))
        }
        walk(self, &self.root, state, 1)
    }

    /// Depth of the deepest state.
    pub fn max_depth(&self) -> usize {
        self.states()
            .into_iter()
            .filter_map(|s| self.depth_of(s))
            .max()
            .unwrap_or(0)
    }

    pub fn transition_names(&self) -> impl Iterator<Item = &str> {
        self.transitions.iter().map(|t| t.name.as_str())
    }

    fn is_cluster(&self, state: &str, max_depth: usize) -> bool {
        !self.is_leaf(state) || self.depth_of(state) != Some(max_depth)
    }

    /// Render the hierarchy as a DOT document, highlighting `active`
    /// (canonical names of the active control states).
    pub fn to_dot(&self, active: &[String]) -> String {
        let max_depth = self.max_depth();
        let mut lines = vec!["digraph G {".to_string(), "compound=true".to_string()];
        self.push_state(&self.root, max_depth, active, &mut lines);

        for t in &self.transitions {
            let name = canonical_name(&t.name);
            let source = canonical_name(&t.source);
            let target = canonical_name(&t.target);
            let mut attrs = vec![format!("label={name}")];
            if self.is_cluster(&t.source, max_depth) {
                attrs.push(format!("ltail=cluster_{source}"));
            }
            let head = if self.is_cluster(&t.target, max_depth) {
                attrs.push(format!("lhead=cluster_{target}"));
                format!("{target}_other_side")
            } else {
                target
            };
            lines.push(format!("{source}->{head} [{}]", attrs.join(",")));
        }
        lines.push("}".to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn push_state(&self, state: &str, max_depth: usize, active: &[String], lines: &mut Vec<String>) {
        let name = canonical_name(state);
        let label = short_label(&name);
        let highlighted = active.iter().any(|a| *a == name);
        let cluster = self.is_cluster(state, max_depth);
        let is_root = state == self.root;

        if cluster {
            lines.push(format!("subgraph cluster_{name} {{"));
            if is_root {
                lines.push(format!("label={name}"));
            } else {
                if highlighted {
                    lines.push("style=filled".to_string());
                    lines.push("fillcolor=yellow".to_string());
                }
                lines.push(format!("label={label}"));
                lines.push(format!("{name} [style=invis,shape=point,penwidth=0]"));
            }
            if self.and_states.contains(state) {
                lines.push("style=dashed".to_string());
            }
        } else if highlighted {
            lines.push(format!("{name} [label={label}, style=filled, fillcolor=yellow]"));
        } else {
            lines.push(format!("{name} [label={label}]"));
        }

        for kid in self.children_of(state) {
            self.push_state(kid, max_depth, active, lines);
        }

        if cluster {
            if !is_root {
                lines.push(format!("{name}_other_side [style=invis,shape=point,penwidth=0]"));
            }
            lines.push("}".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traffic() -> ControlHierarchy {
        toml::from_str(
            r#"
            root = "Root"
            and_states = ["Root/Lights"]

            [children]
            Root = ["Root/Lights", "Root/Off"]
            "Root/Lights" = ["Root/Lights/Red", "Root/Lights/Green"]

            [[transitions]]
            name = "Root/Lights/go"
            source = "Root/Lights/Red"
            target = "Root/Lights/Green"

            [[transitions]]
            name = "Root/shutdown"
            source = "Root/Lights"
            target = "Root/Off"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn depths() {
        let h = traffic();
        assert_eq!(h.depth_of("Root"), Some(1));
        assert_eq!(h.depth_of("Root/Lights/Red"), Some(3));
        assert_eq!(h.depth_of("Nowhere"), None);
        assert_eq!(h.max_depth(), 3);
        assert_eq!(
            h.states(),
            ["Root", "Root/Lights", "Root/Lights/Red", "Root/Lights/Green", "Root/Off"]
        );
    }

    #[test]
    fn validates() {
        let h = traffic();
        assert!(h.validate().is_ok());

        let mut bad = traffic();
        bad.transitions[0].target = "Root/Blue".into();
        assert!(matches!(bad.validate(), Err(SessionError::Config(_))));

        let mut twice = traffic();
        twice
            .children
            .get_mut("Root")
            .unwrap()
            .push("Root/Lights/Red".into());
        assert!(matches!(twice.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn dot_clusters_and_highlights() {
        let h = traffic();
        let dot = h.to_dot(&["Root_Lights_Red".to_string()]);
        assert!(dot.starts_with("digraph G {\ncompound=true\n"));
        assert!(dot.contains("subgraph cluster_Root {\nlabel=Root\n"));
        assert!(dot.contains("subgraph cluster_Root_Lights {\nlabel=Lights\n"));
        assert!(dot.contains("style=dashed"));
        assert!(dot.contains("Root_Lights_Red [label=Red, style=filled, fillcolor=yellow]"));
        assert!(dot.contains("Root_Lights_Green [label=Green]"));
        // Off is a leaf above the deepest level, so it is a cluster too.
        assert!(dot.contains("subgraph cluster_Root_Off {"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn dot_transitions() {
        let dot = traffic().to_dot(&[]);
        assert!(dot.contains("Root_Lights_Red->Root_Lights_Green [label=Root_Lights_go]"));
        assert!(dot.contains(
            "Root_Lights->Root_Off_other_side [label=Root_shutdown,ltail=cluster_Root_Lights,lhead=cluster_Root_Off]"
        ));
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_name("Root/A/b"), "Root_A_b");
        assert_eq!(short_label("Root_A_b"), "b");
    }
}
