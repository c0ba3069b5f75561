//! Graphviz rendering of the state store.
//!
//! The edge list is what a visualizer consumes: one DOT statement per line,
//! without the surrounding `digraph` block. [`dot_document`] wraps it.

use crate::store::{NodeId, StateStore};

/// Optional node styling.
#[derive(Debug, Clone, Default)]
pub struct DotStyle {
    /// Field that marks a state as stable. Nodes carrying the field are
    /// coloured green when it holds `stable_value`, red otherwise.
    pub stable_field: Option<String>,
    pub stable_value: String,
}

/// One DOT statement per edge (or per isolated node), followed by colouring
/// and the highlight for `current`.
pub fn edge_list(store: &StateStore, current: Option<NodeId>, style: &DotStyle) -> Vec<String> {
    let mut lines = Vec::new();
    for node in store.nodes() {
        let id = node.id();
        if node.steps().is_empty() {
            lines.push(format!("S{id}"));
        }
        for step in node.steps() {
            match &step.label {
                Some(label) => lines.push(format!("S{id} -> S{}[label=\"{label}\"]", step.target)),
                None => lines.push(format!("S{id} -> S{}", step.target)),
            }
        }
        if let Some(field) = style.stable_field.as_deref() {
            if let Some(values) = node.state().values(field) {
                let colour = if values.iter().any(|v| *v == style.stable_value) {
                    "green"
                } else {
                    "red"
                };
                lines.push(format!("S{id}[color={colour}]"));
            }
        }
    }
    if let Some(id) = current {
        lines.push(format!("S{id}[style=filled, fillcolor=yellow]"));
    }
    lines
}

/// Wrap statements in a `digraph G { ... }` block.
pub fn dot_document(lines: &[String]) -> String {
    let mut out = String::from("digraph G {\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("}\n");
    out
}
