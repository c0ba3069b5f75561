//! Human-readable renderings of stored states.
//!
//! Every rendering starts on a fresh line so a caller can concatenate them.

use crate::state::{StateDescription, BLOCK_INITIALIZER, BLOCK_TERMINATOR};
use crate::store::NodeId;

/// Returned by [`property`] when the field does not exist.
pub const PROPERTY_NOT_FOUND: &str = "Property not found.";

/// A full state under its id.
pub fn node(id: NodeId, state: &StateDescription) -> String {
    format!("\nS{id}\n----{}", state.state_string())
}

/// A state in a history listing, `age` steps behind the cursor.
pub fn history_entry(id: NodeId, state: &StateDescription, age: usize) -> String {
    format!("\nS{id} (-{age})\n---------{}", state.state_string())
}

/// What changed between `before` and `after`.
pub fn diff(
    before_id: NodeId,
    before: &StateDescription,
    after_id: NodeId,
    after: &StateDescription,
) -> String {
    format!(
        "\nS{before_id} -> S{after_id}\n------------{}",
        after.diff_against(before)
    )
}

/// A diff in a history listing.
pub fn history_diff(
    before_id: NodeId,
    before: &StateDescription,
    after_id: NodeId,
    after: &StateDescription,
    age: usize,
) -> String {
    format!(
        "\nS{before_id} -> S{after_id} (-{age})\n-----------------{}",
        after.diff_against(before)
    )
}

/// The values of a single field.
pub fn property(state: &StateDescription, field: &str) -> String {
    match state.values(field) {
        Some(values) => format!(
            "\n{BLOCK_INITIALIZER} {} {BLOCK_TERMINATOR}\n",
            values.join(", ")
        ),
        None => PROPERTY_NOT_FOUND.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FieldDecl, StateSchema};

    fn light(value: &str) -> StateDescription {
        let schema = StateSchema::new(vec![FieldDecl::new("light", 1), FieldDecl::new("n", 1)]);
        let mut s = StateDescription::new(&schema);
        s.add_value("light", value);
        s.add_value("n", "1");
        s
    }

    #[test]
    fn node_header_and_fields() {
        let text = node(3, &light("Red"));
        assert_eq!(text, "\nS3\n----\nlight: { Red }\nn: { 1 }\n");
    }

    #[test]
    fn empty_state_has_header_only() {
        let text = node(1, &StateDescription::default());
        assert_eq!(text, "\nS1\n----\n");
    }

    #[test]
    fn diff_shows_changed_fields() {
        let text = diff(1, &light("Red"), 2, &light("Green"));
        assert!(text.starts_with("\nS1 -> S2\n"));
        assert!(text.contains("light: { Green }"));
        assert!(!text.contains("n: "));
    }

    #[test]
    fn property_lookup() {
        assert_eq!(property(&light("Red"), "light"), "\n{ Red }\n");
        assert_eq!(property(&light("Red"), "colour"), PROPERTY_NOT_FOUND);
    }
}
