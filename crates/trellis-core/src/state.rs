//! State descriptions: the content of one point in a transition system.
//!
//! A description maps every field of the state signature to a sorted list of
//! value strings. Equality is structural over that map only; the numeric id a
//! node receives in the store is not part of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// Opens a value block in rendered and serialized output.
pub const BLOCK_INITIALIZER: &str = "{";
/// Closes a value block.
pub const BLOCK_TERMINATOR: &str = "}";
/// Separates the columns of a multi-arity value, e.g. `A->B`.
pub const SET_DELIMITER: &str = "->";
/// Set union in serialized constraints.
pub const PLUS: &str = "+";
/// The empty unary relation.
pub const EMPTY_RELATION: &str = "none";

/// A field of the state signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    /// Arity of the field's value (1 for sets of atoms, 2 for binary relations, ...).
    #[serde(default = "default_arity")]
    pub arity: usize,
}

fn default_arity() -> usize {
    1
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity: arity.max(1),
        }
    }

    /// `none`, `none -> none`, ... matching this field's arity.
    pub fn empty_relation(&self) -> String {
        vec![EMPTY_RELATION; self.arity.max(1)].join(" -> ")
    }
}

/// The fields a state signature declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    pub fields: Vec<FieldDecl>,
}

impl StateSchema {
    pub fn new(fields: Vec<FieldDecl>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Content record of one state, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateDescription {
    fields: BTreeMap<String, Vec<String>>,
}

impl StateDescription {
    /// An empty description with one (empty) entry per schema field.
    pub fn new(schema: &StateSchema) -> Self {
        Self {
            fields: schema
                .fields
                .iter()
                .map(|f| (f.name.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Build a description from a prepared map. Values are inserted one by
    /// one so each field ends up sorted.
    pub fn from_fields(fields: BTreeMap<String, Vec<String>>) -> Self {
        let mut desc = Self {
            fields: fields.keys().map(|k| (k.clone(), Vec::new())).collect(),
        };
        for (name, values) in fields {
            for value in values {
                desc.add_value(&name, value);
            }
        }
        desc
    }

    /// Insert `value` into `field`, keeping the field sorted.
    ///
    /// Unknown fields are ignored.
    pub fn add_value(&mut self, field: &str, value: impl Into<String>) {
        let Some(values) = self.fields.get_mut(field) else {
            return;
        };
        let value = value.into();
        let at = values.partition_point(|v| v.as_str() < value.as_str());
        values.insert(at, value);
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn values(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// True when the description has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_fields(&self.fields)
    }

    /// Fields whose values differ from `other`'s. Fields missing from
    /// `other` are skipped.
    pub fn changed_fields<'a>(
        &'a self,
        other: &'a StateDescription,
    ) -> impl Iterator<Item = (&'a str, &'a [String])> + 'a {
        self.fields.iter().filter_map(move |(name, values)| {
            let theirs = other.fields.get(name)?;
            (theirs != values).then_some((name.as_str(), values.as_slice()))
        })
    }

    /// Render only the fields that differ from `other`, one per line.
    pub fn diff_against(&self, other: &StateDescription) -> String {
        let mut out = String::new();
        for (name, values) in self.changed_fields(other) {
            out.push_str(&field_line(name, values));
        }
        out.push('\n');
        out
    }

    /// Render every field, one per line.
    pub fn state_string(&self) -> String {
        let mut out = String::new();
        for (name, values) in &self.fields {
            out.push_str(&field_line(name, values));
        }
        out.push('\n');
        out
    }

    /// A predicate asserting that the state variable equals exactly this
    /// description:
    ///
    /// ```text
    /// pred init[s: State] {
    ///     s.light = Red
    ///     s.queue = none -> none
    /// }
    /// ```
    pub fn serialize_as_constraint(
        &self,
        schema: &StateSchema,
        predicate: &str,
        state_sig: &str,
    ) -> String {
        let mut body = String::new();
        for (name, values) in &self.fields {
            let value = if values.is_empty() {
                schema
                    .field(name)
                    .map(FieldDecl::empty_relation)
                    .unwrap_or_else(|| EMPTY_RELATION.to_string())
            } else {
                values.join(" + ")
            };
            body.push_str(&format!("\ts.{name} = {value}\n"));
        }
        state_predicate(predicate, state_sig, &body)
    }
}

/// `pred <name>[s: <sig>] { <body> }` with the body placed verbatim.
pub fn state_predicate(predicate: &str, state_sig: &str, body: &str) -> String {
    format!("pred {predicate}[s: {state_sig}] {BLOCK_INITIALIZER}\n{body}{BLOCK_TERMINATOR}\n")
}

fn field_line(name: &str, values: &[String]) -> String {
    format!(
        "\n{name}: {BLOCK_INITIALIZER} {} {BLOCK_TERMINATOR}",
        values.join(", ")
    )
}
