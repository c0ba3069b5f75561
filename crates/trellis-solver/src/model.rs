//! Splitting a model text into its base and its initializer predicate.

use std::collections::BTreeMap;

use trellis_core::state::{BLOCK_INITIALIZER, BLOCK_TERMINATOR};

use crate::conf::ParsingConf;
use crate::error::SolverError;

/// A model text with its initializer predicate cut out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelText {
    /// Everything except the initializer, with the concrete sig
    /// definitions spliced in where it stood.
    pub base: String,
    /// The initializer predicate, `pred <init>... { ... }`, verbatim.
    pub init: String,
}

impl ModelText {
    /// Locate the transition relation and the initializer in `text`.
    pub fn parse(text: &str, conf: &ParsingConf) -> Result<Self, SolverError> {
        if find_predicate(text, &conf.transition_relation).is_none() {
            return Err(SolverError::MissingPredicate(conf.transition_relation.clone()));
        }
        let (start, end) = predicate_span(text, &conf.init_predicate)?
            .ok_or_else(|| SolverError::MissingPredicate(conf.init_predicate.clone()))?;

        let mut base = String::with_capacity(text.len());
        base.push_str(&text[..start]);
        base.push_str(&concrete_sigs(&conf.additional_sig_scopes));
        base.push_str(&text[end..]);

        Ok(Self {
            base,
            init: text[start..end].to_string(),
        })
    }
}

/// Byte offset of `pred <name>` in `text`, where `name` is a whole word.
pub fn find_predicate(text: &str, name: &str) -> Option<usize> {
    let needle = format!("pred {name}");
    let mut from = 0;
    while let Some(offset) = text[from..].find(&needle) {
        let at = from + offset;
        let after = text[at + needle.len()..].chars().next();
        if !after.is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

/// Span `[start, end)` of predicate `name`, from `pred` through the brace
/// that closes its body.
pub fn predicate_span(text: &str, name: &str) -> Result<Option<(usize, usize)>, SolverError> {
    let Some(start) = find_predicate(text, name) else {
        return Ok(None);
    };
    let close = block_end(&text[start..]).ok_or_else(|| SolverError::UnbalancedBlock(name.to_string()))?;
    Ok(Some((start, start + close + 1)))
}

/// The text between the outer braces of predicate `name`.
pub fn predicate_body<'a>(text: &'a str, name: &str) -> Result<Option<&'a str>, SolverError> {
    let Some((start, end)) = predicate_span(text, name)? else {
        return Ok(None);
    };
    let pred = &text[start..end];
    let open = pred
        .find(BLOCK_INITIALIZER)
        .ok_or_else(|| SolverError::UnbalancedBlock(name.to_string()))?;
    Ok(Some(&pred[open + 1..pred.len() - 1]))
}

/// Index of the brace closing the first block in `text`.
fn block_end(text: &str) -> Option<usize> {
    let mut depth = 0i64;
    for (i, _) in text.char_indices() {
        let rest = &text[i..];
        if rest.starts_with(BLOCK_INITIALIZER) {
            depth += 1;
        } else if rest.starts_with(BLOCK_TERMINATOR) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            if depth < 0 {
                return None;
            }
        }
    }
    None
}

/// `one sig P_0, P_1 extends P {}` for every signature with extra atoms.
pub fn concrete_sigs(scopes: &BTreeMap<String, usize>) -> String {
    let mut out = String::new();
    for (sig, &count) in scopes {
        if count == 0 {
            continue;
        }
        let atoms: Vec<String> = (0..count).map(|i| format!("{sig}_{i}")).collect();
        out.push_str(&format!("one sig {} extends {sig} {{}}\n", atoms.join(", ")));
    }
    out
}
