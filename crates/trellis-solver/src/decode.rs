//! Turning a solver solution into a chain of state descriptions.
//!
//! Field tuples look like `State$3->Green$0` or `State$0->A$0->B$0`. The first
//! atom names the state the tuple belongs to; the remaining columns, with the
//! `$0` atom suffix stripped, are the value (`Green`, `A->B`).

use std::collections::BTreeMap;

use trellis_core::{FieldDecl, StateDescription, StateSchema};

use crate::bridge::Solution;
use crate::error::SolverError;

const TUPLE_SEPARATOR: &str = "->";
pub(crate) const ATOM_SEPARATOR: char = '$';
pub(crate) const ATOM_SUFFIX: &str = "$0";
const SIG_PREFIX: &str = "this/";
pub(crate) const UNIV: &str = "univ";

/// Split one field tuple into (state index, value).
pub fn parse_tuple(tuple: &str) -> Result<(usize, String), SolverError> {
    let (state_atom, value) = tuple
        .split_once(TUPLE_SEPARATOR)
        .ok_or_else(|| SolverError::InternalDecode(format!("malformed tuple {tuple:?}")))?;
    let (_, index) = state_atom
        .rsplit_once(ATOM_SEPARATOR)
        .ok_or_else(|| SolverError::InternalDecode(format!("malformed state atom {state_atom:?}")))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| SolverError::InternalDecode(format!("bad state index in {tuple:?}")))?;
    Ok((index, value.replace(ATOM_SUFFIX, "")))
}

/// The tuple for `value` in state `index`, the inverse of [`parse_tuple`].
pub fn encode_tuple(state_sig: &str, index: usize, value: &str) -> String {
    let mut tuple = format!("{state_sig}{ATOM_SEPARATOR}{index}");
    for column in value.split(TUPLE_SEPARATOR) {
        tuple.push_str(TUPLE_SEPARATOR);
        tuple.push_str(column.trim());
        tuple.push_str(ATOM_SUFFIX);
    }
    tuple
}

/// Decode the ordered chain of states a satisfiable solution describes.
pub fn decode_chain(
    solution: &dyn Solution,
    state_sig: &str,
) -> Result<(StateSchema, Vec<StateDescription>), SolverError> {
    let fields: Vec<FieldDecl> = solution.state_fields(state_sig)?;
    let schema = StateSchema::new(fields);
    let count = solution.evaluate_distinguished_variable(state_sig)?;

    let mut chain: Vec<StateDescription> =
        (0..count).map(|_| StateDescription::new(&schema)).collect();
    for field in &schema.fields {
        for tuple in solution.evaluate_field(&field.name)? {
            let (index, value) = parse_tuple(&tuple)?;
            let state = chain.get_mut(index).ok_or_else(|| {
                SolverError::InternalDecode(format!(
                    "tuple {tuple:?} refers to state {index} of {count}"
                ))
            })?;
            state.add_value(&field.name, value);
        }
    }
    Ok((schema, chain))
}

/// The atoms of every user-visible signature, keyed by bare sig name.
///
/// `univ` is skipped, as are the generated concrete sigs `X_i` for each
/// `X` in `concrete` with `i` below its scope. Atoms lose their `$0` suffix.
pub fn evaluate_scopes(
    solution: &dyn Solution,
    concrete: &BTreeMap<String, usize>,
) -> Result<BTreeMap<String, Vec<String>>, SolverError> {
    let mut scopes = BTreeMap::new();
    for label in solution.reachable_sigs()? {
        let name = label.strip_prefix(SIG_PREFIX).unwrap_or(&label);
        if name == UNIV || is_concrete_sig(name, concrete) {
            continue;
        }
        let atoms = solution
            .evaluate_sig(&label)?
            .into_iter()
            .map(|atom| match atom.strip_suffix(ATOM_SUFFIX) {
                Some(bare) => bare.to_string(),
                None => atom,
            })
            .collect();
        scopes.insert(name.to_string(), atoms);
    }
    Ok(scopes)
}

fn is_concrete_sig(name: &str, concrete: &BTreeMap<String, usize>) -> bool {
    let Some((sig, index)) = name.rsplit_once('_') else {
        return false;
    };
    match (concrete.get(sig), index.parse::<usize>()) {
        (Some(&scope), Ok(i)) => i < scope,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorded::{RecordedInstance, RecordedSolutions};

    #[test]
    fn parse_unary_and_binary() {
        assert_eq!(parse_tuple("State$3->Green$0").unwrap(), (3, "Green".into()));
        assert_eq!(
            parse_tuple("State$0->A$0->B$0").unwrap(),
            (0, "A->B".into())
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(
            parse_tuple("Green$0"),
            Err(SolverError::InternalDecode(_))
        ));
        assert!(matches!(
            parse_tuple("State->Green$0"),
            Err(SolverError::InternalDecode(_))
        ));
        assert!(matches!(
            parse_tuple("State$x->Green$0"),
            Err(SolverError::InternalDecode(_))
        ));
    }

    #[test]
    fn encode_inverts_parse() {
        let tuple = encode_tuple("State", 2, "A->B");
        assert_eq!(tuple, "State$2->A$0->B$0");
        assert_eq!(parse_tuple(&tuple).unwrap(), (2, "A->B".into()));
    }

    #[test]
    fn decode_orders_states_by_index() {
        let mut tuples = BTreeMap::new();
        tuples.insert(
            "light".to_string(),
            vec!["State$1->Green$0".to_string(), "State$0->Red$0".to_string()],
        );
        let doc = RecordedSolutions {
            state_sig: "State".into(),
            fields: vec![FieldDecl::new("light", 1)],
            instances: vec![RecordedInstance {
                state_count: 2,
                tuples,
                ..Default::default()
            }],
        };
        let solution = doc.into_handle();
        let (schema, chain) = decode_chain(solution.as_ref(), "State").unwrap();
        assert!(schema.contains("light"));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].values("light").unwrap(), ["Red"]);
        assert_eq!(chain[1].values("light").unwrap(), ["Green"]);
    }

    #[test]
    fn decode_rejects_out_of_range_state() {
        let mut tuples = BTreeMap::new();
        tuples.insert("light".to_string(), vec!["State$4->Red$0".to_string()]);
        let doc = RecordedSolutions {
            state_sig: "State".into(),
            fields: vec![FieldDecl::new("light", 1)],
            instances: vec![RecordedInstance {
                state_count: 1,
                tuples,
                ..Default::default()
            }],
        };
        let err = decode_chain(doc.into_handle().as_ref(), "State").unwrap_err();
        assert!(matches!(err, SolverError::InternalDecode(_)));
    }

    #[test]
    fn decode_unknown_sig() {
        let doc = RecordedSolutions::unsatisfiable("State", vec![]);
        assert!(matches!(
            decode_chain(doc.into_handle().as_ref(), "Snapshot"),
            Err(SolverError::InternalDecode(_))
        ));
    }

    #[test]
    fn scopes_skip_univ_and_concrete_sigs() {
        let atoms = |list: &[&str]| list.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        let mut sigs = BTreeMap::new();
        sigs.insert("univ".to_string(), atoms(&["State$0", "Proc_0$0", "Proc_1$0", "Proc_2$0"]));
        sigs.insert("this/State".to_string(), atoms(&["State$0", "State$1"]));
        sigs.insert("this/Proc".to_string(), atoms(&["Proc_0$0", "Proc_1$0", "Proc_2$0"]));
        sigs.insert("this/Proc_0".to_string(), atoms(&["Proc_0$0"]));
        sigs.insert("this/Proc_1".to_string(), atoms(&["Proc_1$0"]));
        // Beyond the configured scope, so a user sig that happens to match.
        sigs.insert("this/Proc_2".to_string(), atoms(&["Proc_2$0"]));
        let doc = RecordedSolutions {
            state_sig: "State".into(),
            fields: vec![],
            instances: vec![RecordedInstance {
                state_count: 2,
                sigs,
                ..Default::default()
            }],
        };
        let mut concrete = BTreeMap::new();
        concrete.insert("Proc".to_string(), 2);

        let scopes = evaluate_scopes(doc.into_handle().as_ref(), &concrete).unwrap();
        assert_eq!(
            scopes.keys().map(String::as_str).collect::<Vec<_>>(),
            ["Proc", "Proc_2", "State"]
        );
        assert_eq!(scopes["State"], ["State", "State$1"]);
        assert_eq!(scopes["Proc"], ["Proc_0", "Proc_1", "Proc_2"]);
    }
}
