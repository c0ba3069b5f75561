//! Explicit-state reference backend.
//!
//! The transition system is declared up front as named states, initial
//! states, and labelled transitions. Compiling a composed query reads back
//! the resumption predicate, the goal predicates, and the bound; solving
//! enumerates matching chains depth-first, in declaration order, so repeated
//! runs return the same solutions in the same order.
//!
//! ```toml
//! initial = ["red"]
//!
//! [[fields]]
//! name = "light"
//!
//! [[states]]
//! name = "red"
//! values = { light = ["Red"] }
//!
//! [[transitions]]
//! from = "red"
//! to = "green"
//! label = "go"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use trellis_core::{FieldDecl, StateDescription};

use crate::bridge::{SolutionHandle, SolverBridge};
use crate::compose::{BREAK_PREDICATE, FORCE_PREDICATE, PATH_PREDICATE};
use crate::condition::Condition;
use crate::conf::ParsingConf;
use crate::decode::{ATOM_SUFFIX, UNIV};
use crate::error::SolverError;
use crate::model::predicate_body;
use crate::recorded::{RecordedInstance, RecordedSolutions};

/// Upper bound on the solutions one query enumerates.
pub const DEFAULT_MAX_ALTERNATIVES: usize = 64;

type Values = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitState {
    pub name: String,
    #[serde(default)]
    pub values: Values,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitTransition {
    pub from: String,
    pub to: String,
    /// Written to the transition field of the state entered.
    #[serde(default)]
    pub label: Option<String>,
}

/// A finite transition system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitSystem {
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub states: Vec<ExplicitState>,
    #[serde(default)]
    pub initial: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<ExplicitTransition>,
}

impl ExplicitSystem {
    pub fn from_toml_str(text: &str) -> Result<Self, SolverError> {
        toml::from_str(text).map_err(|e| SolverError::Config(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, SolverError> {
        serde_json::from_str(text).map_err(|e| SolverError::Config(e.to_string()))
    }

    /// Load a system file; `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> Result<Self, SolverError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    /// Check that names are unique and every reference resolves.
    pub fn validate(&self) -> Result<(), SolverError> {
        let mut names = HashSet::new();
        for state in &self.states {
            if !names.insert(state.name.as_str()) {
                return Err(SolverError::Config(format!("duplicate state {}", state.name)));
            }
            for field in state.values.keys() {
                if !self.fields.iter().any(|f| f.name == *field) {
                    return Err(SolverError::Config(format!(
                        "state {} sets undeclared field {field}",
                        state.name
                    )));
                }
            }
        }
        let referenced = self
            .initial
            .iter()
            .chain(self.transitions.iter().flat_map(|t| [&t.from, &t.to]));
        for name in referenced {
            if !names.contains(name.as_str()) {
                return Err(SolverError::Config(format!("unknown state {name}")));
            }
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Start {
    /// Declared initial states satisfying the condition.
    Matching(Condition),
    /// Exactly these values; the chain continues from every system state
    /// with the same content.
    Fixed(Values),
}

/// A composed query, read back from the model text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitQuery {
    start: Start,
    bound: usize,
    /// `(state index, condition)`; the first state has index 0.
    positional: Vec<(usize, Condition)>,
    /// Some state after the first must satisfy this.
    reach: Option<Condition>,
}

/// Solver over an [`ExplicitSystem`].
#[derive(Debug, Clone)]
pub struct ExplicitSolver {
    system: ExplicitSystem,
    conf: ParsingConf,
    max_alternatives: usize,
}

impl ExplicitSolver {
    pub fn new(system: ExplicitSystem, conf: ParsingConf) -> Result<Self, SolverError> {
        system.validate()?;
        Ok(Self {
            system,
            conf,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        })
    }

    pub fn with_max_alternatives(mut self, max: usize) -> Self {
        self.max_alternatives = max.max(1);
        self
    }

    pub fn system(&self) -> &ExplicitSystem {
        &self.system
    }

    fn parse_query(&self, text: &str) -> Result<ExplicitQuery, SolverError> {
        let run = text
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| l.starts_with("run"))
            .ok_or_else(|| SolverError::Compile("no run command".into()))?;
        let bound = parse_scope(run)?
            .checked_sub(1)
            .ok_or_else(|| SolverError::Compile("scope must be at least 1".into()))?;

        let init = self.condition_of(text, &self.conf.init_predicate)?;
        let start = match self.fixed_assignment(&init) {
            Some(values) => Start::Fixed(values),
            None => Start::Matching(init),
        };

        let mut positional = Vec::new();
        let mut rest = run;
        while let Some(at) = rest.find(PATH_PREDICATE) {
            rest = &rest[at + PATH_PREDICATE.len()..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            let step: usize = digits
                .parse()
                .map_err(|_| SolverError::Compile(format!("bad path predicate in {run}")))?;
            let name = format!("{PATH_PREDICATE}{step}");
            positional.push((step + 1, self.condition_of(text, &name)?));
        }

        let reach = if run.contains(BREAK_PREDICATE) {
            Some(self.condition_of(text, BREAK_PREDICATE)?)
        } else if run.contains(FORCE_PREDICATE) {
            Some(self.condition_of(text, FORCE_PREDICATE)?)
        } else {
            None
        };

        Ok(ExplicitQuery {
            start,
            bound,
            positional,
            reach,
        })
    }

    /// Parse the body of predicate `name`, rejecting unknown fields.
    fn condition_of(&self, text: &str, name: &str) -> Result<Condition, SolverError> {
        let body = predicate_body(text, name)?
            .ok_or_else(|| SolverError::MissingPredicate(name.to_string()))?;
        let condition = Condition::parse(body)?;
        for field in condition.fields() {
            if !self.system.fields.iter().any(|f| f.name == field) {
                return Err(SolverError::Compile(format!("unknown field {field}")));
            }
        }
        Ok(condition)
    }

    /// The exact state a conjunction of equalities pins down, if it assigns
    /// every field other than the transition field.
    fn fixed_assignment(&self, condition: &Condition) -> Option<Values> {
        let parts = match condition {
            Condition::All(parts) => parts.as_slice(),
            single => std::slice::from_ref(single),
        };
        let mut values = Values::new();
        for part in parts {
            let Condition::Equals { field, values: v } = part else {
                return None;
            };
            values.insert(field.clone(), v.clone());
        }
        let complete = self
            .system
            .fields
            .iter()
            .all(|f| f.name == self.conf.transition_field || values.contains_key(&f.name));
        if !complete {
            return None;
        }
        for field in &self.system.fields {
            values.entry(field.name.clone()).or_default();
        }
        Some(values)
    }

    /// Field values of system state `index`, entered through `label`.
    fn view(&self, index: usize, label: Option<&str>) -> Values {
        let state = &self.system.states[index];
        let mut view = Values::new();
        for field in &self.system.fields {
            let mut values = match label {
                Some(label) if field.name == self.conf.transition_field => vec![label.to_string()],
                _ => state.values.get(&field.name).cloned().unwrap_or_default(),
            };
            values.sort();
            values.dedup();
            view.insert(field.name.clone(), values);
        }
        view
    }

    fn starts(&self, start: &Start) -> Vec<(usize, Values)> {
        match start {
            Start::Matching(condition) => self
                .system
                .initial
                .iter()
                .filter_map(|name| self.system.index_of(name))
                .map(|i| (i, self.view(i, None)))
                .filter(|(_, view)| condition.holds(view))
                .collect(),
            Start::Fixed(values) => {
                let content = |v: &Values| -> Values {
                    v.iter()
                        .filter(|(k, _)| **k != self.conf.transition_field)
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                };
                let wanted = content(values);
                (0..self.system.states.len())
                    .filter(|&i| content(&self.view(i, None)) == wanted)
                    .map(|i| (i, values.clone()))
                    .collect()
            }
        }
    }

    fn search(&self, query: &ExplicitQuery, path: &mut Vec<(usize, Values)>, out: &mut Vec<Vec<Values>>) {
        if out.len() >= self.max_alternatives {
            return;
        }
        let depth = path.len() - 1;
        if depth == query.bound {
            let reached = query
                .reach
                .as_ref()
                .map_or(true, |c| path[1..].iter().any(|(_, view)| c.holds(view)));
            if reached {
                out.push(path.iter().map(|(_, view)| view.clone()).collect());
            }
            return;
        }

        let from = &self.system.states[path[depth].0].name;
        for transition in self.system.transitions.iter().filter(|t| t.from == *from) {
            let Some(to) = self.system.index_of(&transition.to) else {
                continue;
            };
            let view = self.view(to, transition.label.as_deref());
            let step = depth + 1;
            let blocked = query
                .positional
                .iter()
                .any(|(i, c)| *i == step && !c.holds(&view));
            if blocked {
                continue;
            }
            path.push((to, view));
            self.search(query, path, out);
            path.pop();
        }
    }

    /// Add the generated concrete sigs and `univ` to an instance.
    fn add_sigs(&self, instance: &mut RecordedInstance) {
        for (sig, &scope) in &self.conf.additional_sig_scopes {
            let mut atoms = Vec::with_capacity(scope);
            for i in 0..scope {
                let concrete = format!("{sig}_{i}");
                let atom = format!("{concrete}{ATOM_SUFFIX}");
                instance.sigs.insert(concrete, vec![atom.clone()]);
                atoms.push(atom);
            }
            instance.sigs.insert(sig.clone(), atoms);
        }
        let mut univ: Vec<String> = instance.sigs.values().flatten().cloned().collect();
        univ.sort();
        univ.dedup();
        instance.sigs.insert(UNIV.to_string(), univ);
    }
}

impl SolverBridge for ExplicitSolver {
    type Compiled = ExplicitQuery;

    fn compile(&mut self, model_text: &str) -> Result<ExplicitQuery, SolverError> {
        self.parse_query(model_text)
    }

    fn solve(&mut self, query: &ExplicitQuery) -> Result<SolutionHandle, SolverError> {
        let mut chains = Vec::new();
        for start in self.starts(&query.start) {
            let mut path = vec![start];
            self.search(query, &mut path, &mut chains);
        }
        debug!(
            bound = query.bound,
            solutions = chains.len(),
            "explicit search finished"
        );

        let sig = &self.conf.state_sig;
        let fields = self.system.fields.clone();
        let instances = chains
            .into_iter()
            .map(|chain| {
                let chain: Vec<StateDescription> =
                    chain.into_iter().map(StateDescription::from_fields).collect();
                let mut instance = RecordedInstance::from_chain(sig, &fields, &chain);
                self.add_sigs(&mut instance);
                instance
            })
            .collect();
        Ok(RecordedSolutions {
            state_sig: sig.clone(),
            fields,
            instances,
        }
        .into_handle())
    }
}

/// `N` from `... for exactly N State`.
fn parse_scope(run: &str) -> Result<usize, SolverError> {
    let after = run
        .split_once("for exactly")
        .map(|(_, rest)| rest)
        .ok_or_else(|| SolverError::Compile(format!("no scope in {run}")))?;
    after
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| SolverError::Compile(format!("bad scope in {run}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, Goal};
    use crate::decode::{decode_chain, evaluate_scopes};

    const SYSTEM: &str = r#"
initial = ["red"]

[[fields]]
name = "light"

[[fields]]
name = "transTaken"

[[states]]
name = "red"
values = { light = ["Red"] }

[[states]]
name = "green"
values = { light = ["Green"] }

[[states]]
name = "amber"
values = { light = ["Amber"] }

[[transitions]]
from = "red"
to = "green"
label = "go"

[[transitions]]
from = "green"
to = "amber"
label = "slow"

[[transitions]]
from = "green"
to = "red"
label = "halt"

[[transitions]]
from = "amber"
to = "red"
label = "stop"
"#;

    const INIT: &str = "pred init[s: State] {\n\ts.light = Red\n}\n";

    fn solver() -> ExplicitSolver {
        let system = ExplicitSystem::from_toml_str(SYSTEM).unwrap();
        ExplicitSolver::new(system, ParsingConf::default()).unwrap()
    }

    fn lights(solver: &mut ExplicitSolver, goal: Goal, bound: usize) -> Vec<Vec<String>> {
        let text = compose(&ParsingConf::default(), "", INIT, &goal, bound);
        let mut solution = solver.run(&text).unwrap();
        let mut out = Vec::new();
        while solution.satisfiable() {
            let (_, chain) = decode_chain(solution.as_ref(), "State").unwrap();
            out.push(
                chain
                    .iter()
                    .map(|s| s.values("light").unwrap().join(""))
                    .collect(),
            );
            match solution.next() {
                Ok(next) => solution = next,
                Err(_) => break,
            }
        }
        out
    }

    #[test]
    fn initial_state() {
        let mut s = solver();
        assert_eq!(lights(&mut s, Goal::Initial, 0), vec![vec!["Red"]]);
    }

    #[test]
    fn alternatives_in_declaration_order() {
        let mut s = solver();
        let found = lights(&mut s, Goal::Path(vec![]), 2);
        assert_eq!(
            found,
            vec![vec!["Red", "Green", "Amber"], vec!["Red", "Green", "Red"]]
        );
    }

    #[test]
    fn path_constraints_filter_steps() {
        let mut s = solver();
        let goal = Goal::Path(vec!["".into(), "s.light = Red".into()]);
        assert_eq!(lights(&mut s, goal, 2), vec![vec!["Red", "Green", "Red"]]);
    }

    #[test]
    fn breakpoint_needs_a_later_state() {
        let mut s = solver();
        let goal = Goal::Breakpoint(vec!["s.light = Amber".into()]);
        assert!(lights(&mut s, goal.clone(), 1).is_empty());
        assert_eq!(lights(&mut s, goal, 2), vec![vec!["Red", "Green", "Amber"]]);
    }

    #[test]
    fn forced_transition_sets_label() {
        let mut s = solver();
        let text = compose(&ParsingConf::default(), "", INIT, &Goal::Transition("stop".into()), 3);
        let solution = s.run(&text).unwrap();
        assert!(solution.satisfiable());
        let (_, chain) = decode_chain(solution.as_ref(), "State").unwrap();
        assert_eq!(chain[3].values("transTaken").unwrap(), ["stop"]);
    }

    #[test]
    fn resumes_from_fixed_state() {
        let mut s = solver();
        let resume = "pred init[s: State] {\n\ts.light = Green\n\ts.transTaken = go\n}\n";
        let text = compose(&ParsingConf::default(), "", resume, &Goal::Path(vec![]), 1);
        let solution = s.run(&text).unwrap();
        let (_, chain) = decode_chain(solution.as_ref(), "State").unwrap();
        assert_eq!(chain[0].values("transTaken").unwrap(), ["go"]);
        assert_eq!(chain[1].values("light").unwrap(), ["Amber"]);
    }

    #[test]
    fn unknown_field_is_a_compile_error() {
        let mut s = solver();
        let goal = Goal::Breakpoint(vec!["s.colour = Red".into()]);
        let text = compose(&ParsingConf::default(), "", INIT, &goal, 1);
        assert!(matches!(s.compile(&text), Err(SolverError::Compile(_))));
    }

    #[test]
    fn enumeration_is_capped() {
        let mut s = solver().with_max_alternatives(1);
        assert_eq!(lights(&mut s, Goal::Path(vec![]), 2).len(), 1);
    }

    #[test]
    fn invalid_systems_rejected() {
        let mut system = ExplicitSystem::from_toml_str(SYSTEM).unwrap();
        system.initial.push("blue".into());
        assert!(matches!(
            ExplicitSolver::new(system, ParsingConf::default()),
            Err(SolverError::Config(_))
        ));

        let json = r#"{ "fields": [{ "name": "light" }], "states": [
            { "name": "a" }, { "name": "a" } ] }"#;
        let system = ExplicitSystem::from_json_str(json).unwrap();
        assert!(system.validate().is_err());
    }

    #[test]
    fn missing_scope() {
        let mut s = solver();
        assert!(matches!(
            s.compile("pred init[s: State] {}\nrun {}"),
            Err(SolverError::Compile(_))
        ));
    }

    #[test]
    fn instances_carry_concrete_sigs() {
        let mut conf = ParsingConf::default();
        conf.additional_sig_scopes.insert("Car".into(), 2);
        let system = ExplicitSystem::from_toml_str(SYSTEM).unwrap();
        let mut s = ExplicitSolver::new(system, conf.clone()).unwrap();
        let text = compose(&conf, "", INIT, &Goal::Initial, 0);
        let solution = s.run(&text).unwrap();

        assert_eq!(
            solution.reachable_sigs().unwrap(),
            ["Car", "Car_0", "Car_1", "State", "univ"]
        );
        assert_eq!(solution.evaluate_sig("Car").unwrap(), ["Car_0$0", "Car_1$0"]);
        assert_eq!(solution.evaluate_sig("univ").unwrap().len(), 3);

        let scopes = evaluate_scopes(solution.as_ref(), &conf.additional_sig_scopes).unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes["Car"], ["Car_0", "Car_1"]);
        assert_eq!(scopes["State"], ["State"]);
    }
}
