//! Composing the model text handed to the solver.
//!
//! Every query is the base model followed by a resumption predicate (the
//! state to start from), the goal's predicates, two facts tying the state
//! ordering to the initializer and the transition relation, and a `run`
//! command scoped to exactly `bound + 1` states:
//!
//! ```text
//! <base>
//! pred init[s: State] { ... }
//! pred trellis_break[s: State] { ... }
//! fact { init[first] }
//! fact { all s: State - last | next[s, s.next] }
//! run { some s: State - first | trellis_break[s] } for exactly 4 State
//! ```

use trellis_core::state::state_predicate;

use crate::conf::ParsingConf;

/// Prefix of per-step path predicates; the step index is appended.
pub const PATH_PREDICATE: &str = "trellis_path_";
/// Predicate holding in any state that hits a breakpoint.
pub const BREAK_PREDICATE: &str = "trellis_break";
/// Predicate holding in a state entered through the forced transition.
pub const FORCE_PREDICATE: &str = "trellis_force";

/// What the solved chain must satisfy beyond the transition relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    /// Nothing; used to derive the initial state.
    Initial,
    /// Constraint `i` must hold in state `i + 1`. Empty entries are unconstrained.
    Path(Vec<String>),
    /// Some state after the first must satisfy any of the constraints.
    Breakpoint(Vec<String>),
    /// Some state after the first must be entered through this transition.
    Transition(String),
}

/// The state at `step` along the ordering: `first.next.next...`.
pub fn state_at(step: usize) -> String {
    let mut expr = String::from("first");
    for _ in 0..step {
        expr.push_str(".next");
    }
    expr
}

/// The disjunction of `constraints` as a state predicate named [`BREAK_PREDICATE`].
pub fn breakpoint_predicate(conf: &ParsingConf, constraints: &[String]) -> String {
    let body = constraints
        .iter()
        .map(|c| format!("\t({})", c.trim()))
        .collect::<Vec<_>>()
        .join(" or\n");
    state_predicate(BREAK_PREDICATE, &conf.state_sig, &format!("{body}\n"))
}

/// Compose the full query text.
pub fn compose(
    conf: &ParsingConf,
    base: &str,
    resumption: &str,
    goal: &Goal,
    bound: usize,
) -> String {
    let sig = &conf.state_sig;
    let mut out = String::new();
    out.push_str(base.trim_end());
    out.push_str("\n\n");
    out.push_str(resumption.trim_end());
    out.push('\n');

    let run_body = match goal {
        Goal::Initial => String::new(),
        Goal::Path(constraints) => {
            let mut applied = Vec::new();
            for (i, constraint) in constraints.iter().enumerate() {
                if constraint.trim().is_empty() {
                    continue;
                }
                let name = format!("{PATH_PREDICATE}{i}");
                out.push_str(&state_predicate(&name, sig, &format!("\t{}\n", constraint.trim())));
                applied.push(format!("{name}[{}]", state_at(i + 1)));
            }
            applied.join(" and ")
        }
        Goal::Breakpoint(constraints) => {
            out.push_str(&breakpoint_predicate(conf, constraints));
            format!("some s: {sig} - first | {BREAK_PREDICATE}[s]")
        }
        Goal::Transition(name) => {
            out.push_str(&state_predicate(
                FORCE_PREDICATE,
                sig,
                &format!("\ts.{} = {name}\n", conf.transition_field),
            ));
            format!("some s: {sig} - first | {FORCE_PREDICATE}[s]")
        }
    };

    out.push_str(&format!("fact {{ {}[first] }}\n", conf.init_predicate));
    out.push_str(&format!(
        "fact {{ all s: {sig} - last | {}[s, s.next] }}\n",
        conf.transition_relation
    ));
    if run_body.is_empty() {
        out.push_str(&format!("run {{}} for exactly {} {sig}\n", bound + 1));
    } else {
        out.push_str(&format!("run {{ {run_body} }} for exactly {} {sig}\n", bound + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "pred init[s: State] {\n\ts.light = Red\n}\n";

    #[test]
    fn initial_query() {
        let text = compose(&ParsingConf::default(), "sig State {}", RESUME, &Goal::Initial, 0);
        assert!(text.starts_with("sig State {}\n\npred init"));
        assert!(text.contains("fact { init[first] }\n"));
        assert!(text.contains("fact { all s: State - last | next[s, s.next] }\n"));
        assert!(text.ends_with("run {} for exactly 1 State\n"));
    }

    #[test]
    fn path_constraints_skip_empty_entries() {
        let goal = Goal::Path(vec!["s.light = Green".into(), "".into(), "s.light = Red".into()]);
        let text = compose(&ParsingConf::default(), "", RESUME, &goal, 3);
        assert!(text.contains("pred trellis_path_0[s: State] {\n\ts.light = Green\n}\n"));
        assert!(!text.contains("trellis_path_1"));
        assert!(text.contains(
            "run { trellis_path_0[first.next] and trellis_path_2[first.next.next.next] } for exactly 4 State"
        ));
    }

    #[test]
    fn all_empty_path_constraints() {
        let goal = Goal::Path(vec![" ".into()]);
        let text = compose(&ParsingConf::default(), "", RESUME, &goal, 1);
        assert!(text.ends_with("run {} for exactly 2 State\n"));
    }

    #[test]
    fn breakpoint_query() {
        let goal = Goal::Breakpoint(vec!["s.light = Green".into(), "no s.queue".into()]);
        let text = compose(&ParsingConf::default(), "", RESUME, &goal, 2);
        assert!(text.contains("\t(s.light = Green) or\n\t(no s.queue)\n"));
        assert!(text.contains("run { some s: State - first | trellis_break[s] } for exactly 3 State"));
    }

    #[test]
    fn forced_transition_query() {
        let goal = Goal::Transition("t_go".into());
        let text = compose(&ParsingConf::default(), "", RESUME, &goal, 1);
        assert!(text.contains("pred trellis_force[s: State] {\n\ts.transTaken = t_go\n}\n"));
        assert!(text.contains("run { some s: State - first | trellis_force[s] } for exactly 2 State"));
    }

    #[test]
    fn state_expressions() {
        assert_eq!(state_at(0), "first");
        assert_eq!(state_at(2), "first.next.next");
    }
}
