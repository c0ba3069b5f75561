//! The session protocol: stepping, searching, and browsing alternatives.
//!
//! A session is `Uninitialized` until a model or a trace is loaded, and
//! `Ready` afterwards. Forward operations compose a query from the base
//! model, a resumption predicate for the current state, and a goal; the
//! solved chain becomes the provisional tail of the path, and its solution
//! the only live choice point.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, warn};
use trellis_core::{
    dot_document, edge_list, render, DotStyle, ExplorationPath, GraphNode, NodeId, PathEntry,
    StateDescription, StateSchema, StateStore,
};
use trellis_solver::{
    compose, decode_chain, evaluate_scopes, Goal, ModelText, ParsingConf, RecordedInstance,
    RecordedSolutions, SolutionHandle, SolverBridge,
};

use crate::breakpoints::Breakpoints;
use crate::capability::{Capabilities, ModelVariant};
use crate::choice::ChoiceStack;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::hierarchy::canonical_name;

/// One exploration session over a solver backend.
pub struct Session<B: SolverBridge> {
    bridge: B,
    config: SessionConfig,
    variant: Box<dyn ModelVariant>,
    /// Conf embedded in the loaded model, overriding `config.parsing`.
    embedded_conf: Option<ParsingConf>,
    model: Option<ModelText>,
    schema: StateSchema,
    /// Atoms of each user-visible signature in the loaded model or trace.
    scopes: BTreeMap<String, Vec<String>>,
    store: StateStore,
    path: ExplorationPath,
    choices: ChoiceStack,
    breakpoints: Breakpoints,
    trace_mode: bool,
    diff_mode: bool,
}

impl<B: SolverBridge> Session<B> {
    /// Create a session whose model variant follows `config.hierarchy`.
    pub fn new(bridge: B, config: SessionConfig) -> Result<Self, SessionError> {
        let variant = config.variant()?;
        Ok(Self::with_variant(bridge, config, variant))
    }

    pub fn with_variant(bridge: B, config: SessionConfig, variant: Box<dyn ModelVariant>) -> Self {
        let diff_mode = config.diff_mode;
        Self {
            bridge,
            config,
            variant,
            embedded_conf: None,
            model: None,
            schema: StateSchema::default(),
            scopes: BTreeMap::new(),
            store: StateStore::default(),
            path: ExplorationPath::new(),
            choices: ChoiceStack::new(),
            breakpoints: Breakpoints::new(),
            trace_mode: false,
            diff_mode,
        }
    }

    // --- Accessors ---

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The conf in effect: the loaded model's embedded conf, if any.
    pub fn parsing_conf(&self) -> &ParsingConf {
        self.embedded_conf.as_ref().unwrap_or(&self.config.parsing)
    }

    /// Replace the persistent conf used by models without an embedded one.
    pub fn set_parsing_conf(&mut self, conf: ParsingConf) {
        self.config.parsing = conf;
    }

    pub fn capabilities(&self) -> Capabilities {
        self.variant.capabilities()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn path(&self) -> &ExplorationPath {
        &self.path
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Number of live choice points.
    pub fn choice_depth(&self) -> usize {
        self.choices.len()
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// True once a model or trace has been loaded.
    pub fn is_initialized(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn is_trace(&self) -> bool {
        self.trace_mode
    }

    /// Signature name to atoms, as evaluated when the model or trace was
    /// loaded. Generated concrete sigs and `univ` are left out.
    pub fn scopes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.scopes
    }

    pub fn scope_for_sig(&self, sig: &str) -> Option<&[String]> {
        self.scopes.get(sig).map(Vec::as_slice)
    }

    /// A display preference for front ends. History rendering does not
    /// consult it.
    pub fn diff_mode(&self) -> bool {
        self.diff_mode
    }

    pub fn set_diff_mode(&mut self, on: bool) {
        self.diff_mode = on;
    }

    // --- Initialization ---

    /// Load a model text and derive its initial state.
    ///
    /// On failure the previous model, conf, and exploration state are kept.
    pub fn initialize_model(&mut self, text: &str) -> Result<(), SessionError> {
        let embedded = ParsingConf::embedded(text)?;
        let conf = embedded.clone().unwrap_or_else(|| self.config.parsing.clone());
        let model = ModelText::parse(text, &conf)?;

        let query = compose(&conf, &model.base, &model.init, &Goal::Initial, 0);
        let solution = self.bridge.run(&query)?;
        if !solution.satisfiable() {
            return Err(SessionError::Unsatisfiable(
                "no instance found, the initializer may be inconsistent".into(),
            ));
        }
        let (schema, chain) = decode_chain(solution.as_ref(), &conf.state_sig)?;
        let scopes = evaluate_scopes(solution.as_ref(), &conf.additional_sig_scopes)?;

        let mut store = StateStore::new(Some(conf.transition_field.clone()));
        let ids = store.init_with(chain)?;
        for (i, &id) in ids.iter().enumerate() {
            store.record_discovery_path(id, ids[..=i].to_vec())?;
        }
        let entries = entries_for(&store, &ids)?;
        let mut path = ExplorationPath::new();
        path.extend_provisionally(entries);

        info!(
            states = ids.len(),
            fields = schema.fields.len(),
            embedded_conf = embedded.is_some(),
            "model initialized"
        );
        self.embedded_conf = embedded;
        self.model = Some(model);
        self.schema = schema;
        self.scopes = scopes;
        self.store = store;
        self.path = path;
        self.choices.reset(solution);
        self.trace_mode = false;
        Ok(())
    }

    pub fn initialize_model_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = std::fs::read_to_string(path)?;
        self.initialize_model(&text)
    }

    /// Load a recorded trace and replay it from its first state.
    ///
    /// No solving happens in trace mode; `until` and `force` are unavailable.
    pub fn initialize_trace(&mut self, trace: RecordedSolutions) -> Result<(), SessionError> {
        let sig = self.config.parsing.state_sig.clone();
        let solution = trace.into_handle();
        if !solution.satisfiable() {
            return Err(SessionError::InternalDecode("trace holds no instance".into()));
        }
        let (schema, chain) = decode_chain(solution.as_ref(), &sig)?;
        let scopes = evaluate_scopes(
            solution.as_ref(),
            &self.config.parsing.additional_sig_scopes,
        )?;

        let mut store = StateStore::new(Some(self.config.parsing.transition_field.clone()));
        let ids = store.init_with(chain)?;
        for (i, &id) in ids.iter().enumerate() {
            store.record_discovery_path(id, ids[..=i].to_vec())?;
        }
        let mut path = ExplorationPath::new();
        path.replace_with(entries_for(&store, &ids)?);
        path.retreat(path.position(), true);

        info!(states = ids.len(), "trace loaded");
        self.embedded_conf = None;
        self.model = None;
        self.schema = schema;
        self.scopes = scopes;
        self.store = store;
        self.path = path;
        self.choices.clear();
        self.trace_mode = true;
        Ok(())
    }

    pub fn initialize_trace_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let trace = RecordedSolutions::read(path)?;
        self.initialize_trace(trace)
    }

    /// The current path as a trace document, loadable with
    /// [`initialize_trace`](Self::initialize_trace).
    pub fn export_trace(&self) -> Result<RecordedSolutions, SessionError> {
        self.require_ready()?;
        let sig = &self.parsing_conf().state_sig;
        let chain: Vec<StateDescription> = self
            .path
            .entries()
            .iter()
            .map(|e| StateDescription::clone(&e.state))
            .collect();
        Ok(RecordedSolutions {
            state_sig: sig.clone(),
            fields: self.schema.fields.clone(),
            instances: vec![RecordedInstance::from_chain(sig, &self.schema.fields, &chain)],
        })
    }

    // --- Forward exploration ---

    /// Take exactly `steps` transitions. `constraints[i]`, when non-empty,
    /// must hold in the state reached by transition `i`.
    pub fn step(&mut self, steps: usize, constraints: &[String]) -> Result<(), SessionError> {
        self.require_ready()?;
        if steps == 0 {
            return Err(SessionError::InvalidBound("step needs at least one transition".into()));
        }
        if self.trace_mode {
            if self.path.at_end() {
                return Err(SessionError::TraceExhausted("end of trace reached".into()));
            }
            self.path.advance(steps, true)?;
            return Ok(());
        }

        let solution = self.solve(&Goal::Path(constraints.to_vec()), steps)?;
        if !solution.satisfiable() {
            return Err(SessionError::Unsatisfiable(
                "transition constraint is unsatisfiable".into(),
            ));
        }
        let ids = self.extend(solution)?;
        debug!(steps, new_states = ids.len(), "stepped");
        Ok(())
    }

    /// Step until a breakpoint holds, trying bounds `1..=limit`. Returns the
    /// bound at which one was hit.
    pub fn until(&mut self, limit: usize) -> Result<usize, SessionError> {
        self.require_ready()?;
        if self.trace_mode {
            return Err(SessionError::TraceMode("until"));
        }
        if limit == 0 {
            return Err(SessionError::InvalidBound("limit must be at least 1".into()));
        }
        if self.breakpoints.is_empty() {
            return Err(SessionError::NoBreakpoints);
        }
        let goal = Goal::Breakpoint(self.breakpoints.list().to_vec());
        self.search_bounds(&goal, limit, "no breakpoint hit")
    }

    /// Step until `transition` is taken, trying bounds `1..=limit`.
    pub fn force(&mut self, transition: &str, limit: usize) -> Result<usize, SessionError> {
        self.require_ready()?;
        if !self.capabilities().supports_force {
            return Err(SessionError::Unsupported("forcing a transition"));
        }
        if self.trace_mode {
            return Err(SessionError::TraceMode("force"));
        }
        if limit == 0 {
            return Err(SessionError::InvalidBound("limit must be at least 1".into()));
        }
        let name = self
            .variant
            .resolve_transition(transition)
            .ok_or_else(|| SessionError::UnknownTransition(transition.to_string()))?;
        let goal = Goal::Transition(name);
        self.search_bounds(&goal, limit, &format!("unable to take {transition}"))
    }

    // --- Alternatives and backtracking ---

    /// Replace the provisional tail with the next (or, with `reverse`, the
    /// previous) solution to the same query.
    ///
    /// Going back stores the restored chain again under new ids, so the
    /// store grows in both directions.
    pub fn select_alternate_path(&mut self, reverse: bool) -> Result<(), SessionError> {
        self.require_ready()?;
        let solution = if reverse {
            let previous = self
                .choices
                .previous()
                .ok_or_else(|| exhausted("no previous alternative"))?;
            Rc::clone(previous)
        } else {
            let top = self
                .choices
                .top()
                .ok_or_else(|| exhausted("no active solution"))?;
            let next = top.next()?;
            if !next.satisfiable() {
                return Err(exhausted("no more alternative paths"));
            }
            next
        };

        let mut chain = self.decode(&solution)?;
        if chain.is_empty() {
            return Err(SessionError::InternalDecode("solution holds no state".into()));
        }
        let start = chain.remove(0);
        let ids = if chain.is_empty() {
            // An alternate initial state has no successor to show.
            self.store.add_chain(None, vec![start])?
        } else {
            let committed = self.path.len() - self.path.temp_len();
            let anchor = committed
                .checked_sub(1)
                .and_then(|p| self.path.get(p))
                .map(|e| e.id)
                .ok_or_else(|| SessionError::InternalDecode("alternative has no anchor".into()))?;
            self.store.add_chain(Some(anchor), chain)?
        };
        let entries = entries_for(&self.store, &ids)?;

        self.path.rollback();
        self.path.extend_provisionally(entries);
        let depth = if reverse {
            self.choices.pop()?;
            self.choices.len()
        } else {
            self.choices.push(solution);
            self.choices.len()
        };
        self.record_routes(&ids)?;
        debug!(reverse, depth, "selected alternate path");
        Ok(())
    }

    /// Go back `steps` states, re-deriving the target so that alternatives
    /// from it can be browsed.
    pub fn reverse_step(&mut self, steps: usize) -> Result<(), SessionError> {
        self.require_ready()?;
        if steps == 0 {
            return Err(SessionError::InvalidBound("reverse step needs at least one step".into()));
        }
        let snapshot = (self.store.clone(), self.path.clone(), self.choices.clone());
        let result = self.reverse_step_inner(steps);
        if let Err(e) = &result {
            warn!(error = %e, "reverse step failed, restoring previous state");
            (self.store, self.path, self.choices) = snapshot;
        }
        result
    }

    fn reverse_step_inner(&mut self, steps: usize) -> Result<(), SessionError> {
        let position = self.path.position();
        let target = self
            .path
            .get(position.saturating_sub(steps))
            .cloned()
            .ok_or(SessionError::NotInitialized)?;

        if position <= steps {
            self.reset_to_init()?;
        } else {
            self.path.retreat(steps + 1, self.trace_mode);
            self.step(1, &[])?;
        }
        while self.path.current().is_some_and(|c| c.state != target.state) {
            self.select_alternate_path(false)?;
        }
        self.path.patch_current_id(target.id);
        self.record_routes(&[])?;
        Ok(())
    }

    /// Replay the route on which state `id` was first discovered.
    pub fn move_to_state(&mut self, id: NodeId) -> Result<(), SessionError> {
        self.require_ready()?;
        let node = self.store.get_by_id(id)?;
        if self.trace_mode {
            let target = self
                .path
                .ids()
                .iter()
                .position(|&i| i == id)
                .ok_or(SessionError::NoRoute(id))?;
            let current = self.path.position();
            if target < current {
                self.path.retreat(current - target, true);
            } else {
                self.path.advance(target - current, true)?;
            }
            return Ok(());
        }

        let route = node.discovery_path().to_vec();
        if route.is_empty() {
            return Err(SessionError::NoRoute(id));
        }
        let fingerprint = node.fingerprint().short();
        let entries = entries_for(&self.store, &route)?;
        self.path.replace_with(entries);
        self.choices.clear();
        debug!(id, depth = route.len(), %fingerprint, "moved to state");
        Ok(())
    }

    /// Return to the model's initial state (or the first state of a trace).
    pub fn reset_to_init(&mut self) -> Result<(), SessionError> {
        self.require_ready()?;
        if self.trace_mode {
            let position = self.path.position();
            self.path.retreat(position, true);
            return Ok(());
        }

        let model = self.model.as_ref().ok_or(SessionError::NotInitialized)?;
        let text = compose(self.parsing_conf(), &model.base, &model.init, &Goal::Initial, 0);
        let solution = self.bridge.run(&text)?;
        if !solution.satisfiable() {
            return Err(SessionError::Unsatisfiable("initializer has no instance".into()));
        }
        let first = self
            .decode(&solution)?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::InternalDecode("solution holds no state".into()))?;

        // The re-derived root is never stored again; it is shown as S1.
        self.path.clear();
        self.path.extend_provisionally(vec![PathEntry::new(1, first)]);
        self.choices.reset(solution);
        info!("reset to initial state");
        Ok(())
    }

    // --- Breakpoints ---

    /// Check that `constraint` compiles when used as a breakpoint.
    pub fn validate_constraint(&mut self, constraint: &str) -> Result<(), SessionError> {
        if self.trace_mode {
            return Err(SessionError::TraceMode("constraint validation"));
        }
        let model = self.model.as_ref().ok_or(SessionError::NotInitialized)?;
        let goal = Goal::Breakpoint(vec![constraint.to_string()]);
        let text = compose(self.parsing_conf(), &model.base, &model.init, &goal, 1);
        self.bridge.compile(&text)?;
        Ok(())
    }

    /// Validate and register a breakpoint. Returns its index.
    pub fn add_breakpoint(&mut self, constraint: &str) -> Result<usize, SessionError> {
        self.validate_constraint(constraint)?;
        Ok(self.breakpoints.add(constraint))
    }

    pub fn remove_breakpoint(&mut self, index: usize) -> Result<String, SessionError> {
        self.breakpoints.remove(index)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    // --- Display ---

    pub fn current_display(&self) -> Result<String, SessionError> {
        let current = self.current()?;
        Ok(render::node(current.id, &current.state))
    }

    pub fn node_display(&self, id: NodeId) -> Result<String, SessionError> {
        let node = self.store.get_by_id(id)?;
        Ok(render::node(node.id(), node.state()))
    }

    /// The current state and up to `n` predecessors. Entries are shown as
    /// diffs against their predecessor only in trace mode.
    pub fn history(&self, n: usize) -> String {
        self.path.render_history(n, self.trace_mode)
    }

    /// [`history`](Self::history) with the configured length.
    pub fn default_history(&self) -> String {
        self.history(self.config.history_length)
    }

    pub fn current_property(&self, field: &str) -> Result<String, SessionError> {
        Ok(render::property(&self.current()?.state, field))
    }

    /// What changed since the last committed state.
    pub fn current_diff_from_last_commit(&self) -> Result<String, SessionError> {
        let current = self.current()?;
        let at = self.path.position().saturating_sub(self.path.temp_len());
        let before = self.path.get(at).ok_or(SessionError::NotInitialized)?;
        Ok(render::diff(before.id, &before.state, current.id, &current.state))
    }

    /// What changed since the state `delta` positions back on the path.
    pub fn current_diff_by_delta(&self, delta: usize) -> Result<String, SessionError> {
        let current = self.current()?;
        let before = self
            .path
            .position()
            .checked_sub(delta)
            .and_then(|p| self.path.get(p))
            .ok_or_else(|| SessionError::NotFound(format!("no state {delta} steps back")))?;
        Ok(render::diff(before.id, &before.state, current.id, &current.state))
    }

    /// DOT statements for every stored state and step, current state highlighted.
    pub fn dot_edges(&self) -> Vec<String> {
        let conf = self.parsing_conf();
        let style = DotStyle {
            stable_field: Some(conf.stable_field.clone()),
            stable_value: conf.stable_true_value.clone(),
        };
        edge_list(&self.store, self.path.current().map(|e| e.id), &style)
    }

    pub fn dot(&self) -> String {
        dot_document(&self.dot_edges())
    }

    /// The control-state hierarchy with the current state's active control
    /// states highlighted.
    pub fn hierarchy_dot(&self) -> Result<String, SessionError> {
        if !self.capabilities().supports_hierarchy_rendering {
            return Err(SessionError::Unsupported("hierarchy rendering"));
        }
        let field = &self.parsing_conf().control_state_field;
        let active: Vec<String> = self
            .path
            .current()
            .and_then(|e| e.state.values(field))
            .unwrap_or_default()
            .iter()
            .map(|v| canonical_name(v))
            .collect();
        self.variant
            .render_hierarchy(&active)
            .ok_or(SessionError::Unsupported("hierarchy rendering"))
    }

    /// React to a clicked label: `S<n>` moves to state n, a transition name
    /// forces that transition within the configured limit.
    pub fn activate_label(&mut self, label: &str) -> Result<(), SessionError> {
        if let Some(id) = parse_state_label(label) {
            return self.move_to_state(id);
        }
        if self.variant.resolve_transition(label).is_some() {
            self.force(label, self.config.force_limit)?;
            return Ok(());
        }
        Err(SessionError::UnknownTransition(label.to_string()))
    }

    /// Every stored state with the same content as state `id`.
    pub fn equivalent_states(&self, id: NodeId) -> Result<Vec<NodeId>, SessionError> {
        Ok(self.store.equivalents(id)?.to_vec())
    }

    // --- Internals ---

    fn require_ready(&self) -> Result<(), SessionError> {
        if self.path.is_empty() {
            return Err(SessionError::NotInitialized);
        }
        Ok(())
    }

    fn current(&self) -> Result<&PathEntry, SessionError> {
        self.path.current().ok_or(SessionError::NotInitialized)
    }

    /// Compose and solve a query starting from the current state.
    fn solve(&mut self, goal: &Goal, bound: usize) -> Result<SolutionHandle, SessionError> {
        let model = self.model.as_ref().ok_or(SessionError::NotInitialized)?;
        let conf = self.parsing_conf();
        let resumption = if self.store.size() > 1 {
            self.current()?.state.serialize_as_constraint(
                &self.schema,
                &conf.init_predicate,
                &conf.state_sig,
            )
        } else {
            model.init.clone()
        };
        let text = compose(conf, &model.base, &resumption, goal, bound);
        Ok(self.bridge.run(&text)?)
    }

    fn search_bounds(&mut self, goal: &Goal, limit: usize, what: &str) -> Result<usize, SessionError> {
        for bound in 1..=limit {
            let solution = self.solve(goal, bound)?;
            if !solution.satisfiable() {
                debug!(bound, "goal not reached, trying next bound");
                continue;
            }
            let ids = self.extend(solution)?;
            info!(bound, new_states = ids.len(), "goal reached");
            return Ok(bound);
        }
        warn!(limit, "goal not reached within limit");
        Err(SessionError::Unsatisfiable(format!("{what} within {limit} steps")))
    }

    fn decode(&self, solution: &SolutionHandle) -> Result<Vec<StateDescription>, SessionError> {
        let (_, chain) = decode_chain(solution.as_ref(), &self.parsing_conf().state_sig)?;
        Ok(chain)
    }

    /// Commit the path, then store the solution's chain (minus the current
    /// state it starts from) as the new provisional tail.
    fn extend(&mut self, solution: SolutionHandle) -> Result<Vec<NodeId>, SessionError> {
        let mut chain = self.decode(&solution)?;
        if chain.len() < 2 {
            return Err(SessionError::InternalDecode("solution holds no transition".into()));
        }
        chain.remove(0);
        let start = self.current()?.id;

        let ids = self.store.add_chain(Some(start), chain)?;
        let entries = entries_for(&self.store, &ids)?;
        self.path.commit();
        self.path.extend_provisionally(entries);
        self.choices.reset(solution);
        self.record_routes(&ids)?;
        Ok(ids)
    }

    /// Remember the current path as the route to `ids` and to the current
    /// state, for nodes that have none yet.
    fn record_routes(&mut self, ids: &[NodeId]) -> Result<(), SessionError> {
        let route = self.path.ids();
        for &id in ids {
            if let Some(pos) = route.iter().position(|&r| r == id) {
                self.store.record_discovery_path(id, route[..=pos].to_vec())?;
            }
        }
        if let Some(current) = self.path.current() {
            let id = current.id;
            let pos = self.path.position();
            self.store.record_discovery_path(id, route[..=pos].to_vec())?;
        }
        Ok(())
    }
}

fn entries_for(store: &StateStore, ids: &[NodeId]) -> Result<Vec<PathEntry>, SessionError> {
    ids.iter()
        .map(|&id| store.get_by_id(id).map(GraphNode::entry).map_err(SessionError::from))
        .collect()
}

fn exhausted(msg: &str) -> SessionError {
    SessionError::ExhaustedAlternatives(msg.to_string())
}

/// `S12` or `s12` as a state id.
fn parse_state_label(label: &str) -> Option<NodeId> {
    let digits = label.strip_prefix(|c: char| c == 'S' || c == 's')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
