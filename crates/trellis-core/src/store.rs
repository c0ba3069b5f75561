//! The state store: every state discovered during a session.
//!
//! Nodes are kept in one growable vector and refer to each other by id, never
//! by reference. Ids start at 1, follow insertion order, and have no gaps, so
//! `size()` doubles as the largest id handed out. The store is append-only
//! and never merges nodes with identical content; the fingerprint index only
//! answers "where else have I seen this state".

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::CoreError;
use crate::fingerprint::Fingerprint;
use crate::path::PathEntry;
use crate::state::StateDescription;

/// Identity of a stored node (1-based).
pub type NodeId = usize;

/// An outgoing edge of a stored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub target: NodeId,
    /// Name of the transition taken, when the decoded target state records one.
    pub label: Option<String>,
}

/// A stored, id-assigned state.
#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    state: Rc<StateDescription>,
    fingerprint: Fingerprint,
    steps: Vec<Step>,
    discovery_path: Vec<NodeId>,
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> &StateDescription {
        &self.state
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The first route ever used to reach this node, as a list of ids
    /// starting at an initial node. Empty until recorded.
    pub fn discovery_path(&self) -> &[NodeId] {
        &self.discovery_path
    }

    /// A path entry sharing this node's state.
    pub fn entry(&self) -> PathEntry {
        PathEntry::shared(self.id, Rc::clone(&self.state))
    }
}

/// Append-only collection of discovered states.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    nodes: Vec<GraphNode>,
    by_fingerprint: HashMap<Fingerprint, Vec<NodeId>>,
    transition_field: Option<String>,
}

impl StateStore {
    /// Create an empty store. Edge labels are read from `transition_field`
    /// of each successor state when it is present.
    pub fn new(transition_field: Option<String>) -> Self {
        Self {
            nodes: Vec::new(),
            by_fingerprint: HashMap::new(),
            transition_field,
        }
    }

    /// Number of stored nodes, which is also the largest id.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node and store `chain` as the first root.
    pub fn init_with(&mut self, chain: Vec<StateDescription>) -> Result<Vec<NodeId>, CoreError> {
        self.nodes.clear();
        self.by_fingerprint.clear();
        self.add_chain(None, chain)
    }

    /// Append `chain` as a sequential path of new nodes.
    ///
    /// The first new node becomes a successor of `from`, or a new root when
    /// `from` is `None`. Returns the ids given to the new nodes, in order.
    pub fn add_chain(
        &mut self,
        from: Option<NodeId>,
        chain: Vec<StateDescription>,
    ) -> Result<Vec<NodeId>, CoreError> {
        if chain.is_empty() {
            return Err(CoreError::EmptyChain);
        }
        if let Some(id) = from {
            self.get_by_id(id)?;
        }

        let mut ids = Vec::with_capacity(chain.len());
        let mut previous = from;
        for state in chain {
            let id = self.nodes.len() + 1;
            let label = self.label_for(&state);
            let fingerprint = state.fingerprint();

            if let Some(prev) = previous {
                self.nodes[prev - 1].steps.push(Step { target: id, label });
            }
            self.nodes.push(GraphNode {
                id,
                state: Rc::new(state),
                fingerprint,
                steps: Vec::new(),
                discovery_path: Vec::new(),
            });
            self.by_fingerprint.entry(fingerprint).or_default().push(id);

            ids.push(id);
            previous = Some(id);
        }
        Ok(ids)
    }

    /// Look up a node by id, in `[1, size()]`.
    pub fn get_by_id(&self, id: NodeId) -> Result<&GraphNode, CoreError> {
        if id == 0 {
            return Err(CoreError::NodeNotFound(id));
        }
        self.nodes.get(id - 1).ok_or(CoreError::NodeNotFound(id))
    }

    /// Look up a node by insertion index, in `[0, size())`.
    pub fn get_by_index(&self, index: usize) -> Result<&GraphNode, CoreError> {
        self.nodes.get(index).ok_or(CoreError::IndexOutOfRange {
            index,
            size: self.nodes.len(),
        })
    }

    /// Set a node's discovery path. Returns `false` without changing
    /// anything when the node already has one.
    pub fn record_discovery_path(
        &mut self,
        id: NodeId,
        route: Vec<NodeId>,
    ) -> Result<bool, CoreError> {
        self.get_by_id(id)?;
        let node = &mut self.nodes[id - 1];
        if !node.discovery_path.is_empty() || route.is_empty() {
            return Ok(false);
        }
        node.discovery_path = route;
        Ok(true)
    }

    /// Ids of every node whose content equals node `id`'s, including `id`.
    pub fn equivalents(&self, id: NodeId) -> Result<&[NodeId], CoreError> {
        let node = self.get_by_id(id)?;
        Ok(self
            .by_fingerprint
            .get(&node.fingerprint)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Ids of nodes whose content equals `state`.
    pub fn find(&self, state: &StateDescription) -> &[NodeId] {
        self.by_fingerprint
            .get(&state.fingerprint())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub fn transition_field(&self) -> Option<&str> {
        self.transition_field.as_deref()
    }

    fn label_for(&self, state: &StateDescription) -> Option<String> {
        let field = self.transition_field.as_deref()?;
        let values = state.values(field)?;
        (!values.is_empty()).then(|| values.join(", "))
    }
}
