//! The exploration path: the user's current walk through the store.
//!
//! The path is a committed prefix followed by a provisional ("temp") suffix.
//! Every forward extension lands in the temp suffix first; it is either
//! committed (kept) or rolled back (removed exactly). A separate cursor,
//! `position`, drives trace playback and history rendering.

use std::rc::Rc;

use crate::error::CoreError;
use crate::render;
use crate::state::StateDescription;
use crate::store::NodeId;

/// One position on the path: a state plus the id it is displayed under.
///
/// The displayed id normally matches the store node the state came from, but
/// may be patched (e.g. a re-derived initial state is shown as `S1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub id: NodeId,
    pub state: Rc<StateDescription>,
}

impl PathEntry {
    pub fn new(id: NodeId, state: StateDescription) -> Self {
        Self {
            id,
            state: Rc::new(state),
        }
    }

    pub fn shared(id: NodeId, state: Rc<StateDescription>) -> Self {
        Self { id, state }
    }
}

/// Committed prefix, provisional suffix, and a cursor.
#[derive(Debug, Clone, Default)]
pub struct ExplorationPath {
    sequence: Vec<PathEntry>,
    temp_len: usize,
    position: usize,
}

impl ExplorationPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of trailing entries that are provisional.
    pub fn temp_len(&self) -> usize {
        self.temp_len
    }

    pub fn at_end(&self) -> bool {
        self.position + 1 == self.sequence.len()
    }

    pub fn get(&self, pos: usize) -> Option<&PathEntry> {
        self.sequence.get(pos)
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<&PathEntry> {
        self.sequence.get(self.position)
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.sequence
    }

    /// Displayed ids of every entry, in path order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.sequence.iter().map(|e| e.id).collect()
    }

    /// Replace the temp suffix with `chain` and move the cursor to the end.
    pub fn extend_provisionally(&mut self, chain: Vec<PathEntry>) {
        self.rollback();
        if chain.is_empty() {
            return;
        }
        self.temp_len = chain.len();
        self.sequence.extend(chain);
        self.position = self.sequence.len() - 1;
    }

    /// Keep the temp suffix. The cursor does not move.
    pub fn commit(&mut self) {
        self.temp_len = 0;
    }

    /// Drop the temp suffix and move the cursor back by its length.
    pub fn rollback(&mut self) {
        if self.temp_len == 0 {
            return;
        }
        let keep = self.sequence.len() - self.temp_len;
        self.sequence.truncate(keep);
        self.position = self.position.saturating_sub(self.temp_len);
        self.temp_len = 0;
    }

    /// Discard everything and take `nodes` as the new, fully committed path.
    pub fn replace_with(&mut self, nodes: Vec<PathEntry>) {
        self.sequence = nodes;
        self.temp_len = 0;
        self.position = self.sequence.len().saturating_sub(1);
    }

    /// Empty the path.
    pub fn clear(&mut self) {
        self.replace_with(Vec::new());
    }

    /// Move the cursor back by `steps`, stopping at 0.
    ///
    /// Outside trace-replay mode the path is cut after the new position; the
    /// removed entries stay in the store.
    pub fn retreat(&mut self, steps: usize, trace_mode: bool) {
        self.position = self.position.saturating_sub(steps);
        if trace_mode {
            return;
        }
        let keep = (self.position + 1).min(self.sequence.len());
        let removed = self.sequence.len() - keep;
        self.sequence.truncate(keep);
        self.temp_len = self.temp_len.saturating_sub(removed);
    }

    /// Move the cursor forward by `steps`.
    ///
    /// In trace-replay mode moving past the last entry is an error and the
    /// cursor stays put; otherwise the cursor stops at the last entry.
    pub fn advance(&mut self, steps: usize, trace_mode: bool) -> Result<(), CoreError> {
        let last = self.sequence.len().saturating_sub(1);
        let target = self.position + steps;
        if target > last {
            if trace_mode {
                return Err(CoreError::TraceExhausted {
                    position: self.position,
                    steps,
                    last,
                });
            }
            self.position = last;
        } else {
            self.position = target;
        }
        Ok(())
    }

    /// Show the entry under the cursor as `id` from now on.
    pub fn patch_current_id(&mut self, id: NodeId) {
        if let Some(entry) = self.sequence.get_mut(self.position) {
            entry.id = id;
        }
    }

    /// The cursor entry and up to `n` predecessors, oldest first.
    ///
    /// With `diff` set, each entry shows only what changed since the entry
    /// before it (the first path entry is always shown in full).
    pub fn render_history(&self, n: usize, diff: bool) -> String {
        if self.sequence.is_empty() {
            return String::new();
        }
        let oldest = self.position.saturating_sub(n);
        let mut out = String::new();
        for pos in oldest..=self.position {
            let entry = &self.sequence[pos];
            let age = self.position - pos;
            let line = match pos.checked_sub(1).filter(|_| diff) {
                Some(prev) => {
                    let before = &self.sequence[prev];
                    render::history_diff(before.id, &before.state, entry.id, &entry.state, age)
                }
                None => render::history_entry(entry.id, &entry.state, age),
            };
            out.push_str(&line);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FieldDecl, StateSchema};

    fn entry(id: NodeId, pos: &str) -> PathEntry {
        let schema = StateSchema::new(vec![FieldDecl::new("pos", 1)]);
        let mut s = StateDescription::new(&schema);
        s.add_value("pos", pos);
        PathEntry::new(id, s)
    }

    fn committed(ids: &[NodeId]) -> ExplorationPath {
        let mut p = ExplorationPath::new();
        p.replace_with(ids.iter().map(|&i| entry(i, &format!("P{i}"))).collect());
        p
    }

    #[test]
    fn extend_then_rollback_restores() {
        let mut p = committed(&[1, 2]);
        let before = (p.ids(), p.position(), p.temp_len());

        p.extend_provisionally(vec![entry(3, "C"), entry(4, "D")]);
        assert_eq!(p.ids(), vec![1, 2, 3, 4]);
        assert_eq!(p.temp_len(), 2);
        assert_eq!(p.position(), 3);

        p.rollback();
        assert_eq!((p.ids(), p.position(), p.temp_len()), before);
    }

    #[test]
    fn extend_replaces_existing_temp() {
        let mut p = committed(&[1]);
        p.extend_provisionally(vec![entry(2, "B")]);
        p.extend_provisionally(vec![entry(3, "C"), entry(4, "D")]);
        assert_eq!(p.ids(), vec![1, 3, 4]);
        assert_eq!(p.temp_len(), 2);

        p.rollback();
        assert_eq!(p.ids(), vec![1]);
        assert_eq!(p.position(), 0);
    }

    #[test]
    fn commit_is_idempotent() {
        let mut p = committed(&[1]);
        p.extend_provisionally(vec![entry(2, "B")]);
        p.commit();
        let once = (p.ids(), p.position(), p.temp_len());
        p.commit();
        assert_eq!((p.ids(), p.position(), p.temp_len()), once);

        p.rollback();
        assert_eq!(p.ids(), vec![1, 2]);
    }

    #[test]
    fn retreat_truncates_outside_trace_mode() {
        let mut p = committed(&[1, 2, 3, 4]);
        p.retreat(2, false);
        assert_eq!(p.position(), 1);
        assert_eq!(p.ids(), vec![1, 2]);

        p.retreat(10, false);
        assert_eq!(p.position(), 0);
        assert_eq!(p.ids(), vec![1]);
    }

    #[test]
    fn retreat_in_trace_mode_keeps_entries() {
        let mut p = committed(&[1, 2, 3]);
        p.retreat(2, true);
        assert_eq!(p.position(), 0);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn retreat_cuts_into_temp_suffix() {
        let mut p = committed(&[1]);
        p.extend_provisionally(vec![entry(2, "B"), entry(3, "C")]);
        p.retreat(1, false);
        assert_eq!(p.ids(), vec![1, 2]);
        assert_eq!(p.temp_len(), 1);
    }

    #[test]
    fn advance_in_trace_mode() {
        let mut p = committed(&[1, 2, 3]);
        p.retreat(2, true);
        p.advance(2, true).unwrap();
        assert!(p.at_end());
        assert!(matches!(
            p.advance(1, true),
            Err(CoreError::TraceExhausted { position: 2, .. })
        ));
        assert_eq!(p.position(), 2);
    }

    #[test]
    fn history_orders_oldest_first() {
        let p = committed(&[1, 2, 3]);
        let h = p.render_history(1, false);
        let s2 = h.find("S2 (-1)").unwrap();
        let s3 = h.find("S3 (-0)").unwrap();
        assert!(s2 < s3);
        assert!(!h.contains("S1"));
    }

    #[test]
    fn history_diff_mode() {
        let p = committed(&[1, 2]);
        let h = p.render_history(5, true);
        assert!(h.contains("S1 (-1)"));
        assert!(h.contains("S1 -> S2 (-0)"));
    }

    #[test]
    fn patch_current_id() {
        let mut p = committed(&[5]);
        p.patch_current_id(1);
        assert_eq!(p.current().unwrap().id, 1);
    }
}
