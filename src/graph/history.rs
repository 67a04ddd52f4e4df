use super::Flow;

const DEFAULT_LIMIT: usize = 100;

/// Undo/redo stacks of whole-flow snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Flow>,
    redo: Vec<Flow>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records the version that is about to be replaced. Clears the redo stack.
    pub fn record(&mut self, previous: Flow) {
        if self.undo.len() == self.limit {
            self.undo.remove(0);
        }
        self.undo.push(previous);
        self.redo.clear();
    }

    pub fn undo(&mut self, current: Flow) -> Option<Flow> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Flow) -> Option<Flow> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mutations::{create_flow, rename_flow};

    #[test]
    fn undo_redo_walks_snapshots() {
        let mut history = History::default();
        let first = create_flow("one");
        let second = rename_flow(&first, "two");
        history.record(first.clone());

        let undone = history.undo(second.clone()).unwrap();
        assert_eq!(undone.name, "one");
        assert!(history.can_redo());

        let redone = history.redo(undone).unwrap();
        assert_eq!(redone.name, "two");
        assert!(history.undo(redone).is_some());
        assert!(history.undo(first).is_none());
    }

    #[test]
    fn limit_drops_oldest_snapshot() {
        let mut history = History::new(2);
        let flow = create_flow("a");
        history.record(rename_flow(&flow, "1"));
        history.record(rename_flow(&flow, "2"));
        history.record(rename_flow(&flow, "3"));
        assert_eq!(history.len(), 2);
        let back = history.undo(flow.clone()).unwrap();
        assert_eq!(back.name, "3");
        let back = history.undo(back).unwrap();
        assert_eq!(back.name, "2");
        assert!(history.undo(back).is_none());
    }

    #[test]
    fn recording_clears_redo() {
        let mut history = History::default();
        let flow = create_flow("a");
        history.record(flow.clone());
        let _ = history.undo(rename_flow(&flow, "b"));
        assert!(history.can_redo());
        history.record(flow);
        assert!(!history.can_redo());
    }
}
