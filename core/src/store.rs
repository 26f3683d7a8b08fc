//! Generic reducer-backed state container with bounded linear undo/redo.
//!
//! Content edits push the pre-mutation state onto `past`; navigation-style
//! actions are exempt and only replace `present`. Undo/redo on empty stacks
//! are no-ops rather than errors.

/// How a committed action interacts with history.
pub trait UndoableAction {
    /// Exempt actions mutate `present` without touching `past`/`future`.
    fn is_history_exempt(&self) -> bool {
        false
    }
}

/// Maximum number of retained undo frames; the oldest is discarded first.
pub const MAX_HISTORY: usize = 50;

pub struct UndoableStore<S, A> {
    past: Vec<S>,
    present: S,
    future: Vec<S>,
    reducer: fn(&S, &A) -> S,
    max_history: usize,
}

impl<S, A> UndoableStore<S, A>
where
    S: Clone + PartialEq,
    A: UndoableAction,
{
    pub fn new(reducer: fn(&S, &A) -> S, initial: S) -> Self {
        Self {
            past: Vec::new(),
            present: initial,
            future: Vec::new(),
            reducer,
            max_history: MAX_HISTORY,
        }
    }

    #[cfg(test)]
    fn with_max_history(reducer: fn(&S, &A) -> S, initial: S, max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::new(reducer, initial)
        }
    }

    pub fn current(&self) -> &S {
        &self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Apply the reducer and record history.
    ///
    /// A commit whose result equals the present state pushes nothing. An
    /// exempt action replaces `present` only. A significant commit pushes
    /// the pre-mutation state (pruned to the bound) and clears `future`.
    pub fn commit(&mut self, action: &A) -> &S {
        let next = (self.reducer)(&self.present, action);
        if next == self.present {
            return &self.present;
        }

        if action.is_history_exempt() {
            self.present = next;
            return &self.present;
        }

        self.past.push(std::mem::replace(&mut self.present, next));
        if self.past.len() > self.max_history {
            let overflow = self.past.len() - self.max_history;
            self.past.drain(..overflow);
        }
        self.future.clear();
        &self.present
    }

    pub fn undo(&mut self) -> &S {
        if let Some(previous) = self.past.pop() {
            let present = std::mem::replace(&mut self.present, previous);
            self.future.insert(0, present);
        }
        &self.present
    }

    pub fn redo(&mut self) -> &S {
        if !self.future.is_empty() {
            let next = self.future.remove(0);
            self.past.push(std::mem::replace(&mut self.present, next));
        }
        &self.present
    }

    /// Stack depths, mainly for assertions and status display.
    pub fn history_depths(&self) -> (usize, usize) {
        (self.past.len(), self.future.len())
    }
}
