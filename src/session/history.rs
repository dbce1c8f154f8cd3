// SPDX-License-Identifier: MPL-2.0
//! Linear, branch-discarding snapshot history.

/// Ordered snapshots plus a cursor.
///
/// The history is never empty and the cursor always points at an entry.
/// Recording after an undo drops every entry past the cursor first.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    index: usize,
}

impl<T> History<T> {
    /// Creates a history holding only `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    /// The entry under the cursor.
    #[must_use]
    pub fn current(&self) -> &T {
        &self.entries[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; provided for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Whether an undo operation is currently possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a redo operation is currently possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Appends `entry` after the cursor, discarding any redo entries.
    pub fn record(&mut self, entry: T) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }

    /// Moves the cursor back. Returns the new current entry, or `None` at
    /// the start.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    /// Moves the cursor forward. Returns the new current entry, or `None`
    /// at the end.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }

    /// Moves the cursor to `index` without touching the entries.
    pub fn jump(&mut self, index: usize) -> Option<&T> {
        if index >= self.entries.len() {
            return None;
        }
        self.index = index;
        Some(self.current())
    }

    /// Replaces the whole history with a single entry.
    pub fn reset(&mut self, initial: T) {
        self.entries.clear();
        self.entries.push(initial);
        self.index = 0;
    }
}
