/// Linear undo/redo log of whole snapshots.
///
/// `cursor` always indexes a valid entry once the log is non-empty. Entries after the cursor are
/// the redo tail and are dropped by the next [`History::commit`].
#[derive(Debug, Clone)]
pub struct History<S> {
    entries: Vec<S>,
    cursor: usize,
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }
}

impl<S> History<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, snapshot: S) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(snapshot);
        self.cursor = self.entries.len() - 1;
    }

    pub fn undo(&mut self) -> Option<&S> {
        if self.can_undo() {
            self.cursor -= 1;
        }
        self.current()
    }

    pub fn redo(&mut self) -> Option<&S> {
        if self.can_redo() {
            self.cursor += 1;
        }
        self.current()
    }

    pub fn current(&self) -> Option<&S> {
        self.entries.get(self.cursor)
    }

    /// Replaces the whole log with `[snapshot]`.
    pub fn reset(&mut self, snapshot: S) {
        self.entries.clear();
        self.entries.push(snapshot);
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.entries.iter()
    }
}
