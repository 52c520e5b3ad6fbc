//! Linear undo/redo history
//!
//! Entries are kept in write order. `cursor` counts how many entries are
//! currently applied: entries `[..cursor]` are live, entries `[cursor..]`
//! have been undone and can be redone. Recording a new entry while entries
//! are undone discards them first (branch-discarding, not a tree).

use crate::value::StateValue;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single recorded write
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub path: String,
    /// `None` when the path did not exist before the write
    pub old_value: Option<StateValue>,
    pub new_value: Option<StateValue>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl HistoryEntry {
    pub fn new(
        path: impl Into<String>,
        old_value: Option<StateValue>,
        new_value: Option<StateValue>,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            path: path.into(),
            old_value,
            new_value,
            timestamp,
        }
    }
}

/// Bounded history with a movable cursor
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    max_len: usize,
}

impl History {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_len: max_len.max(1),
        }
    }

    /// Append an entry, truncating any undone entries and dropping the
    /// oldest entry when the bound is exceeded
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.cursor);
        self.entries.push_back(entry);

        if self.entries.len() > self.max_len {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
    }

    /// Step the cursor back, returning the entry to revert
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step the cursor forward, returning the entry to re-apply
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor - 1)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Index of the most recently applied entry, if any
    pub fn index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
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

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, old: i32, new: i32) -> HistoryEntry {
        HistoryEntry::new(path, Some(old.into()), Some(new.into()))
    }

    #[test]
    fn test_record_and_undo_redo() {
        let mut history = History::new(10);
        history.record(entry("a", 0, 1));
        history.record(entry("a", 1, 2));
        assert_eq!(history.index(), Some(1));

        let undone = history.undo().unwrap();
        assert_eq!(undone.new_value, Some(2.into()));
        assert_eq!(history.index(), Some(0));

        let redone = history.redo().unwrap();
        assert_eq!(redone.new_value, Some(2.into()));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_truncates_undone_branch() {
        let mut history = History::new(10);
        history.record(entry("a", 0, 1));
        history.record(entry("a", 1, 2));
        history.record(entry("a", 2, 3));

        history.undo();
        history.undo();
        history.record(entry("b", 0, 9));

        assert_eq!(history.len(), 2);
        let paths: Vec<&str> = history.entries().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b"]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_bounded_length_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.record(entry("a", i, i + 1));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), Some(2));
        let first = history.entries().next().unwrap();
        assert_eq!(first.old_value, Some(2.into()));
    }

    #[test]
    fn test_undo_exhausts() {
        let mut history = History::new(3);
        history.record(entry("a", 0, 1));
        assert!(history.undo().is_some());
        assert!(history.undo().is_none());
        assert_eq!(history.index(), None);
        assert_eq!(history.len(), 1);
    }
}
