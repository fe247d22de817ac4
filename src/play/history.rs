//! Linear undo/redo over document snapshots.
//!
//! The log holds *post-mutation* states: the engine records after every
//! change, so stepping the cursor back one entry restores the state before
//! the most recent mutation. The engine seeds the log with the initial
//! document, which makes the very first edit undoable.
//!
//! ```ignore
//! let mut history = HistoryManager::new(50);
//! history.record(&play.frames, play.current_frame_index); // baseline
//!
//! // ... mutate ...
//! history.record(&play.frames, play.current_frame_index);
//!
//! if let Some(entry) = history.undo() {
//!     play.frames = entry.frames.clone();
//! }
//!
//! // Drag gestures: one entry per gesture, not per pointer move.
//! history.start_batch("Drag token");
//! // ... record() calls are suppressed but remembered ...
//! history.end_batch(&play.frames, play.current_frame_index);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use super::model::Frame;

/// Default number of retained entries.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// One recorded `(frames, currentFrameIndex)` snapshot.
///
/// Frames are shared with the live document until either side writes, at
/// which point `Arc::make_mut` gives the writer its own copy.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub frames: Vec<Arc<Frame>>,
    pub current_frame_index: usize,
}

/// Bounded linear history with a cursor.
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    /// Index of the entry matching the live document. Meaningless when empty.
    cursor: usize,
    max_depth: usize,
    /// When Some, `record` is suppressed and only marks the batch dirty.
    batch_label: Option<String>,
    batch_dirty: bool,
}

impl HistoryManager {
    /// Creates an empty history retaining at most `max_depth` entries (min 1).
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_depth: max_depth.max(1),
            batch_label: None,
            batch_dirty: false,
        }
    }

    /// Records the post-mutation state. Discards any redo future and evicts
    /// the oldest entry past the depth limit.
    ///
    /// Returns false when suppressed by an open batch.
    pub fn record(&mut self, frames: &[Arc<Frame>], current_frame_index: usize) -> bool {
        if let Some(label) = &self.batch_label {
            log::trace!("record suppressed: batch '{}' in progress", label);
            self.batch_dirty = true;
            return false;
        }

        self.push_entry(HistoryEntry {
            frames: frames.to_vec(),
            current_frame_index,
        });
        true
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(entry);

        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;

        log::debug!(
            "history entry recorded (depth {}, max {})",
            self.entries.len(),
            self.max_depth
        );
    }

    /// Steps back one entry and returns it, or `None` at the earliest entry.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        self.abandon_stuck_batch();

        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        log::debug!("undo to entry {} of {}", self.cursor, self.entries.len());
        self.entries.get(self.cursor)
    }

    /// Steps forward one entry and returns it, or `None` at the latest entry.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        self.abandon_stuck_batch();

        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        log::debug!("redo to entry {} of {}", self.cursor, self.entries.len());
        self.entries.get(self.cursor)
    }

    fn abandon_stuck_batch(&mut self) {
        if let Some(label) = self.batch_label.take() {
            log::warn!("ending stuck batch '{}' before undo/redo", label);
            self.batch_dirty = false;
        }
    }

    /// Whether `undo` would move the cursor.
    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    /// Whether `redo` would move the cursor.
    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    /// Opens a batch. Until `end_batch`, `record` calls collapse into one entry.
    pub fn start_batch(&mut self, label: &str) {
        if let Some(open) = &self.batch_label {
            log::warn!("start_batch('{}') while '{}' is open, ignoring", label, open);
            return;
        }
        self.batch_label = Some(label.to_string());
        self.batch_dirty = false;
        log::debug!("batch '{}' started", label);
    }

    /// Closes the open batch, recording the given state once if anything was
    /// recorded during the batch. Returns whether an entry was written.
    pub fn end_batch(&mut self, frames: &[Arc<Frame>], current_frame_index: usize) -> bool {
        let label = match self.batch_label.take() {
            Some(l) => l,
            None => return false,
        };

        let dirty = std::mem::take(&mut self.batch_dirty);
        if dirty {
            self.push_entry(HistoryEntry {
                frames: frames.to_vec(),
                current_frame_index,
            });
        }
        log::debug!("batch '{}' ended (recorded: {})", label, dirty);
        dirty
    }

    /// Whether a batch is open.
    pub fn is_batching(&self) -> bool {
        self.batch_label.is_some()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position, `None` when empty.
    pub fn cursor(&self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    /// Entry under the cursor.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor().and_then(|c| self.entries.get(c))
    }

    /// Drops every entry and any open batch.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.batch_label = None;
        self.batch_dirty = false;
        log::debug!("history cleared");
    }

    /// Clears history and records `frames` as the new baseline.
    pub fn reset(&mut self, frames: &[Arc<Frame>], current_frame_index: usize) {
        self.clear();
        self.record(frames, current_frame_index);
    }

    /// Maximum number of retained entries.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Changes the depth limit, evicting the oldest entries if needed.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A frame sequence whose single frame has the given duration as a tag.
    fn frames(tag: u32) -> Vec<Arc<Frame>> {
        vec![Arc::new(Frame::new().with_duration(tag))]
    }

    fn tag(entry: &HistoryEntry) -> u32 {
        entry.frames[0].duration
    }

    #[test]
    fn test_new_history_is_empty() {
        let h = HistoryManager::new(50);
        assert!(h.is_empty());
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.cursor(), None);
    }

    #[test]
    fn test_undo_steps_to_previous_entry() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        h.record(&frames(2), 0);
        h.record(&frames(3), 0);

        assert_eq!(tag(h.undo().unwrap()), 2);
        assert_eq!(tag(h.undo().unwrap()), 1);
        assert!(h.undo().is_none());
        assert_eq!(h.cursor(), Some(0));
    }

    #[test]
    fn test_single_entry_cannot_undo() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        assert!(!h.can_undo());
        assert!(h.undo().is_none());
    }

    #[test]
    fn test_redo_after_undo() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        h.record(&frames(2), 1);

        h.undo();
        assert!(h.can_redo());
        let entry = h.redo().unwrap();
        assert_eq!(tag(entry), 2);
        assert_eq!(entry.current_frame_index, 1);
        assert!(h.redo().is_none());
    }

    #[test]
    fn test_record_discards_redo_future() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        h.record(&frames(2), 0);
        h.record(&frames(3), 0);
        h.undo();
        h.undo();

        h.record(&frames(4), 0);
        assert!(!h.can_redo());
        assert_eq!(h.len(), 2);
        assert_eq!(tag(h.undo().unwrap()), 1);
    }

    #[test]
    fn test_max_depth_evicts_oldest() {
        let mut h = HistoryManager::new(3);
        for i in 1..=5 {
            h.record(&frames(i), 0);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), Some(2));

        assert_eq!(tag(h.undo().unwrap()), 4);
        assert_eq!(tag(h.undo().unwrap()), 3);
        assert!(h.undo().is_none());
    }

    #[test]
    fn test_set_max_depth_trims_and_keeps_cursor_valid() {
        let mut h = HistoryManager::new(10);
        for i in 1..=8 {
            h.record(&frames(i), 0);
        }
        h.set_max_depth(3);
        assert_eq!(h.len(), 3);
        assert_eq!(h.max_depth(), 3);
        assert_eq!(tag(h.current().unwrap()), 8);
    }

    #[test]
    fn test_zero_depth_is_clamped_to_one() {
        let h = HistoryManager::new(0);
        assert_eq!(h.max_depth(), 1);
    }

    #[test]
    fn test_batch_collapses_records() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);

        h.start_batch("Drag");
        assert!(!h.record(&frames(2), 0));
        assert!(!h.record(&frames(3), 0));
        assert_eq!(h.len(), 1);

        assert!(h.end_batch(&frames(4), 0));
        assert_eq!(h.len(), 2);
        assert_eq!(tag(h.current().unwrap()), 4);
        assert_eq!(tag(h.undo().unwrap()), 1);
    }

    #[test]
    fn test_clean_batch_records_nothing() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        h.start_batch("Click without drag");
        assert!(!h.end_batch(&frames(1), 0));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_end_batch_without_start_is_noop() {
        let mut h = HistoryManager::new(50);
        assert!(!h.end_batch(&frames(1), 0));
        assert!(h.is_empty());
    }

    #[test]
    fn test_double_start_batch_ignored() {
        let mut h = HistoryManager::new(50);
        h.start_batch("First");
        h.start_batch("Second");
        assert!(h.is_batching());
        h.record(&frames(1), 0);
        assert!(h.end_batch(&frames(1), 0));
        assert!(!h.is_batching());
    }

    #[test]
    fn test_undo_ends_stuck_batch() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        h.record(&frames(2), 0);
        h.start_batch("Stuck");

        assert!(h.undo().is_some());
        assert!(!h.is_batching());
    }

    #[test]
    fn test_reset_installs_baseline() {
        let mut h = HistoryManager::new(50);
        h.record(&frames(1), 0);
        h.record(&frames(2), 0);
        h.reset(&frames(9), 0);
        assert_eq!(h.len(), 1);
        assert!(!h.can_undo());
        assert_eq!(tag(h.current().unwrap()), 9);
    }

    #[test]
    fn test_snapshots_share_unchanged_frames() {
        let live = frames(1);
        let mut h = HistoryManager::new(50);
        h.record(&live, 0);
        assert!(Arc::ptr_eq(&live[0], &h.current().unwrap().frames[0]));
    }
}
