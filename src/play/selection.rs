//! Token selection. Editor-session state, never persisted.

use serde::Serialize;

use super::model::Frame;

/// Ordered set of selected token ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection with one id.
    pub fn select(&mut self, id: &str) {
        self.ids.clear();
        self.ids.push(id.to_string());
    }

    /// Adds an id if not already selected.
    pub fn add(&mut self, id: &str) {
        if !self.contains(id) {
            self.ids.push(id.to_string());
        }
    }

    /// Replaces the selection with `ids`, dropping duplicates.
    pub fn set<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ids.clear();
        for id in ids {
            self.add(id.as_ref());
        }
    }

    /// Adds the id if absent, removes it if present.
    pub fn toggle(&mut self, id: &str) {
        if self.contains(id) {
            self.remove(id);
        } else {
            self.ids.push(id.to_string());
        }
    }

    /// Removes one id. Returns whether it was selected.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|s| s != id);
        self.ids.len() != before
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids the frame does not hold. Returns whether anything changed.
    pub fn retain_in(&mut self, frame: &Frame) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| frame.contains_object(id));
        self.ids.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::model::{ObjectKind, PlayObject};

    #[test]
    fn test_select_replaces_and_add_appends() {
        let mut s = Selection::new();
        s.select("a");
        s.add("b");
        s.add("b");
        assert_eq!(s.ids(), &["a".to_string(), "b".to_string()]);
        s.select("c");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_toggle_flips_membership() {
        let mut s = Selection::new();
        s.toggle("a");
        assert!(s.contains("a"));
        s.toggle("a");
        assert!(s.is_empty());
    }

    #[test]
    fn test_set_dedups() {
        let mut s = Selection::new();
        s.set(["a", "b", "a"]);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_retain_in_prunes_missing_ids() {
        let mut frame = Frame::new();
        frame.objects.insert(
            "a".into(),
            PlayObject::new("a", ObjectKind::Ball, 0.0, 0.0),
        );
        let mut s = Selection::new();
        s.set(["a", "gone"]);
        assert!(s.retain_in(&frame));
        assert_eq!(s.ids(), &["a".to_string()]);
        assert!(!s.retain_in(&frame));
    }
}
