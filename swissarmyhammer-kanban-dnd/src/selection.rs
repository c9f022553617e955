//! Multi-select state

use crate::types::ItemId;
use indexmap::IndexSet;

/// Cards selected for a batch drag, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    multi_select: bool,
    ids: IndexSet<ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_multi_select(&self) -> bool {
        self.multi_select
    }

    /// Turn multi-select mode on or off. Turning it off clears the selection.
    pub fn set_multi_select(&mut self, enabled: bool) {
        self.multi_select = enabled;
        if !enabled {
            self.ids.clear();
        }
    }

    pub fn select(&mut self, id: impl Into<ItemId>) {
        self.ids.insert(id.into());
    }

    /// Add or remove a card. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: impl Into<ItemId>) -> bool {
        let id = id.into();
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.ids.iter()
    }

    /// Whether picking up `active` should drag the whole selection
    pub fn drags_with(&self, active: &ItemId) -> bool {
        self.multi_select && self.ids.len() > 1 && self.ids.contains(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut selection = Selection::new();
        assert!(selection.toggle("a"));
        assert!(selection.contains(&"a".into()));
        assert!(!selection.toggle("a"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_drags_with_requires_mode_and_membership() {
        let mut selection = Selection::new();
        selection.select("a");
        selection.select("b");
        assert!(!selection.drags_with(&"a".into()));

        selection.set_multi_select(true);
        selection.select("a");
        selection.select("b");
        assert!(selection.drags_with(&"a".into()));
        assert!(!selection.drags_with(&"c".into()));
    }

    #[test]
    fn test_single_selected_item_drags_alone() {
        let mut selection = Selection::new();
        selection.set_multi_select(true);
        selection.select("a");
        assert!(!selection.drags_with(&"a".into()));
    }

    #[test]
    fn test_leaving_multi_select_clears() {
        let mut selection = Selection::new();
        selection.set_multi_select(true);
        selection.select("a");
        selection.set_multi_select(false);
        assert_eq!(selection.len(), 0);
    }
}
