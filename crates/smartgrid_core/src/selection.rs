use std::collections::HashSet;

use indexmap::IndexSet;

use crate::query::OrderedRowView;
use crate::RowId;

/// Selected row identities, independent of focus. Keeps selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSelection {
    ids: IndexSet<RowId>,
}

impl RowSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.ids.iter().cloned().collect()
    }

    pub fn toggle(&mut self, id: RowId) -> bool {
        if !self.ids.shift_remove(&id) {
            self.ids.insert(id);
        }
        true
    }

    /// Selects every data row of the view. Returns true if anything changed.
    pub fn select_all(&mut self, view: &OrderedRowView) -> bool {
        let before = self.ids.len();
        self.ids.extend(view.data_row_ids());
        self.ids.len() != before
    }

    /// True when every data row of a non-empty view is selected.
    pub fn all_selected(&self, view: &OrderedRowView) -> bool {
        let ids = view.data_row_ids();
        !ids.is_empty() && ids.iter().all(|id| self.ids.contains(id))
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    /// Drops identities that no longer exist. Returns true if any were dropped.
    pub fn retain_existing(&mut self, existing: &HashSet<RowId>) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| existing.contains(id));

        let dropped = before - self.ids.len();
        if dropped > 0 {
            log::debug!("Dropped {} stale selected rows", dropped);
        }
        dropped > 0
    }
}
